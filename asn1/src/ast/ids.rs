//! Index types for arena storage.

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create from a 0-based arena index.
            pub(crate) const fn new(index: usize) -> Self {
                Self(index as u32)
            }

            /// Get the 0-based index.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// A parsed ASN.1 module
    ModuleId
);

define_id!(
    /// Name lookup scope, either a module or an instantiated parameterized
    /// assignment
    ScopeId
);

define_id!(
    /// A type, value, class, object or object set assignment
    AssignmentId
);

define_id!(
    /// Type node
    TypeId
);

define_id!(
    /// Value node
    ValueId
);

define_id!(
    /// Object class node
    ClassId
);

define_id!(
    /// Information object node
    ObjectId
);

define_id!(
    /// Information object set node
    ObjectSetId
);
