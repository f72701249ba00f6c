//! Name resolution and checking of ASN.1 modules, including the information
//! object system.
//!
//! Analysis is incremental.  Every entity records the timestamp it was last
//! checked at and is skipped when it is already up to date, so analysis can be
//! run again with a newer timestamp without repeating work or diagnostics.
//! Blocks whose meaning depends on name resolution are parsed on first use.

mod chain;
mod class;
mod context;
mod error;
mod naming;
mod object;
mod object_set;
mod query;
mod resolve;
mod table;
mod timestamp;
mod ty;
mod value;

pub use self::{
    chain::{Circular, Entity, ReferenceChain},
    context::AnalysisContext,
    error::{AnalysisError, Result},
    timestamp::{is_fresh, CompilationTimeStamp, Resolved},
};
