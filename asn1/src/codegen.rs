use std::fmt::Write;

use convert_case::{Case, Casing};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    analysis::{AnalysisContext, ReferenceChain},
    ast::{ClassId, FieldKind, FieldSetting, ModuleId, ObjectId, ObjectSetId, Setting, TypeId, TypeKind, ValueId, ValueKind},
};

/// Generate rust source code from a successful analysis context
#[derive(Debug)]
struct RustCodegen<'a, 'b> {
    analysis: &'a mut AnalysisContext<'b>,
    result: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// Cannot run codegen if any errors are present in the analysis context
    #[error("analysis reported errors, no code can be generated")]
    AnalysisErrors,

    /// Error during write to string? should never occur
    #[error("unable to write generated code")]
    FmtError(#[from] std::fmt::Error),

    /// An assignment was never classified by analysis
    #[error("assignment `{0}` was never classified")]
    Unclassified(String),

    /// A setting that has no rust representation
    #[error("no rust representation for {0}")]
    Unsupported(String),
}

type Result<T = (), E = CodegenError> = std::result::Result<T, E>;

/// How a fixed-type value field is represented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueRepr {
    Integer,
    Boolean,
    Unit,
    Text,
}

impl ValueRepr {
    fn rust_type(self) -> &'static str {
        match self {
            ValueRepr::Integer => "i128",
            ValueRepr::Boolean => "bool",
            ValueRepr::Unit => "()",
            ValueRepr::Text => "&'static str",
        }
    }
}

impl AnalysisContext<'_> {
    /// Run the code generator to produce a rust source code listing to represent the input files.
    ///
    /// Every class becomes a struct, every object and object set a constant
    /// of that struct, and every open type with alternatives an enum naming
    /// them.
    pub fn rust_codegen(&mut self) -> Result<String> {
        if self.has_errors() {
            return Err(CodegenError::AnalysisErrors);
        }

        RustCodegen {
            analysis: self,
            result: String::new(),
        }
        .run()
    }
}

impl RustCodegen<'_, '_> {
    fn run(mut self) -> Result<String> {
        let modules: Vec<_> = self.analysis.ast.modules().collect();
        for module in modules {
            self.module(module)?;
        }

        Ok(self.result)
    }

    fn module(&mut self, module: ModuleId) -> Result {
        let name = self.analysis.ast[module].name.name.to_case(Case::Snake);
        debug!(module = %name, "generating module");
        writeln!(self.result, "pub mod {} {{", ident(&name))?;

        let assignments: Vec<_> = self.analysis.ast[module].assignments.values().copied().collect();
        for assignment in assignments {
            let name = self.analysis.ast[assignment].name.name.clone();
            match self.analysis.ast[assignment].setting.clone() {
                Setting::Class(class) => self.class(&name, class)?,
                Setting::Object(object) => self.object(&name, object)?,
                Setting::ObjectSet(set) => self.object_set(&name, set)?,
                Setting::Type(ty) => self.open_types(ty)?,
                Setting::Unclassified => return Err(CodegenError::Unclassified(name)),
                other => trace!(assignment = %name, ?other, "nothing generated"),
            }
        }

        writeln!(self.result, "}}")?;

        Ok(())
    }

    fn class(&mut self, name: &str, class: ClassId) -> Result {
        writeln!(self.result, "\t#[derive(Debug, Clone, Copy, PartialEq)]")?;
        writeln!(self.result, "\tpub struct {} {{", name.to_case(Case::Pascal))?;

        let fields: Vec<_> = self.analysis.ast[class].fields.values().cloned().collect();
        for field in fields {
            let ty = match &field.kind {
                FieldKind::Value(ty) => self.value_repr(*ty).rust_type(),
                FieldKind::ObjectSet(_) => "&'static [&'static str]",
                FieldKind::Type | FieldKind::ValueSet(_) | FieldKind::Object(_) => "&'static str",
                FieldKind::Undecided(reference) => {
                    return Err(CodegenError::Unsupported(format!("field {} of {reference}", field.name.name)))
                }
            };
            let ty = if field.optional {
                format!("Option<{ty}>")
            } else {
                ty.to_string()
            };
            writeln!(self.result, "\t\tpub {}: {ty},", field_ident(&field.name.name))?;
        }

        writeln!(self.result, "\t}}")?;
        Ok(())
    }

    fn object(&mut self, name: &str, object: ObjectId) -> Result {
        let Some(class) = self.analysis.ast[object].governor else {
            return Ok(());
        };
        let expr = self.object_expr(object)?;
        writeln!(
            self.result,
            "\tpub const {}: {} = {expr};",
            name.to_case(Case::ScreamingSnake),
            self.class_path(class),
        )?;
        Ok(())
    }

    fn object_set(&mut self, name: &str, set: ObjectSetId) -> Result {
        let Some(class) = self.analysis.ast[set].governor else {
            return Ok(());
        };
        let path = self.class_path(class);

        writeln!(
            self.result,
            "\tpub const {}: &[{path}] = &[",
            name.to_case(Case::ScreamingSnake),
        )?;
        for object in self.analysis.object_set_objects(set) {
            let expr = self.object_expr(object)?;
            writeln!(self.result, "\t\t{expr},")?;
        }
        writeln!(self.result, "\t];")?;
        Ok(())
    }

    /// One enum for every open type below `ty` that has alternatives
    fn open_types(&mut self, ty: TypeId) -> Result {
        let alternatives = self.analysis.open_type_alternatives(ty);
        if !alternatives.is_empty() {
            let name = self.analysis.full_name(ty).to_case(Case::Pascal);
            writeln!(self.result, "\t#[derive(Debug, Clone, Copy, PartialEq, Eq)]")?;
            writeln!(self.result, "\tpub enum {name} {{")?;
            for (alternative, _) in &alternatives {
                writeln!(self.result, "\t\t{},", variant_ident(alternative))?;
            }
            writeln!(self.result, "\t}}")?;

            writeln!(self.result, "\timpl {name} {{")?;
            writeln!(self.result, "\t\tpub fn name(&self) -> &'static str {{")?;
            writeln!(self.result, "\t\t\tmatch self {{")?;
            for (alternative, _) in &alternatives {
                writeln!(
                    self.result,
                    "\t\t\t\tSelf::{} => {alternative:?},",
                    variant_ident(alternative)
                )?;
            }
            writeln!(self.result, "\t\t\t}}\n\t\t}}\n\t}}")?;
        }

        let children: Vec<_> = match &self.analysis.ast[ty].kind {
            TypeKind::SequenceOf(element) | TypeKind::SetOf(element) => vec![*element],
            kind => kind.components().unwrap_or_default().iter().map(|c| c.ty).collect(),
        };
        for child in children {
            self.open_types(child)?;
        }

        Ok(())
    }

    /// Path to the struct generated for a class, from inside a module
    fn class_path(&self, class: ClassId) -> String {
        let ast = &self.analysis.ast;
        let module = ast.scope_module(ast[class].scope);
        format!(
            "super::{}::{}",
            ident(&ast[module].name.name.to_case(Case::Snake)),
            ast[class].name.to_case(Case::Pascal)
        )
    }

    fn object_expr(&mut self, object: ObjectId) -> Result<String> {
        let object = self
            .analysis
            .get_refd_last_object(object, &mut ReferenceChain::new())
            .unwrap_or(object);
        let Some(class) = self.analysis.ast[object].governor else {
            return Err(CodegenError::Unsupported(format!("object {}", self.analysis.object_name(object))));
        };

        let mut expr = format!("{} {{ ", self.class_path(class));
        let fields: Vec<_> = self.analysis.ast[class].fields.values().cloned().collect();
        for field in fields {
            let setting = self.analysis.field_setting_with_name(object, &field.name.name);
            let value = match (setting, &field.kind) {
                (Some(setting), kind) => {
                    let value = self.setting_expr(&setting, kind)?;
                    if field.optional {
                        format!("Some({value})")
                    } else {
                        value
                    }
                }
                (None, _) if field.optional => "None".to_string(),
                (None, _) => {
                    return Err(CodegenError::Unsupported(format!(
                        "object {} without {}",
                        self.analysis.object_name(object),
                        field.name.name
                    )))
                }
            };
            write!(expr, "{}: {value}, ", field_ident(&field.name.name))?;
        }
        expr.push('}');

        Ok(expr)
    }

    fn setting_expr(&mut self, setting: &FieldSetting, kind: &FieldKind) -> Result<String> {
        Ok(match (setting, kind) {
            (FieldSetting::Type(ty), _) => format!("{:?}", self.analysis.type_display(*ty)),
            (FieldSetting::Value(value), FieldKind::Value(ty)) => {
                let repr = self.value_repr(*ty);
                self.value_expr(*value, *ty, repr)?
            }
            (FieldSetting::ValueSet(block), _) => {
                let text = self.analysis.source_text(block.location.source);
                format!("{:?}", text.get(block.location.span.clone()).unwrap_or_default())
            }
            (FieldSetting::Object(object), _) => {
                let object = self.analysis.get_refd_last_object(*object, &mut ReferenceChain::new());
                format!("{:?}", object.map(|o| self.analysis.object_name(o)).unwrap_or_default())
            }
            (FieldSetting::ObjectSet(set), _) => {
                let names: Vec<_> = self
                    .analysis
                    .object_set_objects(*set)
                    .into_iter()
                    .map(|o| format!("{:?}", self.analysis.object_name(o)))
                    .collect();
                format!("&[{}]", names.join(", "))
            }
            (setting, kind) => {
                return Err(CodegenError::Unsupported(format!(
                    "{} setting of a {} field",
                    setting.describe(),
                    kind.describe()
                )))
            }
        })
    }

    fn value_repr(&mut self, ty: TypeId) -> ValueRepr {
        let last = self.analysis.type_last(ty, &mut ReferenceChain::new());
        match last.map(|last| &self.analysis.ast[last].kind) {
            Some(TypeKind::Integer(_)) => ValueRepr::Integer,
            Some(TypeKind::Boolean) => ValueRepr::Boolean,
            Some(TypeKind::Null) => ValueRepr::Unit,
            _ => ValueRepr::Text,
        }
    }

    fn value_expr(&mut self, value: ValueId, ty: TypeId, repr: ValueRepr) -> Result<String> {
        let value = self.analysis.value_last(value);
        let kind = self.analysis.ast[value].kind.clone();

        Ok(match (repr, kind) {
            (ValueRepr::Integer, ValueKind::Integer(i)) => i.to_string(),
            (ValueRepr::Integer, ValueKind::Reference(reference)) => {
                let last = self.analysis.type_last(ty, &mut ReferenceChain::new());
                let named = match last.map(|last| &self.analysis.ast[last].kind) {
                    Some(TypeKind::Integer(named)) => named
                        .iter()
                        .find(|n| n.name.name == reference.name.name)
                        .map(|n| n.value),
                    _ => None,
                };
                match named {
                    Some(named) => self.value_expr(named, ty, repr)?,
                    None => return Err(CodegenError::Unsupported(format!("integer value {reference}"))),
                }
            }
            (ValueRepr::Boolean, ValueKind::Boolean(b)) => b.to_string(),
            (ValueRepr::Unit, _) => "()".to_string(),
            (ValueRepr::Text, ValueKind::CString(s)) => format!("{s:?}"),
            (ValueRepr::Text, _) => {
                let location = &self.analysis.ast[value].location;
                let text = self.analysis.source_text(location.source);
                format!("{:?}", text.get(location.span.clone()).unwrap_or_default())
            }
            (repr, kind) => {
                return Err(CodegenError::Unsupported(format!(
                    "{} as {}",
                    kind.describe(),
                    repr.rust_type()
                )))
            }
        })
    }
}

/// Rust identifier for a snake case name, escaping keywords
fn ident(name: &str) -> String {
    const KEYWORDS: [&str; 38] = [
        "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
        "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
        "unsafe", "use", "where", "while",
    ];

    if KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_string()
    }
}

/// Struct field for a class field, `&ArgType` becomes `arg_type`
fn field_ident(name: &str) -> String {
    ident(&name.trim_start_matches('&').to_case(Case::Snake))
}

/// Enum variant for an open type alternative.  Alternative names start with
/// a lower case letter in front of the type's own name, so the first letter
/// is raised again before splitting into words: `oCTET_STRING` becomes
/// `OctetString`.
fn variant_ident(alternative: &str) -> String {
    let mut chars = alternative.chars();
    let base: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    base.to_case(Case::Pascal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_are_built_from_the_type_name() {
        assert_eq!(variant_ident("iNTEGER"), "Integer");
        assert_eq!(variant_ident("oCTET_STRING"), "OctetString");
        assert_eq!(variant_ident("ops"), "Ops");
        assert_eq!(variant_ident("message_body"), "MessageBody");
    }

    #[test]
    fn field_names_are_snake_case() {
        assert_eq!(field_ident("&ArgType"), "arg_type");
        assert_eq!(field_ident("&code"), "code");
        assert_eq!(field_ident("&Type"), "r#type");
    }

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(ident("mod"), "r#mod");
        assert_eq!(ident("module_a"), "module_a");
    }
}
