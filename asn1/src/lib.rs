#![forbid(unsafe_code)]

//! Semantic analysis of ASN.1 modules, resolving the information object
//! system: object classes, information objects, object sets, table
//! constraints and the alternatives of open types.

mod analysis;
pub mod ast;
mod codegen;
mod compiler;
mod diagnostic;
mod lexer;
mod location;
mod parser;
mod token;
mod util;

pub use analysis::{
    AnalysisContext, AnalysisError, Circular, CompilationTimeStamp, Entity, ReferenceChain,
};
pub use codegen::CodegenError;
pub use compiler::{AsnCompiler, Features, SourceId};
pub use diagnostic::{Diagnostic, Label, Level};
pub use location::Location;
