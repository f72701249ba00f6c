//! The primary interface to all the ASN.1 parsing, codegen, analysis, and other tools.

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::{
    analysis::{AnalysisContext, AnalysisError, CompilationTimeStamp},
    ast::Ast,
    diagnostic::Diagnostic,
    lexer::Lexer,
    parser,
};

/// Built-in classes visible from every module without an import
const PRELUDE: &str = r#"
Prelude DEFINITIONS ::= BEGIN
    TYPE-IDENTIFIER ::= CLASS {
        &id OBJECT IDENTIFIER UNIQUE,
        &Type
    } WITH SYNTAX { &Type IDENTIFIED BY &id }

    ABSTRACT-SYNTAX ::= CLASS {
        &id OBJECT IDENTIFIER UNIQUE,
        &Type,
        &property BIT STRING { handles-invalid-encodings(0) } DEFAULT {}
    } WITH SYNTAX { &Type IDENTIFIED BY &id [HAS PROPERTY &property] }
END
"#;

/// Name of the source holding the built-in module
pub(crate) const PRELUDE_NAME: &str = "<prelude>";

/// Name of the built-in module, searched after a module's own imports
pub(crate) const PRELUDE_MODULE: &str = "Prelude";

/// Store of all information relating to a whole ASN.1 specification, including
/// multiple files, analysis and code generation.
#[derive(Debug, Clone)]
pub struct AsnCompiler {
    /// List of all included source files.
    sources: Vec<Source>,

    /// The enabled features.
    features: Features,

    /// Semantic model of every module parsed so far
    pub(crate) ast: Ast,

    /// Every error reported by analysis so far.  Sources never change once
    /// added, so a problem found once stays valid for later timestamps.
    pub(crate) errors: Vec<AnalysisError>,
}

/// All features that can be enabled within the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Features {
    /// Allow both upper and lowercase keywords.
    pub lowercase_keywords: bool,

    /// Allow non-ascii characters in identifiers
    pub unicode_identifiers: bool,

    /// Allow further whitespace characters
    pub unicode_whitespace: bool,

    /// Maximum nesting depth of the parser before it gives up
    pub max_parser_depth: usize,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            lowercase_keywords: false,
            unicode_identifiers: false,
            unicode_whitespace: false,
            max_parser_depth: 100,
        }
    }
}

/// Information relating to a single source file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Source {
    /// File name and path.
    pub(crate) file_name: String,

    /// Source text of the file
    pub(crate) source: String,

    /// ID of the source
    pub(crate) id: SourceId,
}

/// Reference to a single source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(usize);

impl SourceId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }
}

impl Default for AsnCompiler {
    fn default() -> Self {
        Self::with_features(Features::default())
    }
}

impl AsnCompiler {
    /// Create a new compiler
    pub fn new() -> Self {
        Default::default()
    }

    /// Create a new compiler with the given features enabled.  The built-in
    /// prelude module is parsed immediately.
    pub fn with_features(features: Features) -> Self {
        let mut compiler = Self {
            sources: vec![],
            features,
            ast: Ast::default(),
            errors: vec![],
        };

        if let Err(e) = compiler.add_file(PRELUDE_NAME.to_string(), PRELUDE.to_string()) {
            warn!(error = %e, "unable to parse the built-in prelude");
        }

        compiler
    }

    /// Add a new file to the compiler.  Will do some initial parsing, but will
    /// not run any analysis that is required to check that the source files
    /// are valid.  The file is kept even when parsing fails so that the
    /// returned diagnostic can be displayed against it; none of its modules
    /// are added in that case.
    pub fn add_file(&mut self, file_name: String, source: String) -> Result<SourceId, Diagnostic> {
        let id = SourceId(self.sources.len());
        debug!(file = %file_name, ?id, "adding source file");

        self.sources.push(Source {
            file_name,
            source,
            id,
        });

        let text = &self.sources[id.0].source;
        let tokens = Lexer::new(id, text, self.features)
            .run()
            .map_err(Diagnostic::from)?;

        let mark = self.ast.mark();
        let result = parser::parse_source(&tokens, &mut self.ast, id, self.features.max_parser_depth);
        if let Err(e) = result {
            self.ast.rollback(mark);
            return Err(e.into());
        }

        Ok(id)
    }

    /// Get an iterator over all source IDs
    pub fn all_sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.sources.iter().map(|s| s.id)
    }

    /// Get the source associated with a source id
    #[inline]
    pub(crate) fn source(&self, file: SourceId) -> &Source {
        &self.sources[file.0]
    }

    /// The text of a source file
    pub fn source_text(&self, file: SourceId) -> &str {
        &self.source(file).source
    }

    /// The name of a source file, as given when it was added
    pub fn source_name(&self, file: SourceId) -> &str {
        &self.source(file).file_name
    }

    /// The semantic model of all parsed modules
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Run static analysis of all the provided source files, checking every
    /// entity that has not already been checked at `timestamp`.
    pub fn analysis(&mut self, timestamp: CompilationTimeStamp) -> AnalysisContext {
        let mut context = AnalysisContext::new(self, timestamp);
        context.check_all();
        context
    }
}

impl Deref for AsnCompiler {
    type Target = Features;

    fn deref(&self) -> &Self::Target {
        &self.features
    }
}

impl DerefMut for AsnCompiler {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_is_loaded() {
        let compiler = AsnCompiler::new();
        assert!(compiler.ast().module_by_name("Prelude").is_some());
        assert_eq!(compiler.all_sources().count(), 1);
    }

    #[test]
    fn failed_parse_keeps_source_but_not_modules() {
        let mut compiler = AsnCompiler::new();
        let modules = compiler.ast().modules().count();

        let err = compiler
            .add_file("bad.asn".into(), "Bad DEFINITIONS ::= BEGIN a ::= END".into())
            .unwrap_err();

        assert_eq!(err.level, crate::Level::Error);
        assert_eq!(compiler.ast().modules().count(), modules);
        assert_eq!(compiler.all_sources().count(), 2);
    }

    #[test]
    fn features_deref() {
        let mut compiler = AsnCompiler::new();
        assert_eq!(compiler.max_parser_depth, 100);
        compiler.lowercase_keywords = true;
        assert!(compiler.lowercase_keywords);
    }
}
