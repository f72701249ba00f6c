use std::ops::{Deref, DerefMut};

use tracing::{debug, trace};

use crate::{
    ast::{Block, ScopeId},
    diagnostic::{Diagnostic, Level},
    location::Location,
    parser::{self, Parser, ParserError},
    AsnCompiler,
};

use super::{chain::Circular, AnalysisError, CompilationTimeStamp, Entity, ReferenceChain};

/// Data used and produced by static analysis of source files.  Analysis runs
/// at a single timestamp; anything already checked at that timestamp or later
/// is not checked again.
#[derive(Debug)]
pub struct AnalysisContext<'a> {
    compiler: &'a mut AsnCompiler,

    timestamp: CompilationTimeStamp,
}

impl<'a> AnalysisContext<'a> {
    /// Create an analysis context without checking anything yet
    pub(crate) fn new(compiler: &'a mut AsnCompiler, timestamp: CompilationTimeStamp) -> Self {
        Self {
            compiler,
            timestamp,
        }
    }

    /// The timestamp everything is checked at
    pub fn timestamp(&self) -> CompilationTimeStamp {
        self.timestamp
    }

    /// Check every assignment of every module
    pub(crate) fn check_all(&mut self) {
        debug!(timestamp = %self.timestamp, "checking all modules");

        let modules: Vec<_> = self.ast.modules().collect();
        for module in modules {
            let duplicates = self.ast[module].duplicates.clone();
            for duplicate in duplicates {
                let name = self.ast[duplicate].name.clone();
                let first = self.ast[module].assignments.get(&name.name).copied();
                if let Some(first) = first {
                    let first = self.ast[first].name.location.clone();
                    self.report(AnalysisError::DuplicateAssignment {
                        name: name.name,
                        location: name.location,
                        first,
                    });
                }
            }

            let assignments: Vec<_> = self.ast[module].assignments.values().copied().collect();
            for assignment in assignments {
                self.check_assignment(assignment, &mut ReferenceChain::new());
            }
        }
    }

    /// Record an error.  The same error found again, at this or a later
    /// timestamp, is only recorded once.
    pub(crate) fn report(&mut self, error: AnalysisError) {
        if self.compiler.errors.contains(&error) {
            trace!(%error, "error already reported");
            return;
        }

        debug!(%error, code = error.code(), "reporting error");
        self.compiler.errors.push(error);
    }

    /// Report a reference cycle.  The cycle is described from its smallest
    /// member, so finding it again from another member is not a new error.
    pub(crate) fn report_circular(&mut self, circular: Circular) {
        let circular = circular.named().canonical();
        debug!(path = circular.describe(), "circular reference");

        let Some(&first) = circular.entities.first() else {
            return;
        };
        let location = self.entity_location(first);

        self.report(AnalysisError::Circular {
            path: circular.describe(),
            location,
        });
    }

    /// Where an entity was written
    pub(crate) fn entity_location(&self, entity: Entity) -> Location {
        match entity {
            Entity::Assignment(id) => self.ast[id].name.location.clone(),
            Entity::Type(id) => self.ast[id].location.clone(),
            Entity::Value(id) => self.ast[id].location.clone(),
            Entity::Class(id) => self.ast[id].location.clone(),
            Entity::Object(id) => self.ast[id].location.clone(),
            Entity::ObjectSet(id) => self.ast[id].location.clone(),
        }
    }

    /// Every error reported so far
    pub fn errors(&self) -> &[AnalysisError] {
        &self.compiler.errors
    }

    /// Every error reported so far, as diagnostics ready to display
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.errors().iter().cloned().map(Diagnostic::from).collect()
    }

    /// Have any errors been reported.  Warnings are not counted.
    pub fn has_errors(&self) -> bool {
        self.compiler.errors.iter().any(|e| e.level() == Level::Error)
    }

    /// Parse a deferred block of tokens, resolving names in `scope`
    pub(crate) fn parse_block<T>(
        &mut self,
        block: &Block,
        scope: ScopeId,
        f: impl FnOnce(&mut Parser<'_>) -> parser::Result<T>,
    ) -> Result<T, ParserError> {
        trace!(location = %block.location, "parsing deferred block");

        let max_depth = self.compiler.max_parser_depth;
        let mut parser = Parser::block(block, &mut self.compiler.ast, scope, max_depth);
        f(&mut parser)
    }
}

impl Deref for AnalysisContext<'_> {
    type Target = AsnCompiler;

    fn deref(&self) -> &Self::Target {
        self.compiler
    }
}

impl DerefMut for AnalysisContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.compiler
    }
}
