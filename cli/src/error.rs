//! Rendering of compiler diagnostics with ariadne

use std::{collections::HashMap, fmt, ops::Range};

use ariadne::{Config, IndexType, ReportKind, Source};
use asn1_ios::{AsnCompiler, Diagnostic, Level, SourceId};
use tracing::warn;

type Report = ariadne::Report<'static, (SourceId, Range<usize>)>;

/// Prints diagnostics against the source files held by a compiler
pub struct Reporter<'a> {
    compiler: &'a AsnCompiler,
    sources: HashMap<SourceId, Source<&'a str>>,
}

impl<'a> Reporter<'a> {
    pub fn new(compiler: &'a AsnCompiler) -> Self {
        Reporter {
            compiler,
            sources: HashMap::new(),
        }
    }

    /// Print diagnostics to stderr.  A diagnostic without any source
    /// location is printed as plain text.
    pub fn print(&mut self, diagnostics: &[Diagnostic]) {
        for diag in diagnostics {
            let Some(report) = build_report(diag) else {
                eprintln!("{diag}");
                continue;
            };

            if let Err(e) = report.eprint(&mut *self) {
                warn!(error = %e, code = %diag.error_code, "unable to render diagnostic");
                eprintln!("{diag}");
            }
        }
    }
}

/// Convert a diagnostic into a report anchored at its first located label.
/// Labels without a location become the note of the report.
fn build_report(diag: &Diagnostic) -> Option<Report> {
    let kind = match diag.level {
        Level::Error => ReportKind::Error,
        Level::Warning => ReportKind::Warning,
    };

    let (located, notes): (Vec<_>, Vec<_>) = diag
        .labels
        .iter()
        .partition(|l| l.source.is_some() && l.location.is_some());

    let (source, span) = located
        .first()
        .and_then(|l| Some((l.source?, l.location.clone()?)))?;

    let mut report = Report::build(kind, source, span.start)
        .with_code(&diag.error_code)
        .with_message(&diag.name)
        .with_config(Config::default().with_index_type(IndexType::Byte));

    for label in located {
        if let (Some(source), Some(span)) = (label.source, label.location.clone()) {
            report.add_label(ariadne::Label::new((source, span)).with_message(&label.message));
        }
    }

    if !notes.is_empty() {
        let note: Vec<_> = notes.iter().map(|l| l.message.as_str()).collect();
        report.set_note(note.join("\n"));
    }

    Some(report.finish())
}

impl<'a> ariadne::Cache<SourceId> for Reporter<'a> {
    type Storage = &'a str;

    fn fetch(&mut self, id: &SourceId) -> Result<&Source<Self::Storage>, Box<dyn fmt::Debug + '_>> {
        let compiler = self.compiler;
        Ok(self
            .sources
            .entry(*id)
            .or_insert_with(|| Source::from(compiler.source_text(*id))))
    }

    fn display<'b>(&self, id: &'b SourceId) -> Option<Box<dyn fmt::Display + 'b>> {
        Some(Box::new(self.compiler.source_name(*id).to_string()))
    }
}
