mod error;

use std::{fs, path::PathBuf, process::ExitCode};

use asn1_ios::{AnalysisContext, AsnCompiler, CompilationTimeStamp, Features, Level};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::error::Reporter;

/// Check ASN.1 modules and inspect their information objects
#[derive(Debug, Parser)]
#[command(version, about, color = concolor_clap::color_choice())]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    color: concolor_clap::Color,

    /// Log more detail, may be repeated
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    features: FeatureArgs,
}

#[derive(Debug, Args)]
struct FeatureArgs {
    /// Allow both upper and lowercase keywords
    #[arg(long, global = true)]
    lowercase_keywords: bool,

    /// Allow non-ascii characters in identifiers
    #[arg(long, global = true)]
    unicode_identifiers: bool,

    /// Allow further whitespace characters
    #[arg(long, global = true)]
    unicode_whitespace: bool,

    /// Maximum nesting depth of the parser
    #[arg(long, global = true, default_value_t = Features::default().max_parser_depth)]
    max_parser_depth: usize,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report every problem found in the given files
    Check {
        /// ASN.1 source files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the objects of an object set
    Objects {
        /// Module defining the object set
        module: String,

        /// Name of the object set
        name: String,

        /// ASN.1 source files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the alternatives of an open type component
    Alternatives {
        /// Module defining the type
        module: String,

        /// Name of the type
        name: String,

        /// Component path, e.g. `body.argument`
        path: String,

        /// ASN.1 source files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Generate rust declarations for classes, objects and open types
    Codegen {
        /// ASN.1 source files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Command {
    fn files(&self) -> &[PathBuf] {
        match self {
            Command::Check { files }
            | Command::Objects { files, .. }
            | Command::Alternatives { files, .. }
            | Command::Codegen { files } => files,
        }
    }
}

impl From<&FeatureArgs> for Features {
    fn from(value: &FeatureArgs) -> Self {
        Features {
            lowercase_keywords: value.lowercase_keywords,
            unicode_identifiers: value.unicode_identifiers,
            unicode_whitespace: value.unicode_whitespace,
            max_parser_depth: value.max_parser_depth,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.color.apply();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut compiler = AsnCompiler::with_features((&cli.features).into());
    let mut parsed = true;
    for path in cli.command.files() {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                error!(path = %path.display(), error = %e, "unable to read file");
                return ExitCode::FAILURE;
            }
        };
        debug!(path = %path.display(), "adding file");
        if let Err(diag) = compiler.add_file(path.display().to_string(), source) {
            Reporter::new(&compiler).print(&[diag]);
            parsed = false;
        }
    }
    if !parsed {
        return ExitCode::FAILURE;
    }

    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));
    let output = run(&cli.command, &mut analysis);
    let diagnostics = analysis.diagnostics();
    info!(count = diagnostics.len(), "analysis finished");

    Reporter::new(&compiler).print(&diagnostics);
    match output {
        Ok(output) => {
            print!("{output}");
            if diagnostics.iter().all(|d| d.level != Level::Error) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

/// Produce the output of a command from a finished analysis
fn run(command: &Command, analysis: &mut AnalysisContext) -> Result<String, String> {
    match command {
        Command::Check { .. } => Ok(String::new()),
        Command::Objects { module, name, .. } => {
            let set = analysis
                .object_set(module, name)
                .ok_or_else(|| format!("`{name}` is not an object set of module `{module}`"))?;

            let mut output = String::new();
            for object in analysis.object_set_objects(set) {
                output.push_str(analysis.object_name(object));
                output.push('\n');
            }
            Ok(output)
        }
        Command::Alternatives { module, name, path, .. } => {
            let path: Vec<_> = path.split('.').filter(|p| !p.is_empty()).collect();
            let ty = analysis
                .component_type(module, name, &path)
                .ok_or_else(|| format!("no component `{}` in `{module}.{name}`", path.join(".")))?;

            let mut output = String::new();
            for (alternative, ty) in analysis.open_type_alternatives(ty) {
                output.push_str(&format!("{alternative}: {}\n", analysis.type_display(ty)));
            }
            Ok(output)
        }
        Command::Codegen { .. } => analysis.rust_codegen().map_err(|e| e.to_string()),
    }
}
