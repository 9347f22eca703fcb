mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use scriptc_core::Diagnostic;

use commands::check::cmd_check;
use commands::resolve::cmd_resolve;
use commands::tokens::cmd_tokens;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Script compiler toolchain.
#[derive(Parser)]
#[command(name = "scriptc", version, about = "Script compiler toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Configuration file (defaults to ./scriptc.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve imports, inheritance and variables, then print the tree
    Resolve {
        /// Path to the script file
        file: PathBuf,
        #[command(flatten)]
        options: ScriptArgs,
    },

    /// Resolve a script and report diagnostics only
    Check {
        /// Path to the script file
        file: PathBuf,
        #[command(flatten)]
        options: ScriptArgs,
    },

    /// Tokenize a file with a grammar given as BNF text
    Tokens {
        /// Path to the BNF grammar
        #[arg(long)]
        grammar: PathBuf,
        /// Path to the source file
        file: PathBuf,
        /// Print pass-1 rule trace to stderr
        #[arg(long)]
        trace: bool,
    },
}

/// Compiler settings that override the config file.
#[derive(clap::Args, Debug, Clone, Default)]
pub(crate) struct ScriptArgs {
    /// Allow objects to be referenced by their own name (`base { }`)
    #[arg(long)]
    allow_nontyped: bool,

    /// Resource group used for imports
    #[arg(long)]
    group: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { file, options } => {
            cmd_resolve(&file, &options, cli.config.as_deref(), cli.output, cli.quiet);
        }
        Commands::Check { file, options } => {
            cmd_check(&file, &options, cli.config.as_deref(), cli.output, cli.quiet);
        }
        Commands::Tokens {
            grammar,
            file,
            trace,
        } => {
            cmd_tokens(&grammar, &file, trace, cli.output, cli.quiet);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Writes compile diagnostics to stderr. JSON output is always written so
/// tooling sees the list even with `--quiet`.
pub(crate) fn report_diagnostics(errors: &[Diagnostic], output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let list: Vec<serde_json::Value> =
                errors.iter().map(Diagnostic::to_json_value).collect();
            let json = serde_json::to_string_pretty(&list)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            eprintln!("{}", json);
        }
        OutputFormat::Text => {
            if !quiet {
                for e in errors {
                    eprintln!("{}", e);
                }
            }
        }
    }
}

/// Exits with status 1 after printing a fatal error.
pub(crate) fn fail(msg: &str, output: OutputFormat, quiet: bool) -> ! {
    report_error(msg, output, quiet);
    process::exit(1);
}
