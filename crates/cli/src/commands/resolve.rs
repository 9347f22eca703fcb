use std::path::Path;
use std::process;

use scriptc_core::script::ast::pretty;

use crate::commands::compile_script;
use crate::{report_diagnostics, OutputFormat, ScriptArgs};

/// Prints the resolved tree even when diagnostics were reported, so a
/// partially resolved script can still be inspected.
pub(crate) fn cmd_resolve(
    file: &Path,
    args: &ScriptArgs,
    config: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let (ok, compiler) = compile_script(file, args, config, output, quiet);

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(compiler.output())
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", pretty(compiler.output())),
    }

    if !ok {
        report_diagnostics(compiler.errors(), output, quiet);
        process::exit(1);
    }
}
