use std::path::Path;
use std::process;

use crate::commands::compile_script;
use crate::{report_diagnostics, OutputFormat, ScriptArgs};

pub(crate) fn cmd_check(
    file: &Path,
    args: &ScriptArgs,
    config: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let (ok, compiler) = compile_script(file, args, config, output, quiet);

    if !ok {
        report_diagnostics(compiler.errors(), output, quiet);
        process::exit(1);
    }

    if !quiet {
        match output {
            OutputFormat::Json => {
                let file = file.display().to_string();
                println!("{}", serde_json::json!({ "file": file, "ok": true }));
            }
            OutputFormat::Text => println!("{}: ok", file.display()),
        }
    }
}
