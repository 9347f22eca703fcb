pub(crate) mod check;
pub(crate) mod resolve;
pub(crate) mod tokens;

use std::path::Path;

use scriptc_core::ScriptCompiler;

use crate::config::load_config;
use crate::{fail, OutputFormat, ScriptArgs};

/// Loads config, then compiles `file` with imports searched next to it
/// first. Returns the compiler so callers can read the tree and errors.
pub(crate) fn compile_script(
    file: &Path,
    args: &ScriptArgs,
    config_path: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) -> (bool, ScriptCompiler) {
    let config = match load_config(config_path) {
        Ok(c) => c.with_overrides(args.allow_nontyped, args.group.as_deref()),
        Err(e) => fail(&e, output, quiet),
    };

    let (dir, name) = match (file.parent(), file.file_name().and_then(|n| n.to_str())) {
        (Some(dir), Some(name)) => (dir, name),
        _ => fail(&format!("invalid script path '{}'", file.display()), output, quiet),
    };

    let mut compiler =
        ScriptCompiler::new(config.provider(dir)).with_options(config.compiler_options());
    match compiler.compile_file(name, None) {
        Ok(ok) => (ok, compiler),
        Err(e) => fail(&format!("could not read '{}': {}", file.display(), e), output, quiet),
    }
}
