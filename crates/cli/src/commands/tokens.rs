use std::path::Path;
use std::process;

use scriptc_core::{BnfGrammar, Compiler2Pass, Grammar, NoActions, TokenQueue};
use serde::Serialize;

use crate::{fail, report_diagnostics, OutputFormat};

/// One row of `scriptc tokens` output.
#[derive(Debug, Serialize)]
struct TokenRow<'a> {
    position: usize,
    id: usize,
    text: &'a str,
    line: u32,
    column: u32,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
}

fn rows<'a>(grammar: &'a Grammar, queue: &'a TokenQueue) -> Vec<TokenRow<'a>> {
    queue
        .tokens
        .iter()
        .enumerate()
        .map(|(position, t)| TokenRow {
            position,
            id: t.id,
            text: grammar.type_def_text(t.id),
            line: t.line,
            column: t.column,
            found: t.found,
            value: queue.constants.get(&position).copied(),
            label: queue.labels.get(&position).map(String::as_str),
        })
        .collect()
}

pub(crate) fn cmd_tokens(
    grammar_path: &Path,
    file: &Path,
    trace: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let bnf = std::fs::read_to_string(grammar_path).unwrap_or_else(|e| {
        let msg = format!("could not read '{}': {}", grammar_path.display(), e);
        fail(&msg, output, quiet)
    });
    let grammar = BnfGrammar::new().build(&bnf).unwrap_or_else(|e| {
        let msg = format!("grammar error in '{}': {}", grammar_path.display(), e);
        fail(&msg, output, quiet)
    });
    let source = std::fs::read_to_string(file).unwrap_or_else(|e| {
        let msg = format!("could not read '{}': {}", file.display(), e);
        fail(&msg, output, quiet)
    });

    let mut compiler = Compiler2Pass::new(grammar);
    compiler.set_trace(trace);
    let name = file.display().to_string();
    let result = compiler.compile_named(&source, &name, &mut NoActions);
    let table = rows(compiler.grammar(), &result.queue);

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&table)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            for row in &table {
                let mut line = format!(
                    "{:>4}  {}:{}  {:<4} {}",
                    row.position, row.line, row.column, row.id, row.text
                );
                if let Some(v) = row.value {
                    line.push_str(&format!("  = {}", v));
                }
                if let Some(l) = row.label {
                    line.push_str(&format!("  \"{}\"", l));
                }
                if !row.found {
                    line.push_str("  (missing)");
                }
                println!("{}", line);
            }
        }
    }

    if !result.success {
        report_diagnostics(&result.errors, output, quiet);
        process::exit(1);
    }
}
