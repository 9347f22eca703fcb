use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a compile diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Pass 1 could not match the grammar at a position (missing required
    /// token, context mismatch, malformed numeric literal).
    Grammar,
    /// Source text that no registered lexeme matches.
    UnknownToken,
    /// A pass-2 token action reported a failure.
    Action,
    /// Script lexer/parser failure (unterminated quote, stray brace, ...).
    Syntax,
    ObjectNameExpected,
    OpenBraceExpected,
    VariableExpected,
    VariableValueExpected,
    UndefinedVariable,
    RecursiveVariable,
    ImportTargetExpected,
    ImportPathExpected,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Grammar => "grammar",
            ErrorKind::UnknownToken => "unknown_token",
            ErrorKind::Action => "action",
            ErrorKind::Syntax => "syntax",
            ErrorKind::ObjectNameExpected => "object_name_expected",
            ErrorKind::OpenBraceExpected => "open_brace_expected",
            ErrorKind::VariableExpected => "variable_expected",
            ErrorKind::VariableValueExpected => "variable_value_expected",
            ErrorKind::UndefinedVariable => "undefined_variable",
            ErrorKind::RecursiveVariable => "recursive_variable",
            ErrorKind::ImportTargetExpected => "import_target_expected",
            ErrorKind::ImportPathExpected => "import_path_expected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single compile diagnostic. Compile entry points never fail outright;
/// they return a success flag and an ordered list of these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    /// Grammar-assigned error id for pass-1 failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    pub file: String,
    pub line: u32,
    /// `None` when the position inside the line is unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: ErrorKind,
        file: &str,
        line: u32,
        column: Option<u32>,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            kind,
            code: None,
            file: file.to_owned(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }

    /// Serialize to JSON. Every field is always present (null when missing),
    /// unlike the derived serde form.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "code":    self.code,
            "column":  self.column,
            "file":    self.file,
            "kind":    self.kind,
            "line":    self.line,
            "message": self.message,
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(col) => write!(f, "{}:{}:{}: ", self.file, self.line, col)?,
            None => write!(f, "{}:{}: ", self.file, self.line)?,
        }
        write!(f, "{} error", self.kind)?;
        if let Some(code) = self.code {
            write!(f, " [{}]", code)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered diagnostic list shared by every pass of a compile.
pub type ErrorList = Vec<Diagnostic>;

/// Failure while building or validating a grammar table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GrammarError {
    #[error("rule table is empty")]
    EmptyTable,
    #[error("rule table entry {index} is outside of any rule path")]
    EntryOutsideRule { index: usize },
    #[error("rule path for token {token} has no entries")]
    EmptyRulePath { token: usize },
    #[error("rule path for token {token} starts with an OR entry")]
    LeadingAlternative { token: usize },
    #[error("rule path for token {token} is not terminated by END or END_EXECUTE")]
    UnterminatedRulePath { token: usize },
    #[error("token {token} is defined by more than one rule path")]
    DuplicateRule { token: usize },
    #[error("rule path for token {rule} references non-terminal {token}, which has no rule path")]
    UndefinedRule { rule: usize, token: usize },
    #[error("BNF line {line}: {message}")]
    Bnf { line: u32, message: String },
}

/// Failure reported by a pass-2 accessor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("no numeric value recorded for token at position {position}")]
    NoValue { position: usize },
    #[error("no label recorded for token at position {position}")]
    NoLabel { position: usize },
    #[error("token at position {position} was not found in the source")]
    UnknownToken { position: usize },
    #[error("token queue is exhausted")]
    EndOfQueue,
    #[error("{0}")]
    Custom(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_value_always_has_every_field() {
        let d = Diagnostic::new(ErrorKind::UndefinedVariable, "a.material", 3, None, "x");
        let v = d.to_json_value();
        assert_eq!(v["kind"], "undefined_variable");
        assert!(v["column"].is_null());
        assert!(v["code"].is_null());
        assert_eq!(v["line"], 3);
    }

    #[test]
    fn derived_serde_skips_missing_column() {
        let d = Diagnostic::new(ErrorKind::Syntax, "f", 1, None, "m");
        let s = serde_json::to_string(&d).unwrap();
        assert!(!s.contains("column"));
        assert!(!s.contains("code"));
    }

    #[test]
    fn display_includes_position_and_code() {
        let d =
            Diagnostic::new(ErrorKind::Grammar, "src", 2, Some(5), "unexpected 'x'").with_code(7);
        assert_eq!(d.to_string(), "src:2:5: grammar error [7]: unexpected 'x'");
    }
}
