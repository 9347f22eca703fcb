//! Pass 1: tokenize the source by interpreting the grammar's rule paths.
//!
//! The interpreter walks the flat rule table recursively. Each rule path is
//! evaluated left to right with a running `passed` flag; a failed path rolls
//! back every token, value, label, cursor move and context change it made.
//! A rule path that ends in `EndExecute` hands the tokens produced so far to
//! pass 2 before tokenizing continues.

use super::grammar::{
    Grammar, Operation, TokenId, TokenRule, CHARACTER_TOKEN, NO_TOKEN, UNKNOWN_TOKEN, VALUE_TOKEN,
};
use super::pass2::{self, TokenActions};
use super::scanner::{ScanPos, Scanner};
use super::{TokenInst, TokenQueue};
use crate::error::{Diagnostic, ErrorKind, ErrorList};

/// State restored when a rule path fails.
#[derive(Debug, Clone)]
struct Checkpoint {
    scan: ScanPos,
    tokens: usize,
    contexts: u32,
    label_end: Option<usize>,
    label_len: Option<usize>,
}

/// Furthest point any terminal failed to match during one root attempt.
#[derive(Debug, Clone)]
struct Furthest {
    at: ScanPos,
    error_id: u32,
    expected: Vec<TokenId>,
    expected_text: Vec<String>,
}

pub(crate) struct Pass1<'g, 'a, A: TokenActions + ?Sized> {
    grammar: &'g Grammar,
    scanner: Scanner<'g>,
    queue: TokenQueue,
    active_contexts: u32,
    /// End offset of the open label. A label is open only while it is the
    /// most recent token instance.
    label_end: Option<usize>,
    /// Tokens before this index have been executed by pass 2 and are never
    /// rolled back.
    pass2_pos: usize,
    committed: Option<Checkpoint>,
    actions: &'a mut A,
    source_name: String,
    errors: ErrorList,
    furthest: Option<Furthest>,
    trace: bool,
    depth: usize,
}

impl<'g, 'a, A: TokenActions + ?Sized> Pass1<'g, 'a, A> {
    pub fn new(
        grammar: &'g Grammar,
        source: &str,
        source_name: &str,
        actions: &'a mut A,
        trace: bool,
    ) -> Self {
        let active_contexts = actions.initial_contexts();
        Pass1 {
            grammar,
            scanner: Scanner::new(source, grammar.line_comments()),
            queue: TokenQueue::default(),
            active_contexts,
            label_end: None,
            pass2_pos: 0,
            committed: None,
            actions,
            source_name: source_name.to_owned(),
            errors: Vec::new(),
            furthest: None,
            trace,
            depth: 0,
        }
    }

    /// Tokenizes the whole source, recovering after every failure.
    /// Returns true when the root rule consumed the entire source.
    pub fn run(&mut self) -> bool {
        let root = self.grammar.root();
        let mut passed = true;
        let mut recovering = false;

        loop {
            self.furthest = None;
            let start = self.scanner.pos();
            let symbol_start = self.next_symbol_pos();
            let ok = self.process_rule_path(root);
            // Progress, or a failure past the first symbol, is a new error
            // even when the failed statement was rolled back.
            let failed_later = self
                .furthest
                .as_ref()
                .is_some_and(|f| f.at.pos > symbol_start);
            if self.scanner.pos() > start || failed_later {
                recovering = false;
            }

            if !self.scanner.position_to_next_symbol() {
                if !ok && !recovering {
                    self.report_failure();
                    passed = false;
                }
                break;
            }

            // Text is left over: the root rule could not continue here.
            if !recovering {
                self.report_failure();
                passed = false;
                recovering = true;
            }
            let resume = match &self.furthest {
                Some(f) if f.at.pos > self.scanner.pos() => f.at,
                _ => self.scanner.save(),
            };
            self.scanner.restore(resume);
            self.scanner.skip_symbol();
            self.label_end = None;
        }

        passed
    }

    /// Offset of the next symbol, leaving the cursor where it is.
    fn next_symbol_pos(&mut self) -> usize {
        let before = self.scanner.save();
        self.scanner.position_to_next_symbol();
        let pos = self.scanner.pos();
        self.scanner.restore(before);
        pos
    }

    /// Executes pass 2 over every token not yet consumed.
    pub fn execute_pass2(&mut self) {
        self.label_end = None;
        self.pass2_pos = pass2::run(
            self.grammar,
            &mut self.queue,
            self.pass2_pos,
            &mut *self.actions,
            &self.source_name,
            &mut self.errors,
        );
        self.committed = Some(self.checkpoint());
    }

    pub fn finish(self) -> (TokenQueue, ErrorList) {
        (self.queue, self.errors)
    }

    // ── Rule path interpretation ─────────────────────────────────────

    fn process_rule_path(&mut self, rule_path: usize) -> bool {
        let grammar = self.grammar;
        let cp = self.checkpoint();
        let active_rule = grammar.rule_entry(rule_path).token;
        self.trace_rule("enter", active_rule);
        self.depth += 1;

        let mut idx = rule_path + 1;
        let mut passed = true;
        loop {
            let entry = grammar.rule_entry(idx);
            match entry.operation {
                Operation::And => {
                    if passed {
                        passed = self.validate_token(entry, active_rule);
                    }
                }
                Operation::Or => {
                    if passed {
                        // The alternatives before this one matched: skip
                        // straight to the end marker of the path.
                        while !grammar.rule_entry(idx).operation.is_end() {
                            idx += 1;
                        }
                        continue;
                    }
                    self.restore(&cp);
                    passed = self.validate_token(entry, active_rule);
                }
                Operation::Optional => {
                    if passed {
                        self.validate_token(entry, active_rule);
                    }
                }
                Operation::Repeat => {
                    if passed {
                        let mut prev = self.scanner.pos();
                        while self.validate_token(entry, active_rule) {
                            // A match that does not advance the cursor would
                            // match forever.
                            if self.scanner.pos() > prev {
                                prev = self.scanner.pos();
                            } else {
                                break;
                            }
                        }
                    }
                }
                Operation::End | Operation::EndExecute => {
                    if !passed {
                        self.restore(&cp);
                    } else if entry.operation == Operation::EndExecute {
                        self.execute_pass2();
                    }
                    break;
                }
                Operation::Rule => {
                    // Unreachable for validated grammars.
                    passed = false;
                    self.restore(&cp);
                    break;
                }
            }
            idx += 1;
        }

        self.depth -= 1;
        self.trace_rule(if passed { "pass" } else { "fail" }, active_rule);
        passed
    }

    fn validate_token(&mut self, entry: &TokenRule, active_rule: TokenId) -> bool {
        let grammar = self.grammar;
        let token = entry.token;
        let symbol = grammar.symbol(token);

        if symbol.context_key & self.active_contexts == 0 {
            let before = self.scanner.save();
            self.scanner.position_to_next_symbol();
            let at = self.scanner.save();
            self.scanner.restore(before);
            self.note_failure(entry, at);
            return false;
        }

        if entry.is_non_terminal() {
            return match symbol.rule_path {
                Some(rule_path) => self.process_rule_path(rule_path),
                None => false,
            };
        }

        let passed = match token {
            CHARACTER_TOKEN => self.match_character(entry, active_rule),
            VALUE_TOKEN => self.match_value(entry, active_rule),
            _ => self.match_symbol(entry, active_rule),
        };
        if passed {
            self.active_contexts &= !symbol.context_clear;
            self.active_contexts |= symbol.context_set;
        }
        passed
    }

    fn match_symbol(&mut self, entry: &TokenRule, active_rule: TokenId) -> bool {
        let before = self.scanner.save();
        let text = entry.symbol.as_deref().unwrap_or("");
        if self.scanner.position_to_next_symbol() {
            if let Some(len) = self.scanner.is_symbol(text) {
                if entry.token != NO_TOKEN {
                    self.push_token(entry.token, active_rule);
                }
                self.label_end = None;
                self.scanner.advance(len);
                return true;
            }
        }
        self.note_failure(entry, self.scanner.save());
        self.scanner.restore(before);
        false
    }

    fn match_value(&mut self, entry: &TokenRule, active_rule: TokenId) -> bool {
        let before = self.scanner.save();
        if self.scanner.position_to_next_symbol() {
            if let Some((value, len)) = self.scanner.is_float_value() {
                let index = self.push_token(VALUE_TOKEN, active_rule);
                self.queue.constants.insert(index, value);
                self.label_end = None;
                self.scanner.advance(len);
                return true;
            }
        }
        self.note_failure(entry, self.scanner.save());
        self.scanner.restore(before);
        false
    }

    /// Character-set terminal. While a label is open the character must
    /// sit right at the label's end; otherwise a new label starts after
    /// skipping whitespace. Only a non-character terminal closes a label.
    fn match_character(&mut self, entry: &TokenRule, active_rule: TokenId) -> bool {
        let set = entry.symbol.as_deref().unwrap_or("");
        let in_set = |c: Option<char>| c.is_some_and(|c| set.contains(c));

        if let Some(end) = self.label_end {
            let last = self.queue.tokens.len().checked_sub(1);
            match (self.scanner.peek(), last) {
                (Some(c), Some(last)) if end == self.scanner.pos() && in_set(Some(c)) => {
                    self.queue.labels.entry(last).or_default().push(c);
                    self.scanner.advance(1);
                    self.label_end = Some(self.scanner.pos());
                    return true;
                }
                _ => {
                    self.note_failure(entry, self.scanner.save());
                    return false;
                }
            }
        }

        let before = self.scanner.save();
        if self.scanner.position_to_next_symbol() && in_set(self.scanner.peek()) {
            if let Some(c) = self.scanner.peek() {
                let index = self.push_token(CHARACTER_TOKEN, active_rule);
                self.queue.labels.insert(index, c.to_string());
                self.scanner.advance(1);
                self.label_end = Some(self.scanner.pos());
                return true;
            }
        }
        self.note_failure(entry, self.scanner.save());
        self.scanner.restore(before);
        false
    }

    fn push_token(&mut self, id: TokenId, active_rule: TokenId) -> usize {
        let index = self.queue.tokens.len();
        self.queue.tokens.push(TokenInst {
            rule: active_rule,
            id,
            line: self.scanner.line(),
            column: self.scanner.column(),
            offset: self.scanner.pos(),
            found: true,
        });
        if self.trace {
            eprintln!(
                "[TRACE] {:indent$}token {} '{}' at {}:{}",
                "",
                index,
                self.grammar.type_def_text(id),
                self.scanner.line(),
                self.scanner.column(),
                indent = self.depth * 2
            );
        }
        index
    }

    // ── Backtracking ─────────────────────────────────────────────────

    fn checkpoint(&self) -> Checkpoint {
        let label_len = match (self.label_end, self.queue.tokens.len().checked_sub(1)) {
            (Some(_), Some(last)) => self.queue.labels.get(&last).map(String::len),
            _ => None,
        };
        Checkpoint {
            scan: self.scanner.save(),
            tokens: self.queue.tokens.len(),
            contexts: self.active_contexts,
            label_end: self.label_end,
            label_len,
        }
    }

    fn restore(&mut self, cp: &Checkpoint) {
        // Executed tokens stay: fall back to the state right after the last
        // pass-2 run when the checkpoint predates it.
        let cp = match &self.committed {
            Some(committed) if cp.tokens < self.pass2_pos => committed.clone(),
            _ => cp.clone(),
        };
        self.queue.truncate(cp.tokens);
        self.scanner.restore(cp.scan);
        self.active_contexts = cp.contexts;
        self.label_end = cp.label_end;
        if let (Some(len), Some(last)) = (cp.label_len, cp.tokens.checked_sub(1)) {
            if let Some(label) = self.queue.labels.get_mut(&last) {
                label.truncate(len);
            }
        }
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    fn note_failure(&mut self, entry: &TokenRule, at: ScanPos) {
        let text = match entry.token {
            VALUE_TOKEN => "<#value>".to_owned(),
            CHARACTER_TOKEN => "<label>".to_owned(),
            _ => entry.symbol.clone().unwrap_or_else(|| {
                self.grammar.type_def_text(entry.token).to_owned()
            }),
        };
        match &mut self.furthest {
            Some(f) if f.at.pos > at.pos => {}
            Some(f) if f.at.pos == at.pos => {
                if !f.expected_text.contains(&text) {
                    f.expected.push(entry.token);
                    f.expected_text.push(text);
                }
            }
            _ => {
                self.furthest = Some(Furthest {
                    at,
                    error_id: entry.error_id,
                    expected: vec![entry.token],
                    expected_text: vec![text],
                });
            }
        }
    }

    /// Records a diagnostic and a placeholder token instance for the
    /// furthest failure of the current root attempt.
    fn report_failure(&mut self) {
        let current = self.scanner.save();
        let failure = match self.furthest.clone() {
            Some(f) if f.at.pos >= current.pos => f,
            _ => Furthest {
                at: current,
                error_id: 0,
                expected: Vec::new(),
                expected_text: Vec::new(),
            },
        };

        let resume = self.scanner.save();
        self.scanner.restore(failure.at);
        let found = self.scanner.current_symbol_text();
        let rest = self.scanner.rest(64);
        let (line, column, offset) = (
            self.scanner.line(),
            self.scanner.column(),
            self.scanner.pos(),
        );
        self.scanner.restore(resume);

        let mut message = if found.is_empty() {
            "unexpected end of source".to_owned()
        } else {
            format!("unexpected '{}'", found)
        };
        if !failure.expected_text.is_empty() {
            let list: Vec<String> = failure
                .expected_text
                .iter()
                .map(|t| format!("'{}'", t))
                .collect();
            message.push_str(&format!(", expected one of: {}", list.join(", ")));
        }

        let kind = if !found.is_empty() && !self.is_known_text(&rest) {
            ErrorKind::UnknownToken
        } else {
            ErrorKind::Grammar
        };
        self.errors.push(
            Diagnostic::new(kind, &self.source_name, line, Some(column), message)
                .with_code(failure.error_id),
        );

        self.queue.tokens.push(TokenInst {
            rule: self.grammar.rule_entry(self.grammar.root()).token,
            id: failure.expected.first().copied().unwrap_or(UNKNOWN_TOKEN),
            line,
            column,
            offset,
            found: false,
        });
    }

    /// True when some lexeme or terminal of the grammar could match `text`.
    fn is_known_text(&self, text: &str) -> bool {
        if self.grammar.lexemes().matches_prefix(text) {
            return true;
        }
        let first = text.chars().next();
        let comments: Vec<String> = Vec::new();
        let numeric = Scanner::new(text, &comments).is_float_value().is_some();
        self.grammar.rules().iter().any(|r| match (r.token, r.symbol.as_deref()) {
            (VALUE_TOKEN, _) => numeric,
            (CHARACTER_TOKEN, Some(set)) => first.is_some_and(|c| set.contains(c)),
            (_, Some(sym)) if !r.operation.is_end() && r.operation != Operation::Rule => {
                !sym.is_empty() && text.starts_with(sym)
            }
            _ => false,
        })
    }

    fn trace_rule(&self, what: &str, rule: TokenId) {
        if self.trace {
            eprintln!(
                "[TRACE] {:indent$}{} {} at {}:{}",
                "",
                what,
                self.grammar.type_def_text(rule),
                self.scanner.line(),
                self.scanner.column(),
                indent = self.depth * 2
            );
        }
    }
}
