//! Pass 2: execute token actions over the pass-1 token queue.

use super::grammar::{Grammar, TokenId, ALL_CONTEXTS};
use super::{TokenInst, TokenQueue};
use crate::error::{ActionError, Diagnostic, ErrorKind, ErrorList};

/// Language-specific half of a two-pass compiler.
pub trait TokenActions {
    /// Active context bits in effect when tokenizing starts.
    fn initial_contexts(&self) -> u32 {
        ALL_CONTEXTS
    }

    /// Called for every found token whose symbol has an action. The executor
    /// is positioned on that token; the action may advance it to consume
    /// operands.
    fn execute_token_action(
        &mut self,
        token: TokenId,
        exec: &mut Executor<'_>,
    ) -> Result<(), ActionError>;
}

/// Actions for a grammar that only validates syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoActions;

impl TokenActions for NoActions {
    fn execute_token_action(
        &mut self,
        _token: TokenId,
        _exec: &mut Executor<'_>,
    ) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Read cursor over the token queue handed to an action.
pub struct Executor<'q> {
    grammar: &'q Grammar,
    queue: &'q mut TokenQueue,
    cursor: usize,
}

impl<'q> Executor<'q> {
    pub(crate) fn new(grammar: &'q Grammar, queue: &'q mut TokenQueue, cursor: usize) -> Self {
        Executor {
            grammar,
            queue,
            cursor,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        self.grammar
    }

    /// Index of the current token in the queue.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> &TokenInst {
        &self.queue.tokens[self.cursor]
    }

    /// Pass-2 payload of the current token's symbol; 0 for an id the
    /// grammar does not define.
    pub fn pass2_data(&self) -> u32 {
        self.grammar
            .symbols()
            .get(self.current().id)
            .map_or(0, |s| s.pass2_data)
    }

    /// Moves to the next token. The cursor moves even when the next token is
    /// an unmatched placeholder, so callers can report and carry on.
    pub fn advance(&mut self) -> Result<&TokenInst, ActionError> {
        if self.cursor + 1 >= self.queue.tokens.len() {
            return Err(ActionError::EndOfQueue);
        }
        self.cursor += 1;
        let tok = &self.queue.tokens[self.cursor];
        if !tok.found {
            return Err(ActionError::UnknownToken {
                position: self.cursor,
            });
        }
        Ok(tok)
    }

    /// Numeric literal recorded for the current token.
    pub fn value(&self) -> Result<f32, ActionError> {
        self.queue
            .constants
            .get(&self.cursor)
            .copied()
            .ok_or(ActionError::NoValue {
                position: self.cursor,
            })
    }

    /// Label text recorded for the current token.
    pub fn label(&self) -> Result<&str, ActionError> {
        self.queue
            .labels
            .get(&self.cursor)
            .map(String::as_str)
            .ok_or(ActionError::NoLabel {
                position: self.cursor,
            })
    }

    pub fn next_value(&mut self) -> Result<f32, ActionError> {
        self.advance()?;
        self.value()
    }

    pub fn next_label(&mut self) -> Result<String, ActionError> {
        self.advance()?;
        self.label().map(str::to_owned)
    }

    /// Number of queued tokens after the current one.
    pub fn queue_count(&self) -> usize {
        self.queue.tokens.len() - self.cursor - 1
    }

    /// Overwrites the current token. Its value and label entries are
    /// dropped. The replacement is not executed again.
    pub fn replace_token(&mut self, token: TokenInst) {
        self.queue.tokens[self.cursor] = token;
        self.queue.constants.remove(&self.cursor);
        self.queue.labels.remove(&self.cursor);
    }

    /// Inserts tokens right after the current one. They are executed as the
    /// cursor reaches them; value and label keys after the cursor shift.
    pub fn insert_tokens(&mut self, tokens: impl IntoIterator<Item = TokenInst>) {
        let at = self.cursor + 1;
        let new: Vec<TokenInst> = tokens.into_iter().collect();
        let n = new.len();
        if n == 0 {
            return;
        }
        self.queue.tokens.splice(at..at, new);
        let moved = self.queue.constants.split_off(&at);
        self.queue
            .constants
            .extend(moved.into_iter().map(|(k, v)| (k + n, v)));
        let moved = self.queue.labels.split_off(&at);
        self.queue
            .labels
            .extend(moved.into_iter().map(|(k, v)| (k + n, v)));
    }
}

/// Runs actions from `start` to the end of the queue and returns the new
/// read position. Action failures are recorded and execution continues.
pub(crate) fn run<A: TokenActions + ?Sized>(
    grammar: &Grammar,
    queue: &mut TokenQueue,
    start: usize,
    actions: &mut A,
    source_name: &str,
    errors: &mut ErrorList,
) -> usize {
    let mut pos = start;
    while pos < queue.tokens.len() {
        let tok = queue.tokens[pos];
        // Actions may insert ids the grammar does not know; those have no
        // action.
        let has_action = grammar.symbols().get(tok.id).is_some_and(|s| s.has_action);
        if tok.found && has_action {
            let mut exec = Executor::new(grammar, queue, pos);
            let result = actions.execute_token_action(tok.id, &mut exec);
            pos = exec.cursor;
            if let Err(e) = result {
                errors.push(Diagnostic::new(
                    ErrorKind::Action,
                    source_name,
                    tok.line,
                    Some(tok.column),
                    e.to_string(),
                ));
            }
        }
        pos += 1;
    }
    pos
}
