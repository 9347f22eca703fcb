//! Generic table-driven two-pass compiler.
//!
//! Pass 1 tokenizes source text by interpreting a [`Grammar`]: it checks
//! syntax and context while building a queue of [`TokenInst`] entries, with
//! numeric literals and labels recorded alongside. Pass 2 walks that queue
//! and hands every token that has an action to the language's
//! [`TokenActions`]. Rule paths ending in `EndExecute` run pass 2 early so
//! statements execute as soon as they are complete.

pub mod bnf;
pub mod grammar;
mod pass1;
pub mod pass2;
mod scanner;

use crate::error::ErrorList;
use std::collections::BTreeMap;

pub use bnf::BnfGrammar;
pub use grammar::{Grammar, GrammarBuilder, Operation, SymbolDef, TokenId, TokenRule};
pub use pass2::{Executor, NoActions, TokenActions};

/// One token recognized (or expected and missing) during pass 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInst {
    /// Non-terminal whose rule path produced the token.
    pub rule: TokenId,
    /// Token id, or the expected id for a failure placeholder.
    pub id: TokenId,
    pub line: u32,
    pub column: u32,
    /// Character offset in the source.
    pub offset: usize,
    /// False for placeholders marking where pass 1 failed.
    pub found: bool,
}

/// Pass-1 output: tokens plus the numeric and label tables keyed by token
/// position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenQueue {
    pub tokens: Vec<TokenInst>,
    pub constants: BTreeMap<usize, f32>,
    pub labels: BTreeMap<usize, String>,
}

impl TokenQueue {
    /// Drops every token at or after `len` together with its data.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.tokens.truncate(len);
        self.constants.split_off(&len);
        self.labels.split_off(&len);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Result of one compile.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub success: bool,
    pub queue: TokenQueue,
    pub errors: ErrorList,
}

/// A two-pass compiler for one grammar. Each call to
/// [`Compiler2Pass::compile`] owns its own working state, so a compiler can
/// be reused for any number of sources.
#[derive(Debug, Clone)]
pub struct Compiler2Pass {
    grammar: Grammar,
    trace: bool,
}

impl Compiler2Pass {
    pub fn new(grammar: Grammar) -> Self {
        Compiler2Pass {
            grammar,
            trace: false,
        }
    }

    /// Writes rule entry/exit and token pushes to stderr during pass 1.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn compile<A: TokenActions + ?Sized>(
        &self,
        source: &str,
        actions: &mut A,
    ) -> CompileOutput {
        self.compile_named(source, "<source>", actions)
    }

    /// Runs pass 1 over `source`, then pass 2 over whatever tokens earlier
    /// `EndExecute` rules left unexecuted. The final pass 2 only runs when
    /// pass 1 found no errors.
    pub fn compile_named<A: TokenActions + ?Sized>(
        &self,
        source: &str,
        source_name: &str,
        actions: &mut A,
    ) -> CompileOutput {
        let mut pass1 = pass1::Pass1::new(&self.grammar, source, source_name, actions, self.trace);
        let tokenized = pass1.run();
        if tokenized {
            pass1.execute_pass2();
        }
        let (queue, errors) = pass1.finish();
        CompileOutput {
            success: tokenized && errors.is_empty(),
            queue,
            errors,
        }
    }
}
