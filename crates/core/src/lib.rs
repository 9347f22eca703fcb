//! scriptc-core: table-driven two-pass compiler and script AST passes.
//!
//! Two independent front ends share one diagnostic model:
//!
//! - [`twopass`] -- a grammar-table interpreter. Pass 1 tokenizes source
//!   against a [`Grammar`] (built from rule tables or BNF text); pass 2
//!   hands each token with an action to the language's [`TokenActions`].
//! - [`script`] -- parses brace-structured script text into
//!   [`ScriptNode`] trees and resolves imports, `:` inheritance and
//!   `$variable` substitution.
//!
//! # Public API
//!
//! - [`Compiler2Pass`] -- compile source with a grammar and actions
//! - [`BnfGrammar`] -- build a grammar from BNF text
//! - [`ScriptCompiler`] -- parse and resolve a script
//! - [`Diagnostic`] -- one compile error; every compile returns a list

pub mod error;
pub mod script;
pub mod twopass;

// ── Convenience re-exports: key types ────────────────────────────────

pub use error::{ActionError, Diagnostic, ErrorKind, ErrorList, GrammarError};
pub use script::{
    NodeType, ResourceProvider, ScriptCompiler, ScriptCompilerOptions, ScriptListener, ScriptNode,
};
pub use twopass::{
    BnfGrammar, CompileOutput, Compiler2Pass, Executor, Grammar, GrammarBuilder, NoActions,
    TokenActions, TokenInst, TokenQueue,
};
