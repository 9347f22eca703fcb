//! Script front end: parsing into [`ScriptNode`] trees and the passes that
//! resolve imports, object inheritance and variables before the caller's
//! own compile step.
//!
//! ```text
//! text ─ parse ─▶ nodes ─ imports ─▶ objects ─▶ variables ─▶ ScriptListener::compile_impl
//! ```

pub mod ast;
pub mod compiler;
pub mod imports;
pub mod lexer;
pub mod locate;
pub mod objects;
pub mod parser;
pub mod source;
pub mod variables;

pub use ast::{NodeType, ScriptNode};
pub use compiler::{NoListener, ScriptCompiler, ScriptCompilerOptions, ScriptListener};
pub use locate::{contains_object, is_truth_value, locate};
pub use parser::{parse, parse_with_mode, ParseMode};
pub use source::{FileSystemProvider, InMemoryProvider, ResourceProvider};
