//! Script compiler: parse, then resolve imports, inheritance and variables,
//! then hand the tree to the listener's compile step.

use super::ast::ScriptNode;
use super::imports::{ImportLoader, ImportResolver};
use super::objects::ObjectResolver;
use super::parser::{self, ParseMode};
use super::source::ResourceProvider;
use super::variables::VariableResolver;
use crate::error::ErrorList;
use serde::{Deserialize, Serialize};

/// Per-compiler settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptCompilerOptions {
    /// Let an object be found by its own token (`base { }`) as well as by
    /// its first child word (`material base { }`).
    pub allow_nontyped_objects: bool,
    /// Resource group used when none is given to a compile call.
    pub group: String,
}

/// Caller hooks around a compile.
pub trait ScriptListener {
    /// Offered every import path before the resource provider. Returning
    /// nodes short-circuits loading.
    fn import_file(&mut self, _name: &str) -> Option<Vec<ScriptNode>> {
        None
    }

    /// Final compile step over the resolved tree. Returns success.
    fn compile_impl(&mut self, _nodes: &[ScriptNode], _errors: &mut ErrorList) -> bool {
        true
    }
}

/// Listener that accepts every tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoListener;

impl ScriptListener for NoListener {}

pub struct ScriptCompiler<L: ScriptListener = NoListener> {
    provider: Box<dyn ResourceProvider>,
    listener: L,
    options: ScriptCompilerOptions,
    group: String,
    errors: ErrorList,
    output: Vec<ScriptNode>,
}

impl ScriptCompiler<NoListener> {
    pub fn new(provider: impl ResourceProvider + 'static) -> Self {
        ScriptCompiler {
            provider: Box::new(provider),
            listener: NoListener,
            options: ScriptCompilerOptions::default(),
            group: String::new(),
            errors: Vec::new(),
            output: Vec::new(),
        }
    }
}

impl<L: ScriptListener> ScriptCompiler<L> {
    pub fn with_listener<M: ScriptListener>(self, listener: M) -> ScriptCompiler<M> {
        ScriptCompiler {
            provider: self.provider,
            listener,
            options: self.options,
            group: self.group,
            errors: self.errors,
            output: self.output,
        }
    }

    pub fn with_options(mut self, options: ScriptCompilerOptions) -> Self {
        self.group = options.group.clone();
        self.options = options;
        self
    }

    pub fn options(&self) -> &ScriptCompilerOptions {
        &self.options
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Resource group of the current or last compile.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Diagnostics of the last compile, in the order they were found.
    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }

    /// Tree produced by the last compile, after every pass.
    pub fn output(&self) -> &[ScriptNode] {
        &self.output
    }

    /// Parses text without resolving anything. Diagnostics are appended to
    /// [`ScriptCompiler::errors`].
    pub fn parse(&mut self, text: &str, source: &str) -> Vec<ScriptNode> {
        parser::parse(text, source, &mut self.errors)
    }

    pub fn compile(&mut self, text: &str, source: &str, group: Option<&str>) -> bool {
        self.errors.clear();
        let nodes = self.parse(text, source);
        self.run(nodes, Some(source), group)
    }

    /// Compiles an already parsed tree. The first node's file is treated as
    /// the root script's name.
    pub fn compile_nodes(&mut self, nodes: Vec<ScriptNode>, group: Option<&str>) -> bool {
        self.errors.clear();
        let root = nodes.first().map(|n| n.file.clone());
        self.run(nodes, root.as_deref(), group)
    }

    /// Opens `name` through the resource provider and compiles it. Only a
    /// failure to open the root script is an `Err`.
    pub fn compile_file(
        &mut self,
        name: &str,
        group: Option<&str>,
    ) -> Result<bool, std::io::Error> {
        let group_name = group.unwrap_or(self.options.group.as_str()).to_owned();
        let text = self.provider.open_resource(name, &group_name)?;
        Ok(self.compile(&text, name, Some(&group_name)))
    }

    fn run(&mut self, mut nodes: Vec<ScriptNode>, root: Option<&str>, group: Option<&str>) -> bool {
        self.group = group.unwrap_or(self.options.group.as_str()).to_owned();
        let allow = self.options.allow_nontyped_objects;

        let mut imports = ImportResolver::new(root, allow);
        {
            let mut loader = Loader {
                provider: self.provider.as_ref(),
                listener: &mut self.listener,
                group: &self.group,
            };
            imports.process(&mut nodes, &mut loader, &mut self.errors);
        }

        let objects = ObjectResolver::new(imports.table(), allow);
        objects.process(&mut nodes, None, &mut self.errors);
        VariableResolver::new(&objects).process(
            &mut nodes,
            None,
            ParseMode::Statements,
            &mut self.errors,
        );

        let compiled = self.listener.compile_impl(&nodes, &mut self.errors);
        self.output = nodes;
        compiled && self.errors.is_empty()
    }
}

/// Listener first, then the resource provider.
struct Loader<'c, L: ScriptListener> {
    provider: &'c dyn ResourceProvider,
    listener: &'c mut L,
    group: &'c str,
}

impl<L: ScriptListener> ImportLoader for Loader<'_, L> {
    fn load(&mut self, path: &str, errors: &mut ErrorList) -> Option<Vec<ScriptNode>> {
        if let Some(nodes) = self.listener.import_file(path) {
            return Some(nodes);
        }
        let text = self.provider.open_resource(path, self.group).ok()?;
        Some(parser::parse(&text, path, errors))
    }
}
