//! Object inheritance: `child : parent { ... }` copies the parent's body to
//! the front of the child's body.

use super::ast::{NodeType, ScriptNode};
use super::locate::locate;
use crate::error::{Diagnostic, ErrorKind, ErrorList};

/// Resolves `:` markers against the top-level nodes and then the import
/// table.
pub struct ObjectResolver<'t> {
    import_table: &'t [ScriptNode],
    allow_nontyped: bool,
}

impl<'t> ObjectResolver<'t> {
    pub fn new(import_table: &'t [ScriptNode], allow_nontyped: bool) -> Self {
        ObjectResolver {
            import_table,
            allow_nontyped,
        }
    }

    pub fn allow_nontyped(&self) -> bool {
        self.allow_nontyped
    }

    /// Processes `nodes` in place. `top` is the top-level list used for
    /// lookups; `None` means `nodes` is itself the top level.
    ///
    /// Children are resolved before the markers of their own level, and the
    /// copied parent body is resolved when the cursor reaches the `{` it was
    /// copied into. A node's children are detached while they are being
    /// processed, so lookups never see a half-resolved subtree of it.
    pub fn process(
        &self,
        nodes: &mut Vec<ScriptNode>,
        top: Option<&[ScriptNode]>,
        errors: &mut ErrorList,
    ) {
        let mut i = 0;
        while i < nodes.len() {
            if !nodes[i].children.is_empty() {
                let mut children = std::mem::take(&mut nodes[i].children);
                match top {
                    Some(t) => self.process(&mut children, Some(t), errors),
                    None => self.process(&mut children, Some(&nodes[..]), errors),
                }
                nodes[i].children = children;
            }

            if nodes[i].kind == NodeType::Colon {
                if self.resolve_colon(nodes, i, top, errors) {
                    // The `{` now sits at `i` and still has to be visited.
                    continue;
                }
            }
            i += 1;
        }
    }

    /// Validates the marker at `i`, removes it and splices the parent body.
    /// Returns false when the marker was malformed and left in place.
    fn resolve_colon(
        &self,
        nodes: &mut Vec<ScriptNode>,
        i: usize,
        top: Option<&[ScriptNode]>,
        errors: &mut ErrorList,
    ) -> bool {
        let colon = &nodes[i];
        let name = match colon.children.first() {
            Some(target) if target.kind == NodeType::Word => target.token.clone(),
            Some(target) => {
                errors.push(error_at(
                    ErrorKind::ObjectNameExpected,
                    target,
                    "expected the name of the inherited object",
                ));
                return false;
            }
            None => {
                errors.push(Diagnostic::new(
                    ErrorKind::ObjectNameExpected,
                    &colon.file,
                    colon.line,
                    None,
                    "expected the name of the inherited object after ':'",
                ));
                return false;
            }
        };
        match nodes.get(i + 1) {
            Some(brace) if brace.kind == NodeType::LBrace => {}
            Some(other) => {
                errors.push(error_at(
                    ErrorKind::OpenBraceExpected,
                    other,
                    "expected '{' after the inherited object name",
                ));
                return false;
            }
            None => {
                errors.push(Diagnostic::new(
                    ErrorKind::OpenBraceExpected,
                    &colon.file,
                    colon.line,
                    None,
                    "expected '{' after the inherited object name",
                ));
                return false;
            }
        }

        let inherited: Option<Vec<ScriptNode>> = {
            let scope: &[ScriptNode] = top.unwrap_or(&nodes[..]);
            locate(scope, &name, self.allow_nontyped)
                .or_else(|| locate(self.import_table, &name, self.allow_nontyped))
                .and_then(ScriptNode::body)
                .map(|body| body.children.clone())
        };

        nodes.remove(i);
        if let Some(content) = inherited {
            let brace = &mut nodes[i];
            brace.children.splice(0..0, content);
        }
        true
    }
}

fn error_at(kind: ErrorKind, node: &ScriptNode, msg: &str) -> Diagnostic {
    Diagnostic::new(kind, &node.file, node.line, Some(node.column), msg)
}
