//! Top-level object lookup shared by the import and inheritance passes.

use super::ast::{NodeType, ScriptNode};

/// First object node in `nodes` named `name`, in list order.
///
/// An object is named by its first child word (`material Base { }`). With
/// `allow_nontyped` set, an object whose own token is `name` (`Base { }`)
/// also matches.
pub fn locate<'n>(
    nodes: &'n [ScriptNode],
    name: &str,
    allow_nontyped: bool,
) -> Option<&'n ScriptNode> {
    nodes.iter().find(|node| {
        if !node.is_object {
            return false;
        }
        let typed = node
            .children
            .first()
            .is_some_and(|c| c.kind == NodeType::Word && c.token == name);
        typed || (allow_nontyped && node.token == name)
    })
}

pub fn contains_object(nodes: &[ScriptNode], name: &str, allow_nontyped: bool) -> bool {
    locate(nodes, name, allow_nontyped).is_some()
}

/// True for the words scripts use for an enabled flag.
pub fn is_truth_value(text: &str) -> bool {
    matches!(text, "1" | "true" | "yes" | "on")
}
