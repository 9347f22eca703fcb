//! Script AST: a tree of typed nodes. A parse result is a flat list of
//! top-level siblings rather than a single root.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Word,
    Quote,
    Variable,
    VariableAssign,
    Import,
    LBrace,
    RBrace,
    Colon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptNode {
    pub kind: NodeType,
    /// Set on a statement head that owns a `{ ... }` body.
    pub is_object: bool,
    /// Literal text: the word, the unquoted string, or the variable name
    /// without `$`.
    pub token: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ScriptNode>,
}

impl ScriptNode {
    pub fn new(
        kind: NodeType,
        token: impl Into<String>,
        file: &str,
        line: u32,
        column: u32,
    ) -> Self {
        ScriptNode {
            kind,
            is_object: false,
            token: token.into(),
            file: file.to_owned(),
            line,
            column,
            children: Vec::new(),
        }
    }

    pub fn is_word(&self, text: &str) -> bool {
        self.kind == NodeType::Word && self.token == text
    }

    /// The `{` child of an object node.
    pub fn body(&self) -> Option<&ScriptNode> {
        self.children.iter().find(|c| c.kind == NodeType::LBrace)
    }

    /// Moves this node and every descendant to a new source position.
    pub fn relocate(&mut self, file: &str, line: u32, column: u32) {
        self.file = file.to_owned();
        self.line = line;
        self.column = column;
        for child in &mut self.children {
            child.relocate(file, line, column);
        }
    }

    fn token_text(&self) -> String {
        match self.kind {
            NodeType::Quote => {
                let escaped = self.token.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{}\"", escaped)
            }
            NodeType::Variable => format!("${}", self.token),
            NodeType::LBrace => "{".to_owned(),
            NodeType::RBrace => "}".to_owned(),
            NodeType::Colon => ":".to_owned(),
            _ => self.token.clone(),
        }
    }

    /// Pushes this node's text and then its children's, depth first.
    fn collect_tokens(&self, out: &mut Vec<String>) {
        match self.kind {
            // `$x := "v"` prints in source order.
            NodeType::VariableAssign if self.token == ":=" => {
                let mut children = self.children.iter();
                if let Some(name) = children.next() {
                    name.collect_tokens(out);
                }
                out.push(":=".to_owned());
                for child in children {
                    child.collect_tokens(out);
                }
            }
            _ => {
                out.push(self.token_text());
                for child in &self.children {
                    child.collect_tokens(out);
                }
            }
        }
    }

    fn write_pretty(&self, depth: usize, out: &mut String) {
        let indent = "    ".repeat(depth);
        match self.kind {
            NodeType::LBrace => {
                out.push_str(&format!("{}{{\n", indent));
                for child in &self.children {
                    child.write_pretty(depth + 1, out);
                }
            }
            NodeType::RBrace => out.push_str(&format!("{}}}\n", indent)),
            _ => {
                let mut head = Vec::new();
                head.push(self.token_text());
                for child in self.children.iter().filter(|c| !is_block_part(c)) {
                    child.collect_tokens(&mut head);
                }
                out.push_str(&format!("{}{}\n", indent, head.join(" ")));
                for child in self.children.iter().filter(|c| is_block_part(c)) {
                    child.write_pretty(depth, out);
                }
            }
        }
    }
}

fn is_block_part(node: &ScriptNode) -> bool {
    matches!(node.kind, NodeType::LBrace | NodeType::RBrace)
}

impl fmt::Display for ScriptNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens = Vec::new();
        self.collect_tokens(&mut tokens);
        f.write_str(&tokens.join(" "))
    }
}

/// Every token of `nodes` in depth-first order.
pub fn flatten(nodes: &[ScriptNode]) -> Vec<String> {
    let mut out = Vec::new();
    for node in nodes {
        node.collect_tokens(&mut out);
    }
    out
}

/// Single-line rendering: tokens separated by one space.
pub fn render(nodes: &[ScriptNode]) -> String {
    flatten(nodes).join(" ")
}

/// Indented rendering, one statement per line.
pub fn pretty(nodes: &[ScriptNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.write_pretty(0, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(t: &str) -> ScriptNode {
        ScriptNode::new(NodeType::Word, t, "t", 1, 1)
    }

    fn object() -> ScriptNode {
        let mut body = ScriptNode::new(NodeType::LBrace, "{", "t", 1, 10);
        let mut stmt = word("colour");
        stmt.children.push(ScriptNode::new(NodeType::Quote, "say \"hi\"", "t", 2, 8));
        body.children.push(stmt);
        let mut head = word("material");
        head.is_object = true;
        head.children.push(word("red"));
        head.children.push(body);
        head.children.push(ScriptNode::new(NodeType::RBrace, "}", "t", 3, 1));
        head
    }

    #[test]
    fn display_walks_depth_first() {
        assert_eq!(
            object().to_string(),
            r#"material red { colour "say \"hi\"" }"#
        );
    }

    #[test]
    fn pretty_indents_bodies() {
        assert_eq!(
            pretty(&[object()]),
            "material red\n{\n    colour \"say \\\"hi\\\"\"\n}\n"
        );
    }

    #[test]
    fn relocate_reaches_descendants() {
        let mut node = object();
        node.relocate("other", 9, 4);
        assert_eq!(node.children[1].children[0].children[0].file, "other");
        assert_eq!(node.children[2].line, 9);
    }

    #[test]
    fn body_finds_brace_child() {
        assert_eq!(object().body().map(|b| b.children.len()), Some(1));
        assert!(word("x").body().is_none());
    }
}
