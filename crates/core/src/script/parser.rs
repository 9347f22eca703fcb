//! Builds the script AST from lexer tokens.
//!
//! A statement is one line. Its leading word is the head and the rest of the
//! line becomes the head's children. A `{` on the same line or the next one
//! turns the head into an object: the `{` node (holding the body) and the
//! matching `}` node are appended to its children.

use super::ast::{NodeType, ScriptNode};
use super::lexer::{self, Spanned, Token};
use crate::error::{Diagnostic, ErrorKind, ErrorList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Lines become statements with heads and bodies.
    Statements,
    /// Every token becomes a sibling; braces still nest.
    Arguments,
}

/// Parses script text in statement mode.
pub fn parse(src: &str, filename: &str, errors: &mut ErrorList) -> Vec<ScriptNode> {
    parse_with_mode(src, filename, ParseMode::Statements, errors)
}

pub fn parse_with_mode(
    src: &str,
    filename: &str,
    mode: ParseMode,
    errors: &mut ErrorList,
) -> Vec<ScriptNode> {
    let tokens = lexer::lex(src, filename, errors);
    let mut parser = Parser {
        tokens,
        pos: 0,
        filename,
        mode,
        errors,
    };
    parser.block(0)
}

struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    filename: &'a str,
    mode: ParseMode,
    errors: &'a mut ErrorList,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Spanned {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Spanned {
            token: Token::Eof,
            line: 0,
            column: 0,
        });
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn node(&self, kind: NodeType, token: impl Into<String>, at: &Spanned) -> ScriptNode {
        ScriptNode::new(kind, token, self.filename, at.line, at.column)
    }

    fn error(&mut self, kind: ErrorKind, at: &Spanned, msg: impl Into<String>) {
        self.errors.push(Diagnostic::new(
            kind,
            self.filename,
            at.line,
            Some(at.column),
            msg,
        ));
    }

    fn at_line_end(&self) -> bool {
        matches!(
            self.peek(),
            Token::Newline | Token::Eof | Token::LBrace | Token::RBrace
        )
    }

    fn skip_to_line_end(&mut self) {
        while !matches!(self.peek(), Token::Newline | Token::Eof) {
            self.pos += 1;
        }
    }

    /// Parses nodes until end of input, or until the `}` closing the block
    /// at `depth` (left unconsumed).
    fn block(&mut self, depth: usize) -> Vec<ScriptNode> {
        let mut nodes = Vec::new();
        loop {
            match self.peek() {
                Token::Eof => break,
                Token::Newline => self.pos += 1,
                Token::RBrace if depth > 0 => break,
                Token::RBrace => {
                    let at = self.advance();
                    self.error(ErrorKind::Syntax, &at, "unexpected '}'");
                }
                Token::LBrace => {
                    let at = self.advance();
                    let (open, close) = self.braces(&at, depth);
                    nodes.push(open);
                    nodes.extend(close);
                }
                _ if self.mode == ParseMode::Arguments => {
                    if let Some(node) = self.atom() {
                        nodes.push(node);
                    }
                }
                _ => {
                    if let Some(node) = self.statement(depth) {
                        nodes.push(node);
                    }
                }
            }
        }
        nodes
    }

    /// Parses a body after its `{` has been consumed. Returns the `{` node
    /// and the `}` node, which is missing when input ends first.
    fn braces(&mut self, open_at: &Spanned, depth: usize) -> (ScriptNode, Option<ScriptNode>) {
        let mut open = self.node(NodeType::LBrace, "{", open_at);
        open.children = self.block(depth + 1);
        if matches!(self.peek(), Token::RBrace) {
            let at = self.advance();
            let close = self.node(NodeType::RBrace, "}", &at);
            (open, Some(close))
        } else {
            self.error(ErrorKind::Syntax, open_at, "missing '}' for this '{'");
            (open, None)
        }
    }

    fn statement(&mut self, depth: usize) -> Option<ScriptNode> {
        match (self.peek().clone(), self.peek_at(1).clone()) {
            (Token::Word(w), _) if w == "import" && depth == 0 => Some(self.import()),
            (Token::Word(w), Token::Variable(_)) if w == "set" => Some(self.assignment()),
            (Token::Word(_), Token::Assign) | (Token::Variable(_), Token::Assign) => {
                Some(self.assignment())
            }
            (Token::Word(_), _) => Some(self.object_or_property(depth)),
            _ => self.atom(),
        }
    }

    fn object_or_property(&mut self, depth: usize) -> ScriptNode {
        let at = self.advance();
        let mut head = match &at.token {
            Token::Word(w) => self.node(NodeType::Word, w.clone(), &at),
            _ => self.node(NodeType::Word, "", &at),
        };
        while !self.at_line_end() {
            if let Some(arg) = self.atom() {
                head.children.push(arg);
            }
        }
        let brace_follows = match (self.peek(), self.peek_at(1)) {
            (Token::LBrace, _) => true,
            (Token::Newline, Token::LBrace) => {
                self.pos += 1;
                true
            }
            _ => false,
        };
        if brace_follows {
            let open_at = self.advance();
            let (open, close) = self.braces(&open_at, depth);
            head.is_object = true;
            head.children.push(open);
            head.children.extend(close);
        }
        head
    }

    /// `import <target> from <path>`. Missing parts are left out of the
    /// node's children for the import pass to report.
    fn import(&mut self) -> ScriptNode {
        let at = self.advance();
        let mut node = self.node(NodeType::Import, "import", &at);
        if let Some(target) = self.import_part() {
            node.children.push(target);
            if matches!(self.peek(), Token::Word(w) if w == "from") {
                self.pos += 1;
                if let Some(path) = self.import_part() {
                    node.children.push(path);
                }
            }
        }
        if !matches!(self.peek(), Token::Newline | Token::Eof) {
            let extra = self.advance();
            self.error(ErrorKind::Syntax, &extra, "unexpected text after import");
            self.skip_to_line_end();
        }
        node
    }

    fn import_part(&mut self) -> Option<ScriptNode> {
        match self.peek().clone() {
            Token::Word(w) if w != "from" => {
                let at = self.advance();
                Some(self.node(NodeType::Word, w, &at))
            }
            Token::Quote(q) => {
                let at = self.advance();
                Some(self.node(NodeType::Quote, q, &at))
            }
            _ => None,
        }
    }

    /// `$x := value`, `x := value` or `set $x value`.
    fn assignment(&mut self) -> ScriptNode {
        let first = self.advance();
        let (mut node, name_at) = match &first.token {
            Token::Word(w) if w == "set" => {
                let name_at = self.advance();
                (self.node(NodeType::VariableAssign, "set", &first), name_at)
            }
            _ => {
                self.pos += 1; // ':='
                (self.node(NodeType::VariableAssign, ":=", &first), first.clone())
            }
        };
        let name = match &name_at.token {
            Token::Variable(n) | Token::Word(n) => n.clone(),
            _ => String::new(),
        };
        node.children
            .push(self.node(NodeType::Variable, name, &name_at));
        if !self.at_line_end() {
            if let Some(value) = self.atom() {
                node.children.push(value);
            }
        }
        if !self.at_line_end() {
            let extra = self.advance();
            self.error(ErrorKind::Syntax, &extra, "unexpected text after variable value");
            self.skip_to_line_end();
        }
        node
    }

    /// A single argument-level node. A `:` takes the following word or
    /// string as its child.
    fn atom(&mut self) -> Option<ScriptNode> {
        let at = self.advance();
        match &at.token {
            Token::Word(w) => Some(self.node(NodeType::Word, w.clone(), &at)),
            Token::Quote(q) => Some(self.node(NodeType::Quote, q.clone(), &at)),
            Token::Variable(v) => Some(self.node(NodeType::Variable, v.clone(), &at)),
            Token::Colon => {
                let mut colon = self.node(NodeType::Colon, ":", &at);
                if matches!(self.peek(), Token::Word(_) | Token::Quote(_) | Token::Variable(_)) {
                    if let Some(target) = self.atom() {
                        colon.children.push(target);
                    }
                }
                Some(colon)
            }
            Token::Assign => {
                self.error(ErrorKind::Syntax, &at, "unexpected ':='");
                None
            }
            Token::Newline | Token::Eof | Token::LBrace | Token::RBrace => {
                // Callers stop before these; step back so they are seen.
                self.pos -= 1;
                None
            }
        }
    }
}
