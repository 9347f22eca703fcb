//! Builds a [`Grammar`] from the simplified BNF text notation.
//!
//! ```text
//! <script>     ::= {<statement>} ;
//! <statement>  ::= <colour> | <scale> ;
//! <colour>     ::= 'colour' <#red> <#green> <#blue> ;
//! <scale>      ::= 'scale' <#factor> [<axis>] ;
//! <axis>       ::= 'x' | 'y' | 'z' ;
//! <name>       ::= -'name' (abcdefghijklmnopqrstuvwxyz) {(abcdefghijklmnopqrstuvwxyz_0-9)} ;
//! ```
//!
//! - The first rule is the root.
//! - `|` separates alternatives. Every alternative after the first must start
//!   with a required item.
//! - `[x]` is optional and `{x}` repeats; each wraps exactly one item.
//! - `'text'` is a terminal, `-'text'` matches text without producing a
//!   token, `<#name>` is a numeric literal and `(set)` a character-set
//!   terminal (`a-z` ranges are expanded, `\)` escapes a parenthesis).
//! - `//` starts a comment running to the end of the line.

use super::grammar::{
    GrammarBuilder, Operation, TokenId, TokenRule, CHARACTER_TOKEN, FIRST_USER_TOKEN, NO_TOKEN,
    VALUE_TOKEN,
};
use super::Grammar;
use crate::error::GrammarError;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
enum BnfTok {
    NonTerminal(String),
    Value(String),
    Define,
    Bar,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Literal(String),
    Silent(String),
    CharSet(String),
    Semi,
}

#[derive(Debug, Clone, PartialEq)]
enum Atom {
    NonTerminal(String),
    Value(String),
    Literal(String),
    Silent(String),
    CharSet(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Quantity {
    Once,
    Optional,
    Repeat,
}

#[derive(Debug)]
struct Item {
    quantity: Quantity,
    atom: Atom,
    line: u32,
}

#[derive(Debug)]
struct RuleDef {
    name: String,
    line: u32,
    alternatives: Vec<Vec<Item>>,
}

fn bnf_err(line: u32, message: impl Into<String>) -> GrammarError {
    GrammarError::Bnf {
        line,
        message: message.into(),
    }
}

// ── Lexing ───────────────────────────────────────────────────────────

fn lex(text: &str) -> Result<Vec<(BnfTok, u32)>, GrammarError> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    let mut line = 1u32;

    let read_until = |start: usize,
                      close: char,
                      line: u32|
     -> Result<(String, usize), GrammarError> {
        let mut s = String::new();
        let mut j = start;
        while j < chars.len() {
            match chars[j] {
                '\\' if j + 1 < chars.len() => {
                    s.push(chars[j + 1]);
                    j += 2;
                }
                c if c == close => return Ok((s, j + 1)),
                '\n' => break,
                c => {
                    s.push(c);
                    j += 1;
                }
            }
        }
        Err(bnf_err(line, format!("missing closing '{}'", close)))
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '<' => {
                let (name, next) = read_until(i + 1, '>', line)?;
                if name.is_empty() || name == "#" {
                    return Err(bnf_err(line, "empty rule name"));
                }
                let tok = match name.strip_prefix('#') {
                    Some(value) => BnfTok::Value(value.to_owned()),
                    None => BnfTok::NonTerminal(name),
                };
                out.push((tok, line));
                i = next;
            }
            ':' => {
                if chars.get(i + 1) == Some(&':') && chars.get(i + 2) == Some(&'=') {
                    out.push((BnfTok::Define, line));
                    i += 3;
                } else {
                    return Err(bnf_err(line, "expected '::='"));
                }
            }
            '\'' => {
                let (text, next) = read_until(i + 1, '\'', line)?;
                if text.is_empty() {
                    return Err(bnf_err(line, "empty terminal"));
                }
                out.push((BnfTok::Literal(text), line));
                i = next;
            }
            '-' if chars.get(i + 1) == Some(&'\'') => {
                let (text, next) = read_until(i + 2, '\'', line)?;
                if text.is_empty() {
                    return Err(bnf_err(line, "empty terminal"));
                }
                out.push((BnfTok::Silent(text), line));
                i = next;
            }
            '(' => {
                let (set, next) = read_until(i + 1, ')', line)?;
                if set.is_empty() {
                    return Err(bnf_err(line, "empty character set"));
                }
                out.push((BnfTok::CharSet(expand_ranges(&set)), line));
                i = next;
            }
            '|' => {
                out.push((BnfTok::Bar, line));
                i += 1;
            }
            '[' => {
                out.push((BnfTok::LBracket, line));
                i += 1;
            }
            ']' => {
                out.push((BnfTok::RBracket, line));
                i += 1;
            }
            '{' => {
                out.push((BnfTok::LBrace, line));
                i += 1;
            }
            '}' => {
                out.push((BnfTok::RBrace, line));
                i += 1;
            }
            ';' => {
                out.push((BnfTok::Semi, line));
                i += 1;
            }
            other => return Err(bnf_err(line, format!("unexpected character '{}'", other))),
        }
    }
    Ok(out)
}

/// Expands `a-z` style ranges; a `-` at either end is literal.
fn expand_ranges(set: &str) -> String {
    let chars: Vec<char> = set.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i + 1] == '-' && chars[i] <= chars[i + 2] {
            for c in chars[i]..=chars[i + 2] {
                if !out.contains(c) {
                    out.push(c);
                }
            }
            i += 3;
        } else {
            if !out.contains(chars[i]) {
                out.push(chars[i]);
            }
            i += 1;
        }
    }
    out
}

// ── Parsing ──────────────────────────────────────────────────────────

struct RuleParser {
    tokens: Vec<(BnfTok, u32)>,
    pos: usize,
}

impl RuleParser {
    fn peek(&self) -> Option<&BnfTok> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, l)| *l)
            .unwrap_or(1)
    }

    fn next(&mut self) -> Option<BnfTok> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        tok
    }

    fn rules(&mut self) -> Result<Vec<RuleDef>, GrammarError> {
        let mut rules = Vec::new();
        while self.peek().is_some() {
            rules.push(self.rule()?);
        }
        if rules.is_empty() {
            return Err(GrammarError::EmptyTable);
        }
        Ok(rules)
    }

    fn rule(&mut self) -> Result<RuleDef, GrammarError> {
        let line = self.line();
        let name = match self.next() {
            Some(BnfTok::NonTerminal(name)) => name,
            _ => return Err(bnf_err(line, "expected '<rule>' to start a rule")),
        };
        if self.next() != Some(BnfTok::Define) {
            return Err(bnf_err(line, format!("expected '::=' after <{}>", name)));
        }
        let mut alternatives = vec![self.alternative(&name)?];
        loop {
            match self.next() {
                Some(BnfTok::Bar) => alternatives.push(self.alternative(&name)?),
                Some(BnfTok::Semi) => break,
                _ => {
                    return Err(bnf_err(
                        self.line(),
                        format!("rule <{}> is not terminated by ';'", name),
                    ))
                }
            }
        }
        for alt in alternatives.iter().skip(1) {
            if let Some(first) = alt.first() {
                if first.quantity != Quantity::Once {
                    return Err(bnf_err(
                        first.line,
                        format!("alternative in <{}> must start with a required item", name),
                    ));
                }
            }
        }
        Ok(RuleDef {
            name,
            line,
            alternatives,
        })
    }

    fn alternative(&mut self, rule: &str) -> Result<Vec<Item>, GrammarError> {
        let mut items = Vec::new();
        while !matches!(self.peek(), Some(BnfTok::Bar) | Some(BnfTok::Semi) | None) {
            items.push(self.item()?);
        }
        if items.is_empty() {
            return Err(bnf_err(self.line(), format!("empty alternative in <{}>", rule)));
        }
        Ok(items)
    }

    fn item(&mut self) -> Result<Item, GrammarError> {
        let line = self.line();
        let (quantity, close) = match self.peek() {
            Some(BnfTok::LBracket) => (Quantity::Optional, Some(BnfTok::RBracket)),
            Some(BnfTok::LBrace) => (Quantity::Repeat, Some(BnfTok::RBrace)),
            _ => (Quantity::Once, None),
        };
        if close.is_some() {
            self.pos += 1;
        }
        let atom = self.atom(line)?;
        if let Some(close) = close {
            if self.next() != Some(close) {
                return Err(bnf_err(line, "'[' and '{' wrap exactly one item"));
            }
        }
        Ok(Item {
            quantity,
            atom,
            line,
        })
    }

    fn atom(&mut self, line: u32) -> Result<Atom, GrammarError> {
        match self.next() {
            Some(BnfTok::NonTerminal(n)) => Ok(Atom::NonTerminal(n)),
            Some(BnfTok::Value(n)) => Ok(Atom::Value(n)),
            Some(BnfTok::Literal(t)) => Ok(Atom::Literal(t)),
            Some(BnfTok::Silent(t)) => Ok(Atom::Silent(t)),
            Some(BnfTok::CharSet(s)) => Ok(Atom::CharSet(s)),
            other => Err(bnf_err(line, format!("expected a grammar item, found {:?}", other))),
        }
    }
}

// ── Table generation ─────────────────────────────────────────────────

/// BNF front end for [`GrammarBuilder`]. Lexemes registered here give
/// terminals their token ids and action flags; every other terminal and
/// every non-terminal gets a fresh id.
#[derive(Debug, Clone, Default)]
pub struct BnfGrammar {
    lexemes: Vec<(String, TokenId, bool)>,
    execute_on: BTreeSet<String>,
    line_comments: Option<Vec<String>>,
}

/// A parsed BNF grammar not yet built, so callers can look up the ids
/// assigned to rules and terminals and attach context bits first.
#[derive(Debug, Clone)]
pub struct ParsedBnf {
    builder: GrammarBuilder,
    rule_ids: BTreeMap<String, TokenId>,
    terminal_ids: BTreeMap<String, TokenId>,
}

impl ParsedBnf {
    pub fn rule_id(&self, name: &str) -> Option<TokenId> {
        self.rule_ids.get(name).copied()
    }

    pub fn terminal_id(&self, text: &str) -> Option<TokenId> {
        self.terminal_ids.get(text).copied()
    }

    pub fn builder_mut(&mut self) -> &mut GrammarBuilder {
        &mut self.builder
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        self.builder.build()
    }
}

impl BnfGrammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lexeme(mut self, text: &str, id: TokenId, has_action: bool) -> Self {
        self.lexemes.push((text.to_owned(), id, has_action));
        self
    }

    /// Makes the named rule end with END_EXECUTE.
    pub fn execute_on(mut self, rule: &str) -> Self {
        self.execute_on.insert(rule.to_owned());
        self
    }

    pub fn line_comments(mut self, markers: &[&str]) -> Self {
        self.line_comments = Some(markers.iter().map(|m| (*m).to_owned()).collect());
        self
    }

    pub fn build(&self, text: &str) -> Result<Grammar, GrammarError> {
        self.parse(text)?.build()
    }

    pub fn parse(&self, text: &str) -> Result<ParsedBnf, GrammarError> {
        let mut parser = RuleParser {
            tokens: lex(text)?,
            pos: 0,
        };
        let defs = parser.rules()?;

        let mut next_id = self
            .lexemes
            .iter()
            .map(|(_, id, _)| id + 1)
            .max()
            .unwrap_or(FIRST_USER_TOKEN)
            .max(FIRST_USER_TOKEN);

        let mut rule_ids: BTreeMap<String, TokenId> = BTreeMap::new();
        for def in &defs {
            if rule_ids.contains_key(&def.name) {
                return Err(bnf_err(def.line, format!("rule <{}> is defined twice", def.name)));
            }
            rule_ids.insert(def.name.clone(), next_id);
            next_id += 1;
        }
        for name in &self.execute_on {
            if !rule_ids.contains_key(name) {
                return Err(bnf_err(1, format!("execute_on names unknown rule <{}>", name)));
            }
        }

        let mut builder = GrammarBuilder::new();
        if let Some(markers) = &self.line_comments {
            let markers: Vec<&str> = markers.iter().map(String::as_str).collect();
            builder = builder.line_comments(&markers);
        }
        let mut terminal_ids: BTreeMap<String, TokenId> = BTreeMap::new();
        for (text, id, has_action) in &self.lexemes {
            builder.add_lexeme_token(text, *id, *has_action);
            terminal_ids.insert(text.clone(), *id);
        }

        for def in &defs {
            let rule_id = rule_ids[&def.name];
            builder.symbol_mut(rule_id).text = format!("<{}>", def.name);
            builder.push_rule(TokenRule::new(Operation::Rule, rule_id, None));

            for (alt_index, alt) in def.alternatives.iter().enumerate() {
                for (item_index, item) in alt.iter().enumerate() {
                    let operation = match (alt_index, item_index, item.quantity) {
                        (a, 0, Quantity::Once) if a > 0 => Operation::Or,
                        (_, _, Quantity::Once) => Operation::And,
                        (_, _, Quantity::Optional) => Operation::Optional,
                        (_, _, Quantity::Repeat) => Operation::Repeat,
                    };
                    let (token, symbol) = match &item.atom {
                        Atom::NonTerminal(name) => match rule_ids.get(name) {
                            Some(id) => (*id, None),
                            None => {
                                return Err(bnf_err(
                                    item.line,
                                    format!("<{}> uses undefined rule <{}>", def.name, name),
                                ))
                            }
                        },
                        Atom::Value(name) => (VALUE_TOKEN, Some(format!("<#{}>", name))),
                        Atom::CharSet(set) => (CHARACTER_TOKEN, Some(set.clone())),
                        Atom::Silent(text) => (NO_TOKEN, Some(text.clone())),
                        Atom::Literal(text) => {
                            let id = *terminal_ids.entry(text.clone()).or_insert_with(|| {
                                next_id += 1;
                                next_id - 1
                            });
                            (id, Some(text.clone()))
                        }
                    };
                    let rule = TokenRule::new(operation, token, symbol.as_deref());
                    builder.push_rule(rule.with_error(rule_id as u32));
                }
            }

            let end = if self.execute_on.contains(&def.name) {
                Operation::EndExecute
            } else {
                Operation::End
            };
            builder.push_rule(TokenRule::new(end, 0, None));
        }

        Ok(ParsedBnf {
            builder,
            rule_ids,
            terminal_ids,
        })
    }
}
