//! Grammar table: rule operations, symbol library and lexeme registry.
//!
//! A grammar is a flat array of [`TokenRule`] entries. Each non-terminal owns
//! a rule path: a `Rule` entry naming the non-terminal, followed by the
//! entries that define it, terminated by `End` or `EndExecute`.
//!
//! ```text
//! <colour> ::= 'colour' <#red> <#green> <#blue> ;
//!
//! rule(COLOUR_STMT)
//! and(COLOUR, "colour")
//! and(VALUE_TOKEN, "<#red>")
//! and(VALUE_TOKEN, "<#green>")
//! and(VALUE_TOKEN, "<#blue>")
//! end()
//! ```

use crate::error::GrammarError;
use std::collections::{BTreeMap, HashSet};

pub type TokenId = usize;

/// Token id of an instance whose token could not be identified.
pub const UNKNOWN_TOKEN: TokenId = 0;
/// Terminal whose text is matched but which produces no token instance
/// (the `-'text'` form).
pub const NO_TOKEN: TokenId = 1;
/// Character-set terminal. Matched characters accumulate into a label.
pub const CHARACTER_TOKEN: TokenId = 2;
/// Numeric literal terminal. The parsed value is recorded for pass 2.
pub const VALUE_TOKEN: TokenId = 3;
/// First id available to grammar authors.
pub const FIRST_USER_TOKEN: TokenId = 4;

/// Every context bit set: the symbol is valid in any context.
pub const ALL_CONTEXTS: u32 = u32::MAX;

/// BNF operation of a rule entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `::=` starts the rule path of the named non-terminal.
    Rule,
    /// Required item.
    And,
    /// Alternative, tried only when everything before it failed.
    Or,
    /// `[item]`: failure does not fail the rule.
    Optional,
    /// `{item}`: zero or more matches, stops when the cursor stops advancing.
    Repeat,
    /// `;`
    End,
    /// `;` and run pass 2 over the tokens produced so far.
    EndExecute,
}

impl Operation {
    pub fn is_end(self) -> bool {
        matches!(self, Operation::End | Operation::EndExecute)
    }
}

/// One entry of the flat rule table.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRule {
    pub operation: Operation,
    /// Token matched by this entry, or the non-terminal a `Rule` entry
    /// defines. Zero for `End` markers.
    pub token: TokenId,
    /// Literal text for terminals, the character set for
    /// `CHARACTER_TOKEN` entries, a descriptive name for `VALUE_TOKEN`.
    pub symbol: Option<String>,
    /// Reported when this entry is the furthest point pass 1 failed at.
    pub error_id: u32,
}

impl TokenRule {
    pub fn new(operation: Operation, token: TokenId, symbol: Option<&str>) -> Self {
        TokenRule {
            operation,
            token,
            symbol: symbol.map(str::to_owned),
            error_id: 0,
        }
    }

    pub fn with_error(mut self, error_id: u32) -> Self {
        self.error_id = error_id;
        self
    }

    /// True when the entry refers to a non-terminal rather than matching
    /// text directly.
    pub fn is_non_terminal(&self) -> bool {
        self.symbol.is_none()
            && !matches!(self.token, NO_TOKEN | CHARACTER_TOKEN | VALUE_TOKEN)
            && !self.operation.is_end()
            && self.operation != Operation::Rule
    }
}

// ── Table construction helpers ───────────────────────────────────────

pub fn rule(token: TokenId) -> TokenRule {
    TokenRule::new(Operation::Rule, token, None)
}

pub fn and(token: TokenId, symbol: &str) -> TokenRule {
    TokenRule::new(Operation::And, token, Some(symbol))
}

pub fn and_nt(token: TokenId) -> TokenRule {
    TokenRule::new(Operation::And, token, None)
}

pub fn or(token: TokenId, symbol: &str) -> TokenRule {
    TokenRule::new(Operation::Or, token, Some(symbol))
}

pub fn or_nt(token: TokenId) -> TokenRule {
    TokenRule::new(Operation::Or, token, None)
}

pub fn optional(token: TokenId, symbol: &str) -> TokenRule {
    TokenRule::new(Operation::Optional, token, Some(symbol))
}

pub fn optional_nt(token: TokenId) -> TokenRule {
    TokenRule::new(Operation::Optional, token, None)
}

pub fn repeat(token: TokenId, symbol: &str) -> TokenRule {
    TokenRule::new(Operation::Repeat, token, Some(symbol))
}

pub fn repeat_nt(token: TokenId) -> TokenRule {
    TokenRule::new(Operation::Repeat, token, None)
}

pub fn end() -> TokenRule {
    TokenRule::new(Operation::End, 0, None)
}

pub fn execute() -> TokenRule {
    TokenRule::new(Operation::EndExecute, 0, None)
}

// ── Symbol library ───────────────────────────────────────────────────

/// Per-token metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDef {
    pub id: TokenId,
    /// Opaque payload for pass-2 actions.
    pub pass2_data: u32,
    /// The token is valid only while `context_key & active_contexts != 0`.
    pub context_key: u32,
    /// Bits set in the active context after the token matches.
    pub context_set: u32,
    /// Bits cleared in the active context after the token matches.
    pub context_clear: u32,
    /// Display text, filled from the first terminal entry that names it.
    pub text: String,
    /// Index of the `Rule` entry for non-terminals; `None` for terminals.
    pub rule_path: Option<usize>,
    pub has_action: bool,
}

impl SymbolDef {
    pub fn new(id: TokenId) -> Self {
        SymbolDef {
            id,
            pass2_data: 0,
            context_key: ALL_CONTEXTS,
            context_set: 0,
            context_clear: 0,
            text: String::new(),
            rule_path: None,
            has_action: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rule_path.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexemeDef {
    pub id: TokenId,
    pub has_action: bool,
}

/// Literal text fragment to token id associations.
#[derive(Debug, Clone, Default)]
pub struct LexemeRegistry {
    map: BTreeMap<String, LexemeDef>,
}

impl LexemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lexeme_token(&mut self, lexeme: &str, id: TokenId, has_action: bool) {
        self.map.insert(lexeme.to_owned(), LexemeDef { id, has_action });
    }

    pub fn get(&self, lexeme: &str) -> Option<LexemeDef> {
        self.map.get(lexeme).copied()
    }

    /// True when some registered lexeme is a prefix of `text`.
    pub fn matches_prefix(&self, text: &str) -> bool {
        self.map.keys().any(|k| !k.is_empty() && text.starts_with(k.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, LexemeDef)> {
        self.map.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// ── Grammar ──────────────────────────────────────────────────────────

/// A validated grammar: rule table, symbol library and lexeme registry.
/// Immutable once built; one grammar may drive any number of compiles.
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<TokenRule>,
    symbols: Vec<SymbolDef>,
    lexemes: LexemeRegistry,
    line_comments: Vec<String>,
}

impl Grammar {
    pub fn rules(&self) -> &[TokenRule] {
        &self.rules
    }

    pub fn rule_entry(&self, index: usize) -> &TokenRule {
        &self.rules[index]
    }

    /// Index of the root rule path (always the first entry).
    pub fn root(&self) -> usize {
        0
    }

    pub fn symbol(&self, id: TokenId) -> &SymbolDef {
        &self.symbols[id]
    }

    pub fn symbols(&self) -> &[SymbolDef] {
        &self.symbols
    }

    pub fn lexemes(&self) -> &LexemeRegistry {
        &self.lexemes
    }

    pub fn line_comments(&self) -> &[String] {
        &self.line_comments
    }

    /// Display text for a token id, used in diagnostics and traces.
    pub fn type_def_text(&self, id: TokenId) -> &str {
        self.symbols.get(id).map(|s| s.text.as_str()).unwrap_or("")
    }
}

/// Collects a rule table, symbol metadata and lexemes, then performs the
/// symbol-library initialization and validation in [`GrammarBuilder::build`].
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    rules: Vec<TokenRule>,
    symbols: BTreeMap<TokenId, SymbolDef>,
    lexemes: LexemeRegistry,
    line_comments: Vec<String>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        GrammarBuilder {
            rules: Vec::new(),
            symbols: BTreeMap::new(),
            lexemes: LexemeRegistry::new(),
            line_comments: vec!["//".to_owned()],
        }
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = TokenRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn push_rule(&mut self, entry: TokenRule) {
        self.rules.push(entry);
    }

    /// Overrides the metadata for one token.
    pub fn symbol(mut self, def: SymbolDef) -> Self {
        self.symbols.insert(def.id, def);
        self
    }

    /// Mutable access to a token's metadata, creating defaults if needed.
    pub fn symbol_mut(&mut self, id: TokenId) -> &mut SymbolDef {
        self.symbols.entry(id).or_insert_with(|| SymbolDef::new(id))
    }

    /// Restricts a token to a context and sets its context side effects.
    pub fn context(mut self, id: TokenId, key: u32, set: u32, clear: u32) -> Self {
        let def = self.symbol_mut(id);
        def.context_key = key;
        def.context_set = set;
        def.context_clear = clear;
        self
    }

    pub fn add_lexeme_token(&mut self, lexeme: &str, id: TokenId, has_action: bool) {
        self.lexemes.add_lexeme_token(lexeme, id, has_action);
    }

    pub fn lexeme(mut self, lexeme: &str, id: TokenId, has_action: bool) -> Self {
        self.add_lexeme_token(lexeme, id, has_action);
        self
    }

    pub fn lexemes(&self) -> &LexemeRegistry {
        &self.lexemes
    }

    /// Replaces the line comment markers (default `//`).
    pub fn line_comments(mut self, markers: &[&str]) -> Self {
        self.line_comments = markers.iter().map(|m| (*m).to_owned()).collect();
        self
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        let GrammarBuilder {
            rules,
            mut symbols,
            lexemes,
            line_comments,
        } = self;

        if rules.is_empty() {
            return Err(GrammarError::EmptyTable);
        }
        if rules[0].operation != Operation::Rule {
            return Err(GrammarError::EntryOutsideRule { index: 0 });
        }

        // Every token mentioned anywhere gets a symbol definition.
        let max_id = rules
            .iter()
            .map(|r| r.token)
            .chain(symbols.keys().copied())
            .chain(lexemes.iter().map(|(_, d)| d.id))
            .max()
            .unwrap_or(0)
            .max(VALUE_TOKEN);
        let mut library: Vec<SymbolDef> = (0..=max_id)
            .map(|id| symbols.remove(&id).unwrap_or_else(|| SymbolDef::new(id)))
            .collect();
        for (lexeme, def) in lexemes.iter() {
            let sym = &mut library[def.id];
            sym.has_action |= def.has_action;
            if sym.text.is_empty() {
                sym.text = lexeme.to_owned();
            }
        }
        library[UNKNOWN_TOKEN].text = "<unknown>".to_owned();
        library[VALUE_TOKEN].text = "<#value>".to_owned();
        library[CHARACTER_TOKEN].text = "<label>".to_owned();

        // Rule paths: record where each non-terminal starts and check that
        // every path is non-empty and terminated.
        let mut defined: HashSet<TokenId> = HashSet::new();
        let mut idx = 0;
        while idx < rules.len() {
            let entry = &rules[idx];
            if entry.operation != Operation::Rule {
                return Err(GrammarError::EntryOutsideRule { index: idx });
            }
            let token = entry.token;
            if !defined.insert(token) {
                return Err(GrammarError::DuplicateRule { token });
            }
            library[token].rule_path = Some(idx);

            let mut cursor = idx + 1;
            let mut terminated = false;
            while cursor < rules.len() {
                match rules[cursor].operation {
                    Operation::Rule => break,
                    op if op.is_end() => {
                        terminated = true;
                        break;
                    }
                    _ => cursor += 1,
                }
            }
            if !terminated {
                return Err(GrammarError::UnterminatedRulePath { token });
            }
            if cursor == idx + 1 {
                return Err(GrammarError::EmptyRulePath { token });
            }
            // An OR with no alternative before it would pass without input.
            if rules[idx + 1].operation == Operation::Or {
                return Err(GrammarError::LeadingAlternative { token });
            }
            idx = cursor + 1;
        }

        let mut current_rule = 0;
        for entry in &rules {
            if entry.operation == Operation::Rule {
                current_rule = entry.token;
                continue;
            }
            if entry.is_non_terminal() {
                if library[entry.token].rule_path.is_none() {
                    return Err(GrammarError::UndefinedRule {
                        rule: current_rule,
                        token: entry.token,
                    });
                }
            } else if let Some(symbol) = &entry.symbol {
                let sym = &mut library[entry.token];
                if sym.text.is_empty() && entry.token != NO_TOKEN {
                    sym.text = symbol.clone();
                }
            }
        }
        for sym in library.iter_mut() {
            if sym.text.is_empty() && sym.rule_path.is_some() {
                sym.text = format!("<{}>", sym.id);
            }
        }

        Ok(Grammar {
            rules,
            symbols: library,
            lexemes,
            line_comments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: TokenId = 10;
    const ITEM: TokenId = 11;
    const A: TokenId = 12;

    #[test]
    fn build_records_rule_paths_and_default_text() {
        let g = GrammarBuilder::new()
            .rules([
                rule(ROOT),
                repeat_nt(ITEM),
                end(),
                rule(ITEM),
                and(A, "a"),
                end(),
            ])
            .build()
            .unwrap();
        assert_eq!(g.symbol(ROOT).rule_path, Some(0));
        assert_eq!(g.symbol(ITEM).rule_path, Some(3));
        assert!(g.symbol(A).is_terminal());
        assert_eq!(g.type_def_text(A), "a");
    }

    #[test]
    fn undefined_non_terminal_is_rejected() {
        let err = GrammarBuilder::new()
            .rules([rule(ROOT), and_nt(ITEM), end()])
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::UndefinedRule { rule: ROOT, token: ITEM });
    }

    #[test]
    fn empty_rule_path_is_rejected() {
        let err = GrammarBuilder::new()
            .rules([rule(ROOT), end()])
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::EmptyRulePath { token: ROOT });
    }

    #[test]
    fn unterminated_rule_path_is_rejected() {
        let err = GrammarBuilder::new()
            .rules([rule(ROOT), and(A, "a"), rule(ITEM), and(A, "a"), end()])
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::UnterminatedRulePath { token: ROOT });
    }

    #[test]
    fn duplicate_rule_is_rejected() {
        let err = GrammarBuilder::new()
            .rules([rule(ROOT), and(A, "a"), end(), rule(ROOT), and(A, "a"), end()])
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::DuplicateRule { token: ROOT });
    }

    #[test]
    fn rule_path_cannot_start_with_or() {
        let err = GrammarBuilder::new()
            .rules([rule(ROOT), or(A, "a"), and(A, "b"), end()])
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::LeadingAlternative { token: ROOT });

        assert!(GrammarBuilder::new()
            .rules([rule(ROOT), optional(A, "a"), or(A, "b"), end()])
            .build()
            .is_ok());
    }

    #[test]
    fn table_must_start_with_rule() {
        let err = GrammarBuilder::new().rules([and(A, "a"), end()]).build().unwrap_err();
        assert_eq!(err, GrammarError::EntryOutsideRule { index: 0 });
    }

    #[test]
    fn lexeme_registration_sets_action_flag() {
        let g = GrammarBuilder::new()
            .rules([rule(ROOT), and(A, "a"), end()])
            .lexeme("a", A, true)
            .build()
            .unwrap();
        assert!(g.symbol(A).has_action);
        assert!(g.lexemes().matches_prefix("abc"));
        assert!(!g.lexemes().matches_prefix("xyz"));
    }
}
