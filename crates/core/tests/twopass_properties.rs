//! Property tests for the two-pass compiler: termination on grammars whose
//! repeated rules can match nothing, and token ordering on well-formed input.

use proptest::prelude::*;
use scriptc_core::twopass::grammar::{and, end, optional, optional_nt, repeat_nt, rule, VALUE_TOKEN};
use scriptc_core::{BnfGrammar, Compiler2Pass, ErrorKind, GrammarBuilder, NoActions};

const ROOT: usize = 10;
const STMT: usize = 11;
const INNER: usize = 12;
const A: usize = 13;
const B: usize = 14;
const SET: usize = 15;

/// `<root> ::= {<stmt>}`, `<stmt> ::= [<inner>] ['b']`, `<inner> ::= ['a']`:
/// every rule below the root can succeed without consuming input.
fn zero_width_compiler() -> Compiler2Pass {
    let grammar = GrammarBuilder::new()
        .rules([
            rule(ROOT),
            repeat_nt(STMT),
            end(),
            rule(STMT),
            optional_nt(INNER),
            optional(B, "b"),
            end(),
            rule(INNER),
            optional(A, "a"),
            end(),
        ])
        .build()
        .unwrap();
    Compiler2Pass::new(grammar)
}

fn set_compiler() -> Compiler2Pass {
    let grammar = GrammarBuilder::new()
        .rules([
            rule(ROOT),
            repeat_nt(STMT),
            end(),
            rule(STMT),
            and(SET, "set"),
            and(VALUE_TOKEN, "<#v>"),
            end(),
        ])
        .lexeme("set", SET, false)
        .build()
        .unwrap();
    Compiler2Pass::new(grammar)
}

fn separator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(" "), Just("\n"), Just("\t"), Just("  \n  "), Just(" // note\n")]
}

proptest! {
    #[test]
    fn zero_width_repeats_terminate(source in "[ab \n]{0,40}") {
        let out = zero_width_compiler().compile(&source, &mut NoActions);
        prop_assert!(out.success, "{:?} on {:?}", out.errors, source);
        let letters = source.chars().filter(|c| !c.is_whitespace()).count();
        prop_assert_eq!(out.queue.len(), letters);
    }

    #[test]
    fn unmatched_text_is_reported_and_skipped(source in "[abc \n]{0,40}") {
        let out = zero_width_compiler().compile(&source, &mut NoActions);
        prop_assert_eq!(out.success, !source.contains('c'));
        prop_assert!(out.errors.len() <= source.matches('c').count());
        prop_assert!(out.errors.iter().all(|e| e.kind == ErrorKind::UnknownToken));
    }

    #[test]
    fn token_offsets_strictly_increase(
        stmts in prop::collection::vec(((-1000i32..1000), (0u8..100), separator()), 0..20)
    ) {
        let mut source = String::new();
        for (whole, frac, sep) in &stmts {
            source.push_str(&format!("set {}.{:02}{}", whole, frac, sep));
        }
        let out = set_compiler().compile(&source, &mut NoActions);
        prop_assert!(out.success, "{:?} on {:?}", out.errors, source);
        prop_assert_eq!(out.queue.len(), stmts.len() * 2);
        prop_assert_eq!(out.queue.constants.len(), stmts.len());
        for pair in out.queue.tokens.windows(2) {
            prop_assert!(pair[0].offset < pair[1].offset);
            prop_assert!((pair[0].line, pair[0].column) < (pair[1].line, pair[1].column));
        }
    }
}

#[test]
fn bnf_zero_width_grammar_terminates() {
    let grammar = BnfGrammar::new()
        .build("<root> ::= {<stmt>} ;\n<stmt> ::= [<maybe>] ;\n<maybe> ::= {'x'} ;")
        .unwrap();
    let out = Compiler2Pass::new(grammar).compile("x x y x", &mut NoActions);
    assert!(!out.success);
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].column, Some(5));
    assert_eq!(out.queue.tokens.iter().filter(|t| t.found).count(), 3);
}
