use crate::error::{Diagnostic, ErrorKind, ErrorList};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Any run of characters that is not whitespace or punctuation
    Word(String),
    /// Quoted string (content without quotes, escapes resolved)
    Quote(String),
    /// `$name`, stored without the `$`
    Variable(String),
    LBrace,
    RBrace,
    Colon,
    /// `:=`
    Assign,
    /// One or more line breaks
    Newline,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
    pub column: u32,
}

fn is_word_char(chars: &[char], pos: usize) -> bool {
    let c = chars[pos];
    if c.is_whitespace() || matches!(c, '{' | '}' | '"' | ':' | '$') {
        return false;
    }
    // A comment ends the word.
    !(c == '/' && matches!(chars.get(pos + 1), Some('/') | Some('*')))
}

/// Splits script text into tokens. Problems are recorded as `Syntax`
/// diagnostics and lexing carries on, so one call reports every bad
/// string or comment in the file.
pub fn lex(src: &str, filename: &str, errors: &mut ErrorList) -> Vec<Spanned> {
    let mut tokens: Vec<Spanned> = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;
    let mut line: u32 = 1;
    let mut line_start = 0usize;

    let syntax = |line: u32, column: u32, msg: &str| {
        Diagnostic::new(ErrorKind::Syntax, filename, line, Some(column), msg)
    };

    while pos < chars.len() {
        let c = chars[pos];
        let tok_line = line;
        let tok_column = (pos - line_start + 1) as u32;

        // Line comment
        if c == '/' && chars.get(pos + 1) == Some(&'/') {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }

        // Block comment
        if c == '/' && chars.get(pos + 1) == Some(&'*') {
            pos += 2;
            loop {
                if pos >= chars.len() {
                    errors.push(syntax(tok_line, tok_column, "unterminated block comment"));
                    break;
                }
                if chars[pos] == '\n' {
                    line += 1;
                    line_start = pos + 1;
                }
                if chars[pos] == '*' && chars.get(pos + 1) == Some(&'/') {
                    pos += 2;
                    break;
                }
                pos += 1;
            }
            continue;
        }

        if c == '\n' {
            if !matches!(tokens.last(), Some(Spanned { token: Token::Newline, .. })) {
                tokens.push(Spanned {
                    token: Token::Newline,
                    line: tok_line,
                    column: tok_column,
                });
            }
            line += 1;
            pos += 1;
            line_start = pos;
            continue;
        }

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        // Quoted string
        if c == '"' {
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() || chars[pos] == '\n' {
                    errors.push(syntax(tok_line, tok_column, "unterminated string literal"));
                    break;
                }
                let sc = chars[pos];
                if sc == '"' {
                    pos += 1;
                    break;
                }
                if sc == '\\' && pos + 1 < chars.len() {
                    pos += 1;
                    match chars[pos] {
                        '"' => s.push('"'),
                        '\\' => s.push('\\'),
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        other => {
                            s.push('\\');
                            s.push(other);
                        }
                    }
                    pos += 1;
                    continue;
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Quote(s),
                line: tok_line,
                column: tok_column,
            });
            continue;
        }

        let single = match c {
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            ':' if chars.get(pos + 1) == Some(&'=') => {
                pos += 1;
                Some(Token::Assign)
            }
            ':' => Some(Token::Colon),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(Spanned {
                token,
                line: tok_line,
                column: tok_column,
            });
            pos += 1;
            continue;
        }

        // Variable reference
        if c == '$' {
            pos += 1;
            let start = pos;
            while pos < chars.len() && is_word_char(&chars, pos) {
                pos += 1;
            }
            if pos == start {
                errors.push(
                    Diagnostic::new(
                        ErrorKind::VariableExpected,
                        filename,
                        tok_line,
                        Some(tok_column),
                        "expected a variable name after '$'",
                    ),
                );
                continue;
            }
            tokens.push(Spanned {
                token: Token::Variable(chars[start..pos].iter().collect()),
                line: tok_line,
                column: tok_column,
            });
            continue;
        }

        let start = pos;
        while pos < chars.len() && is_word_char(&chars, pos) {
            pos += 1;
        }
        tokens.push(Spanned {
            token: Token::Word(chars[start..pos].iter().collect()),
            line: tok_line,
            column: tok_column,
        });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        line,
        column: (pos - line_start + 1) as u32,
    });
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        let mut errors = Vec::new();
        let toks = lex(src, "t", &mut errors);
        assert!(errors.is_empty(), "{:?}", errors);
        toks.into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn words_quotes_and_punctuation() {
        assert_eq!(
            kinds("pass : base {\n  colour \"a \\\"b\\\"\" 1.0\n}"),
            vec![
                Token::Word("pass".into()),
                Token::Colon,
                Token::Word("base".into()),
                Token::LBrace,
                Token::Newline,
                Token::Word("colour".into()),
                Token::Quote("a \"b\"".into()),
                Token::Word("1.0".into()),
                Token::Newline,
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn variables_and_assignment() {
        assert_eq!(
            kinds("$c := \"1 0 0\"\nset $d x"),
            vec![
                Token::Variable("c".into()),
                Token::Assign,
                Token::Quote("1 0 0".into()),
                Token::Newline,
                Token::Word("set".into()),
                Token::Variable("d".into()),
                Token::Word("x".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped_and_lines_counted() {
        let mut errors = Vec::new();
        let toks = lex("a // one\n/* two\nthree */ b\n\n\nc/*x*/d", "t", &mut errors);
        let positioned: Vec<(Token, u32, u32)> =
            toks.into_iter().map(|s| (s.token, s.line, s.column)).collect();
        assert_eq!(
            positioned,
            vec![
                (Token::Word("a".into()), 1, 1),
                (Token::Newline, 1, 9),
                (Token::Word("b".into()), 3, 10),
                (Token::Newline, 3, 11),
                (Token::Word("c".into()), 6, 1),
                (Token::Word("d".into()), 6, 7),
                (Token::Eof, 6, 8),
            ]
        );
    }

    #[test]
    fn unterminated_string_is_reported() {
        let mut errors = Vec::new();
        let toks = lex("a \"open\nb", "f.material", &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Syntax);
        assert_eq!((errors[0].line, errors[0].column), (1, Some(3)));
        assert_eq!(toks[1].token, Token::Quote("open".into()));
        assert_eq!(toks[3].token, Token::Word("b".into()));
    }

    #[test]
    fn bare_dollar_is_reported() {
        let mut errors = Vec::new();
        lex("a $ b", "t", &mut errors);
        assert_eq!(errors[0].kind, ErrorKind::VariableExpected);
    }
}
