use super::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    In,
    If,
    Else,
    Pass,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    StarStarAssign,
    SlashAssign,
    SlashSlashAssign,
    PercentAssign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Newline,
    Eof,
}

#[derive(Debug, Clone)]
pub(crate) struct Spanned {
    pub(crate) token: Token,
    pub(crate) offset: usize,
}

/// Split source into tokens. Newlines inside brackets are insignificant and
/// `;` is reported as a newline.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ScriptError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut pos = 0usize;

    while pos < bytes.len() {
        let start = pos;
        let ch = bytes[pos];
        match ch {
            b' ' | b'\t' | b'\r' => {
                pos += 1;
                continue;
            }
            b'\\' if bytes.get(pos + 1) == Some(&b'\n') => {
                pos += 2;
                continue;
            }
            b'#' => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
                continue;
            }
            b'\n' | b';' => {
                pos += 1;
                if depth == 0 {
                    tokens.push(Spanned {
                        token: Token::Newline,
                        offset: start,
                    });
                }
                continue;
            }
            b'0'..=b'9' => {
                let (token, end) = lex_number(source, pos)?;
                tokens.push(Spanned {
                    token,
                    offset: start,
                });
                pos = end;
                continue;
            }
            b'.' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                let (token, end) = lex_number(source, pos)?;
                tokens.push(Spanned {
                    token,
                    offset: start,
                });
                pos = end;
                continue;
            }
            b'\'' | b'"' => {
                let (value, end) = lex_string(source, pos)?;
                tokens.push(Spanned {
                    token: Token::Str(value),
                    offset: start,
                });
                pos = end;
                continue;
            }
            _ if ch == b'_' || ch.is_ascii_alphabetic() => {
                while pos < bytes.len() && (bytes[pos] == b'_' || bytes[pos].is_ascii_alphanumeric())
                {
                    pos += 1;
                }
                tokens.push(Spanned {
                    token: keyword_or_name(&source[start..pos]),
                    offset: start,
                });
                continue;
            }
            _ => {}
        }

        let rest = &source[pos..];
        let (token, len) = match_operator(rest).ok_or_else(|| {
            let found = rest.chars().next().unwrap_or(' ');
            ScriptError::syntax(format!("unexpected character {found:?}"), start)
        })?;
        match token {
            Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
            Token::RParen | Token::RBracket | Token::RBrace => depth = depth.saturating_sub(1),
            _ => {}
        }
        tokens.push(Spanned {
            token,
            offset: start,
        });
        pos += len;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: source.len(),
    });
    Ok(tokens)
}

const OPERATORS: &[(&str, Token)] = &[
    ("**=", Token::StarStarAssign),
    ("//=", Token::SlashSlashAssign),
    ("**", Token::StarStar),
    ("//", Token::SlashSlash),
    ("+=", Token::PlusAssign),
    ("-=", Token::MinusAssign),
    ("*=", Token::StarAssign),
    ("/=", Token::SlashAssign),
    ("%=", Token::PercentAssign),
    ("==", Token::EqEq),
    ("!=", Token::NotEq),
    ("<=", Token::Le),
    (">=", Token::Ge),
    ("+", Token::Plus),
    ("-", Token::Minus),
    ("*", Token::Star),
    ("/", Token::Slash),
    ("%", Token::Percent),
    ("=", Token::Assign),
    ("<", Token::Lt),
    (">", Token::Gt),
    ("(", Token::LParen),
    (")", Token::RParen),
    ("[", Token::LBracket),
    ("]", Token::RBracket),
    ("{", Token::LBrace),
    ("}", Token::RBrace),
    (",", Token::Comma),
    (":", Token::Colon),
];

fn match_operator(rest: &str) -> Option<(Token, usize)> {
    OPERATORS
        .iter()
        .find(|(text, _)| rest.starts_with(text))
        .map(|(text, token)| (token.clone(), text.len()))
}

fn keyword_or_name(word: &str) -> Token {
    match word {
        "True" => Token::True,
        "False" => Token::False,
        "None" => Token::None,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "in" => Token::In,
        "if" => Token::If,
        "else" => Token::Else,
        "pass" => Token::Pass,
        _ => Token::Name(word.to_string()),
    }
}

fn lex_number(source: &str, start: usize) -> Result<(Token, usize), ScriptError> {
    let bytes = source.as_bytes();
    let mut pos = start;
    let mut is_float = false;
    while pos < bytes.len() {
        match bytes[pos] {
            b'0'..=b'9' | b'_' => pos += 1,
            b'.' if !is_float => {
                is_float = true;
                pos += 1;
            }
            b'e' | b'E' => {
                let mut next = pos + 1;
                if matches!(bytes.get(next), Some(b'+' | b'-')) {
                    next += 1;
                }
                if !bytes.get(next).is_some_and(u8::is_ascii_digit) {
                    break;
                }
                is_float = true;
                pos = next;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                break;
            }
            _ => break,
        }
    }
    let text: String = source[start..pos].chars().filter(|ch| *ch != '_').collect();
    let token = if is_float {
        Token::Float(
            text.parse()
                .map_err(|_| ScriptError::syntax(format!("invalid float literal {text:?}"), start))?,
        )
    } else {
        Token::Int(
            text.parse()
                .map_err(|_| ScriptError::syntax(format!("invalid integer literal {text:?}"), start))?,
        )
    };
    Ok((token, pos))
}

fn lex_string(source: &str, start: usize) -> Result<(String, usize), ScriptError> {
    let mut chars = source[start..].char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(ScriptError::syntax("unterminated string", start));
    };
    let mut value = String::new();
    while let Some((idx, ch)) = chars.next() {
        if ch == quote {
            return Ok((value, start + idx + ch.len_utf8()));
        }
        if ch == '\n' {
            break;
        }
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        let Some((_, escaped)) = chars.next() else {
            break;
        };
        match escaped {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            '0' => value.push('\0'),
            '\\' | '\'' | '"' => value.push(escaped),
            '\n' => {}
            other => {
                value.push('\\');
                value.push(other);
            }
        }
    }
    Err(ScriptError::syntax("unterminated string", start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|spanned| spanned.token)
            .collect()
    }

    #[test]
    fn lexes_augmented_assignment() {
        assert_eq!(
            kinds("x *= 1.1"),
            vec![
                Token::Name("x".into()),
                Token::StarAssign,
                Token::Float(1.1),
                Token::Eof
            ]
        );
    }

    #[test]
    fn semicolons_and_newlines_separate_statements() {
        assert_eq!(
            kinds("a = 1; b = 2\n"),
            vec![
                Token::Name("a".into()),
                Token::Assign,
                Token::Int(1),
                Token::Newline,
                Token::Name("b".into()),
                Token::Assign,
                Token::Int(2),
                Token::Newline,
                Token::Eof
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_ignored() {
        assert!(!kinds("[1,\n2]").contains(&Token::Newline));
    }

    #[test]
    fn strings_handle_escapes_and_both_quotes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\tb""#),
            vec![
                Token::Str("it's".into()),
                Token::Str("a\tb".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn reports_unterminated_string() {
        let err = tokenize("print('oops)").unwrap_err();
        assert!(err.to_string().contains("unterminated string"), "{err}");
    }
}
