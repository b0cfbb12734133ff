use std::fmt;

use crate::ast::Operator;
use crate::error::{QueryError, QueryResult};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Number(String),
    Str(String),
    Op(Operator),
    And,
    Or,
    Not,
    True,
    False,
    Null,
    Star,
    Dot,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(s) => write!(f, "identifier `{s}`"),
            Self::Number(n) => write!(f, "number `{n}`"),
            Self::Str(s) => write!(f, "string {s:?}"),
            Self::Op(op) => write!(f, "`{op}`"),
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
            Self::Not => f.write_str("NOT"),
            Self::True => f.write_str("TRUE"),
            Self::False => f.write_str("FALSE"),
            Self::Null => f.write_str("NULL"),
            Self::Star => f.write_str("`*`"),
            Self::Dot => f.write_str("`.`"),
            Self::Eof => f.write_str("end of query"),
        }
    }
}

/// A token and the byte offset where it starts.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Split query text into tokens. The result always ends with `Eof`.
pub(crate) fn tokenize(input: &str) -> QueryResult<Vec<Token>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        let start = pos;
        let kind = match c {
            b'*' => {
                pos += 1;
                TokenKind::Star
            }
            b'=' | b':' => {
                pos += 1;
                TokenKind::Op(Operator::Eq)
            }
            b'!' if bytes.get(pos + 1) == Some(&b'=') => {
                pos += 2;
                TokenKind::Op(Operator::NotEq)
            }
            b'<' => match bytes.get(pos + 1) {
                Some(b'>') => {
                    pos += 2;
                    TokenKind::Op(Operator::NotEq)
                }
                Some(b'=') => {
                    pos += 2;
                    TokenKind::Op(Operator::LtEq)
                }
                _ => {
                    pos += 1;
                    TokenKind::Op(Operator::Lt)
                }
            },
            b'>' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    pos += 2;
                    TokenKind::Op(Operator::GtEq)
                } else {
                    pos += 1;
                    TokenKind::Op(Operator::Gt)
                }
            }
            b'\'' | b'"' => {
                let close = input[pos + 1..]
                    .find(c as char)
                    .ok_or_else(|| QueryError::syntax(start, "unterminated string"))?;
                let text = input[pos + 1..pos + 1 + close].to_string();
                pos += close + 2;
                TokenKind::Str(text)
            }
            b'.' if !bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                pos += 1;
                TokenKind::Dot
            }
            b'-' | b'+' | b'.' | b'0'..=b'9' => {
                pos = scan_number(bytes, pos)?;
                TokenKind::Number(input[start..pos].to_string())
            }
            c if c == b'_' || c.is_ascii_alphabetic() => {
                while pos < bytes.len() && (bytes[pos] == b'_' || bytes[pos].is_ascii_alphanumeric())
                {
                    pos += 1;
                }
                keyword_or_ident(&input[start..pos])
            }
            _ => {
                let ch = input[pos..].chars().next().unwrap_or('?');
                return Err(QueryError::syntax(start, format!("unexpected character `{ch}`")));
            }
        };
        tokens.push(Token {
            kind,
            position: start,
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: bytes.len(),
    });
    Ok(tokens)
}

fn keyword_or_ident(word: &str) -> TokenKind {
    match word.to_ascii_uppercase().as_str() {
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        "TRUE" => TokenKind::True,
        "FALSE" => TokenKind::False,
        "NULL" => TokenKind::Null,
        _ => TokenKind::Ident(word.to_string()),
    }
}

/// Consume `[+-]? digits? (. digits)? ([eE] [+-]? digits)?` starting at
/// `start` and return the end offset.
fn scan_number(bytes: &[u8], start: usize) -> QueryResult<usize> {
    let mut pos = start;
    if matches!(bytes.get(pos), Some(b'-' | b'+')) {
        pos += 1;
    }
    let int_digits = count_digits(bytes, pos);
    pos += int_digits;
    let mut frac_digits = 0;
    if bytes.get(pos) == Some(&b'.') {
        frac_digits = count_digits(bytes, pos + 1);
        if frac_digits == 0 {
            return Err(QueryError::syntax(pos, "expected digits after `.`"));
        }
        pos += 1 + frac_digits;
    }
    if int_digits == 0 && frac_digits == 0 {
        return Err(QueryError::syntax(start, "expected a number"));
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        let mut exp = pos + 1;
        if matches!(bytes.get(exp), Some(b'-' | b'+')) {
            exp += 1;
        }
        let exp_digits = count_digits(bytes, exp);
        if exp_digits == 0 {
            return Err(QueryError::syntax(pos, "expected digits in exponent"));
        }
        pos = exp + exp_digits;
    }
    if bytes
        .get(pos)
        .is_some_and(|b| *b == b'_' || b.is_ascii_alphabetic())
    {
        return Err(QueryError::syntax(pos, "unexpected character after number"));
    }
    Ok(pos)
}

fn count_digits(bytes: &[u8], from: usize) -> usize {
    bytes
        .get(from..)
        .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn simple_condition() {
        assert_eq!(
            kinds("name = 'ada'"),
            vec![
                TokenKind::Ident("name".into()),
                TokenKind::Op(Operator::Eq),
                TokenKind::Str("ada".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("and Or nOt true FALSE Null"),
            vec![
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn every_operator() {
        assert_eq!(
            kinds("= : != <> < <= > >="),
            vec![
                TokenKind::Op(Operator::Eq),
                TokenKind::Op(Operator::Eq),
                TokenKind::Op(Operator::NotEq),
                TokenKind::Op(Operator::NotEq),
                TokenKind::Op(Operator::Lt),
                TokenKind::Op(Operator::LtEq),
                TokenKind::Op(Operator::Gt),
                TokenKind::Op(Operator::GtEq),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("1 -2 +3 4.5 .5 1e3 -2.5E-2"),
            vec![
                TokenKind::Number("1".into()),
                TokenKind::Number("-2".into()),
                TokenKind::Number("+3".into()),
                TokenKind::Number("4.5".into()),
                TokenKind::Number(".5".into()),
                TokenKind::Number("1e3".into()),
                TokenKind::Number("-2.5E-2".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn dotted_field() {
        assert_eq!(
            kinds("a.b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Dot,
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn strings_take_either_quote() {
        assert_eq!(
            kinds(r#"'say "hi"' "it's""#),
            vec![
                TokenKind::Str(r#"say "hi""#.into()),
                TokenKind::Str("it's".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn positions_are_byte_offsets() {
        let tokens = tokenize("  a = 1").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![2, 4, 6, 7]);
    }

    #[test]
    fn unterminated_string_points_at_quote() {
        let err = tokenize("a = 'open").unwrap_err();
        assert!(matches!(err, QueryError::Syntax { position: 4, .. }));
    }

    #[test]
    fn unknown_character_rejected() {
        let err = tokenize("a = #").unwrap_err();
        assert!(matches!(err, QueryError::Syntax { position: 4, .. }));
    }

    #[test]
    fn malformed_numbers_rejected() {
        assert!(tokenize("a = 1.").is_err());
        assert!(tokenize("a = -").is_err());
        assert!(tokenize("a = 1e").is_err());
        assert!(tokenize("a = 12abc").is_err());
    }

    #[test]
    fn lone_bang_rejected() {
        assert!(matches!(
            tokenize("a ! 1"),
            Err(QueryError::Syntax { position: 2, .. })
        ));
    }
}
