use serde_json::Number;

use crate::ast::{Condition, Expression, Literal, OrGroup};
use crate::error::{QueryError, QueryResult};
use crate::lexer::{tokenize, Token, TokenKind};

/// Parse query text into an [`Expression`].
///
/// ```text
/// expression := group (OR group)*
/// group      := condition (AND condition)*
/// condition  := NOT? field operator value
/// field      := ident (. ident)*
/// value      := number | string | TRUE | FALSE | NULL | *
/// ```
///
/// Keywords are case-insensitive. `AND` binds tighter than `OR`; there are
/// no parentheses.
pub fn parse(input: &str) -> QueryResult<Expression> {
    let tokens = tokenize(input)?;
    if matches!(tokens.first().map(|t| &t.kind), Some(TokenKind::Eof) | None) {
        return Err(QueryError::syntax(0, "query is empty"));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expression = parser.expression()?;
    parser.expect_end()?;
    Ok(expression)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // `tokenize` always ends with Eof and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> QueryError {
        let token = self.peek();
        QueryError::syntax(
            token.position,
            format!("expected {expected}, found {}", token.kind),
        )
    }

    fn expression(&mut self) -> QueryResult<Expression> {
        let mut or_groups = vec![self.group()?];
        while self.eat(&TokenKind::Or) {
            or_groups.push(self.group()?);
        }
        Ok(Expression { or_groups })
    }

    fn group(&mut self) -> QueryResult<OrGroup> {
        let mut conditions = vec![self.condition()?];
        while self.eat(&TokenKind::And) {
            conditions.push(self.condition()?);
        }
        Ok(OrGroup { conditions })
    }

    fn condition(&mut self) -> QueryResult<Condition> {
        let negated = self.eat(&TokenKind::Not);
        let field = self.field()?;
        let operator = match self.peek().kind {
            TokenKind::Op(op) => {
                self.advance();
                op
            }
            _ => return Err(self.unexpected("an operator")),
        };
        let value = self.literal()?;
        Ok(Condition {
            negated,
            field,
            operator,
            value,
        })
    }

    fn field(&mut self) -> QueryResult<String> {
        let mut field = self.ident()?;
        while self.eat(&TokenKind::Dot) {
            field.push('.');
            field.push_str(&self.ident()?);
        }
        Ok(field)
    }

    fn ident(&mut self) -> QueryResult<String> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("a field name")),
        }
    }

    fn literal(&mut self) -> QueryResult<Literal> {
        let token = self.peek().clone();
        let literal = match token.kind {
            TokenKind::Number(text) => Literal::Number(parse_number(&text, token.position)?),
            TokenKind::Str(text) => Literal::String(text),
            TokenKind::True => Literal::Boolean(true),
            TokenKind::False => Literal::Boolean(false),
            TokenKind::Null => Literal::Null,
            TokenKind::Star => Literal::Wildcard,
            _ => return Err(self.unexpected("a value")),
        };
        self.advance();
        Ok(literal)
    }

    fn expect_end(&self) -> QueryResult<()> {
        match self.peek().kind {
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("AND, OR or end of query")),
        }
    }
}

/// Integers keep full precision; anything else becomes a finite f64.
fn parse_number(text: &str, position: usize) -> QueryResult<Number> {
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    if let Ok(i) = unsigned.parse::<i64>() {
        return Ok(i.into());
    }
    if let Ok(u) = unsigned.parse::<u64>() {
        return Ok(u.into());
    }
    unsigned
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| QueryError::syntax(position, format!("number `{text}` is out of range")))
}
