//! Expression tokenizer and recursive-descent parser (spec §4.1).
//!
//! The grammar has five fixed token shapes (`@field`, integer, decimal,
//! quoted string, identifier/punctuation), so tokenization is a hand-written
//! byte scan rather than a regex-backed lexeme: there is no backtracking or
//! alternation to delegate to a regex engine for a grammar this small.

use crate::ast_node::Expr;
use crate::ParseError;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    At,
    Ident(String),
    Int(i64),
    Double(f64),
    Str(String),
    LParen,
    RParen,
    Comma,
    Eof,
}

struct Lexer<'s> {
    bytes: &'s [u8],
    pos: usize,
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Lexer {
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> Result<(Tok, usize), ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(b) = self.peek_byte() else {
            return Ok((Tok::Eof, start));
        };
        match b {
            b'@' => {
                self.pos += 1;
                Ok((Tok::At, start))
            }
            b'(' => {
                self.pos += 1;
                Ok((Tok::LParen, start))
            }
            b')' => {
                self.pos += 1;
                Ok((Tok::RParen, start))
            }
            b',' => {
                self.pos += 1;
                Ok((Tok::Comma, start))
            }
            b'"' => self.read_string(start),
            b'0'..=b'9' => self.read_number(start),
            b if b.is_ascii_alphabetic() || b == b'_' => Ok((self.read_ident(), start)),
            other => Err(ParseError::UnexpectedToken {
                offset: start,
                message: format!("unexpected character {:?}", other as char),
            }),
        }
    }

    fn read_ident(&mut self) -> Tok {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let ident = std::str::from_utf8(&self.bytes[start..self.pos])
            .expect("ascii-validated ident")
            .to_string();
        Tok::Ident(ident)
    }

    fn read_number(&mut self, start: usize) -> Result<(Tok, usize), ParseError> {
        let mut is_double = false;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek_byte() == Some(b'.') {
            is_double = true;
            self.pos += 1;
            while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).expect("ascii digits");
        if is_double {
            let value = text.parse::<f64>().map_err(|e| ParseError::BadNumber {
                offset: start,
                message: e.to_string(),
            })?;
            Ok((Tok::Double(value), start))
        } else {
            let value = text.parse::<i64>().map_err(|e| ParseError::BadNumber {
                offset: start,
                message: e.to_string(),
            })?;
            Ok((Tok::Int(value), start))
        }
    }

    fn read_string(&mut self, start: usize) -> Result<(Tok, usize), ParseError> {
        self.pos += 1; // opening quote
        let mut value = String::new();
        loop {
            match self.peek_byte() {
                None => {
                    return Err(ParseError::UnterminatedString { offset: start });
                }
                Some(b'"') => {
                    self.pos += 1;
                    return Ok((Tok::Str(value), start));
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek_byte() {
                        Some(b'"') => {
                            value.push('"');
                            self.pos += 1;
                        }
                        Some(b'\\') => {
                            value.push('\\');
                            self.pos += 1;
                        }
                        Some(other) => {
                            value.push(other as char);
                            self.pos += 1;
                        }
                        None => return Err(ParseError::UnterminatedString { offset: start }),
                    }
                }
                Some(b) => {
                    value.push(b as char);
                    self.pos += 1;
                }
            }
        }
    }
}

struct Parser<'s> {
    lexer: Lexer<'s>,
    lookahead: (Tok, usize),
}

impl<'s> Parser<'s> {
    fn new(src: &'s str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(src);
        let lookahead = lexer.next_token()?;
        Ok(Parser { lexer, lookahead })
    }

    fn advance(&mut self) -> Result<(Tok, usize), ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.lookahead, next))
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        match self.lookahead.0.clone() {
            Tok::At => {
                self.advance()?;
                let (tok, offset) = self.advance()?;
                match tok {
                    Tok::Ident(name) => Ok(Expr::Field(name)),
                    other => Err(ParseError::UnexpectedToken {
                        offset,
                        message: format!("expected field name after '@', found {other:?}"),
                    }),
                }
            }
            Tok::Int(v) => {
                self.advance()?;
                Ok(Expr::Int(v))
            }
            Tok::Double(v) => {
                self.advance()?;
                Ok(Expr::Double(v))
            }
            Tok::Str(s) => {
                self.advance()?;
                Ok(Expr::Str(s))
            }
            Tok::Ident(name) => {
                self.advance()?;
                self.expect_lparen()?;
                let args = self.parse_args()?;
                Ok(Expr::Call { name, args })
            }
            other => Err(ParseError::UnexpectedToken {
                offset: self.lookahead.1,
                message: format!("expected an expression, found {other:?}"),
            }),
        }
    }

    fn expect_lparen(&mut self) -> Result<(), ParseError> {
        let (tok, offset) = self.advance()?;
        if tok == Tok::LParen {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                offset,
                message: format!("expected '(', found {tok:?}"),
            })
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.lookahead.0 == Tok::RParen {
            self.advance()?;
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            let (tok, offset) = self.advance()?;
            match tok {
                Tok::Comma => continue,
                Tok::RParen => break,
                other => {
                    return Err(ParseError::UnexpectedToken {
                        offset,
                        message: format!("expected ',' or ')', found {other:?}"),
                    })
                }
            }
        }
        Ok(args)
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        if self.lookahead.0 == Tok::Eof {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                offset: self.lookahead.1,
                message: format!("trailing input after expression: {:?}", self.lookahead.0),
            })
        }
    }
}

/// Parse a full expression string, rejecting any trailing input.
pub fn parse_expr(src: &str) -> Result<Expr, ParseError> {
    if src.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }
    let mut parser = Parser::new(src)?;
    let expr = parser.parse_expr()?;
    parser.expect_eof()?;
    Ok(expr)
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn parses_field_reference() {
        assert_eq!(parse_expr("@open").unwrap(), Expr::Field("open".to_string()));
    }

    #[test]
    fn parses_integer_and_double_literals() {
        assert_eq!(parse_expr("42").unwrap(), Expr::Int(42));
        assert_eq!(parse_expr("3.5").unwrap(), Expr::Double(3.5));
    }

    #[test]
    fn parses_nested_call() {
        let expr = parse_expr("add(ts_mean(@x, 3), @y)").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                name: "add".to_string(),
                args: vec![
                    Expr::Call {
                        name: "ts_mean".to_string(),
                        args: vec![Expr::Field("x".to_string()), Expr::Int(3)],
                    },
                    Expr::Field("y".to_string()),
                ],
            }
        );
    }

    #[test]
    fn ignores_insignificant_whitespace() {
        let a = parse_expr("add( @a , @b )").unwrap();
        let b = parse_expr("add(@a,@b)").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parses_string_literal_with_escapes() {
        let expr = parse_expr(r#"tag(@x, "a\"b")"#).unwrap();
        match expr {
            Expr::Call { args, .. } => {
                assert_eq!(args[1], Expr::Str("a\"b".to_string()));
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(parse_expr("").unwrap_err(), ParseError::EmptyInput);
        assert_eq!(parse_expr("   ").unwrap_err(), ParseError::EmptyInput);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(matches!(
            parse_expr(r#"tag(@x, "abc)"#),
            Err(ParseError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn trailing_input_is_an_error() {
        assert!(parse_expr("@x @y").is_err());
    }

    #[test]
    fn bare_identifier_without_call_is_an_error() {
        assert!(parse_expr("wiggle").is_err());
    }
}
