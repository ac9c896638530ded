//! Tokenizer for equation bodies.

use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    /// Identifier, possibly dotted (`np.sin`, `math.pi`).
    Ident(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
}

pub struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
        }
    }

    /// Tokenize the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut out = Vec::new();
        while let Some(tok) = self.next_token()? {
            out.push(tok);
        }
        Ok(out)
    }

    fn next_token(&mut self) -> Result<Option<Token>, String> {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
        let Some((start, c)) = self.chars.next() else {
            return Ok(None);
        };
        let tok = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '%' => Token::Percent,
            '*' => {
                if self.eat('*') {
                    Token::DoubleStar
                } else {
                    Token::Star
                }
            }
            '/' => {
                if self.eat('/') {
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '<' => {
                if self.eat('=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '=' => {
                if self.eat('=') {
                    Token::EqEq
                } else {
                    return Err(format!("unexpected '=' at offset {start}"));
                }
            }
            '!' => {
                if self.eat('=') {
                    Token::NotEq
                } else {
                    return Err(format!("unexpected '!' at offset {start}"));
                }
            }
            c if c.is_ascii_digit() || c == '.' => self.number(start)?,
            c if c.is_alphabetic() || c == '_' => self.ident(start),
            other => return Err(format!("unexpected character '{other}' at offset {start}")),
        };
        Ok(Some(tok))
    }

    fn eat(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some(&(_, c)) if c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn end_of(&mut self, pred: impl Fn(char) -> bool) -> usize {
        while let Some(&(idx, c)) = self.chars.peek() {
            if !pred(c) {
                return idx;
            }
            self.chars.next();
        }
        self.src.len()
    }

    fn number(&mut self, start: usize) -> Result<Token, String> {
        let mut end = self.end_of(|c| c.is_ascii_digit() || c == '.');
        // exponent part: e, E, optionally signed
        if let Some(&(idx, 'e' | 'E')) = self.chars.peek() {
            let rest = &self.src[idx + 1..];
            let signed = rest.starts_with('+') || rest.starts_with('-');
            let digits_at = if signed { 1 } else { 0 };
            if rest[digits_at..].starts_with(|c: char| c.is_ascii_digit()) {
                self.chars.next();
                if signed {
                    self.chars.next();
                }
                end = self.end_of(|c| c.is_ascii_digit());
            }
        }
        let text = &self.src[start..end];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| format!("invalid number literal '{text}'"))
    }

    fn ident(&mut self, start: usize) -> Token {
        let end = self.end_of(|c| c.is_alphanumeric() || c == '_' || c == '.');
        Token::Ident(self.src[start..end].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_operators_and_literals() {
        let toks = Lexer::new("2.5e-1 * np.sin(x) // 3 ** y <= 1").tokenize().unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Number(0.25),
                Token::Star,
                Token::Ident("np.sin".into()),
                Token::LParen,
                Token::Ident("x".into()),
                Token::RParen,
                Token::DoubleSlash,
                Token::Number(3.0),
                Token::DoubleStar,
                Token::Ident("y".into()),
                Token::Le,
                Token::Number(1.0),
            ]
        );
    }

    #[test]
    fn exponent_requires_digits() {
        let toks = Lexer::new("2ex").tokenize().unwrap();
        assert_eq!(toks, vec![Token::Number(2.0), Token::Ident("ex".into())]);
    }

    #[test]
    fn rejects_stray_characters() {
        assert!(Lexer::new("a $ b").tokenize().is_err());
        assert!(Lexer::new("a = b").tokenize().is_err());
    }
}
