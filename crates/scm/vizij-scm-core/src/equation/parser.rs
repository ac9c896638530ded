//! Recursive-descent parser producing an [`Expr`] from equation body tokens.
//!
//! Precedence, lowest first: conditional `a if c else b`, `or`, `and`, `not`,
//! comparisons, `+ -`, `* / // %`, unary `+ -`, `**`.

use super::expr::{lookup_constant, BinOp, Builtin, CmpOp, Domain, Expr};
use super::lexer::Token;

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    params: &'a [String],
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], params: &'a [String]) -> Self {
        Self {
            tokens,
            pos: 0,
            params,
        }
    }

    /// Parse the full token stream as a single expression.
    pub fn parse(mut self) -> Result<Expr, String> {
        if self.tokens.is_empty() {
            return Err("empty function body".to_string());
        }
        let expr = self.conditional()?;
        match self.peek() {
            None => Ok(expr),
            Some(tok) => Err(format!("unexpected trailing token {tok:?}")),
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(name)) if name == kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("expected {expected:?}, found {:?}", self.peek()))
        }
    }

    fn conditional(&mut self) -> Result<Expr, String> {
        let then = self.or_expr()?;
        if !self.eat_keyword("if") {
            return Ok(then);
        }
        let cond = self.or_expr()?;
        if !self.eat_keyword("else") {
            return Err("conditional expression is missing 'else'".to_string());
        }
        let otherwise = self.conditional()?;
        Ok(Expr::Cond {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn or_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.and_expr()?;
        while self.eat_keyword("or") {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.not_expr()?;
        while self.eat_keyword("and") {
            let rhs = self.not_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, String> {
        if self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.not_expr()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let first = self.additive()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Le) => CmpOp::Le,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Ge) => CmpOp::Ge,
                Some(Token::EqEq) => CmpOp::Eq,
                Some(Token::NotEq) => CmpOp::Ne,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.additive()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::DoubleSlash) => BinOp::FloorDiv,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    // `-2 ** 2` is `-(2 ** 2)` and `2 ** -1` is allowed.
    fn power(&mut self) -> Result<Expr, String> {
        let base = self.primary()?;
        if self.eat(&Token::DoubleStar) {
            let exp = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Number(v)) => Ok(Expr::Num(*v)),
            Some(Token::LParen) => {
                let inner = self.conditional()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    self.call(name)
                } else {
                    self.name(name)
                }
            }
            Some(tok) => Err(format!("unexpected token {tok:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn name(&self, name: &str) -> Result<Expr, String> {
        if let Some(slot) = self.params.iter().position(|p| p == name) {
            return Ok(Expr::Arg(slot));
        }
        if name == "_" {
            return Err("placeholder '_' cannot be referenced in the body".to_string());
        }
        lookup_constant(name)
            .map(Expr::Num)
            .ok_or_else(|| format!("unknown name '{name}'"))
    }

    fn call(&mut self, name: &str) -> Result<Expr, String> {
        let f = Builtin::lookup(name).ok_or_else(|| format!("unknown function '{name}'"))?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.conditional()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }
        let (min, max) = f.arity();
        if args.len() < min || args.len() > max {
            return Err(format!(
                "function '{name}' takes {} argument(s), got {}",
                if min == max {
                    min.to_string()
                } else if max == usize::MAX {
                    format!("at least {min}")
                } else {
                    format!("{min} to {max}")
                },
                args.len()
            ));
        }
        Ok(Expr::Call(f, Domain::of(name), args))
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::Lexer;
    use super::*;

    fn eval(src: &str, params: &[&str], args: &[f64]) -> f64 {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let tokens = Lexer::new(src).tokenize().unwrap();
        let expr = Parser::new(&tokens, &params).parse().unwrap();
        expr.eval(args).unwrap()
    }

    fn parse_err(src: &str, params: &[&str]) -> String {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(&tokens, &params).parse().unwrap_err()
    }

    #[test]
    fn respects_operator_precedence() {
        assert_eq!(eval("1 + 2 * 3", &[], &[]), 7.0);
        assert_eq!(eval("-2 ** 2", &[], &[]), -4.0);
        assert_eq!(eval("2 ** 3 ** 2", &[], &[]), 512.0);
        assert_eq!(eval("2 ** -1", &[], &[]), 0.5);
        assert_eq!(eval("(1 + 2) * 3", &[], &[]), 9.0);
        assert_eq!(eval("7 // 2 + 7 % 2", &[], &[]), 4.0);
    }

    #[test]
    fn binds_parameters_to_slots() {
        assert_eq!(eval("a * 2 + b", &["a", "b"], &[3.0, 1.0]), 7.0);
        assert_eq!(eval("np.exp(x) - math.exp(x)", &["x"], &[0.3]), 0.0);
    }

    #[test]
    fn conditionals_and_comparisons() {
        assert_eq!(eval("1 if x > 0 else -1", &["x"], &[2.0]), 1.0);
        assert_eq!(eval("1 if x > 0 else -1", &["x"], &[-2.0]), -1.0);
        assert_eq!(eval("0 < x < 1", &["x"], &[0.5]), 1.0);
        assert_eq!(eval("0 < x < 1", &["x"], &[1.5]), 0.0);
        assert_eq!(eval("not x and 3", &["x"], &[0.0]), 3.0);
    }

    #[test]
    fn calls_check_arity() {
        assert_eq!(eval("max(a, b, 0)", &["a", "b"], &[-1.0, -2.0]), 0.0);
        assert_eq!(eval("clip(x, 0, 1)", &["x"], &[4.0]), 1.0);
        assert!(parse_err("sqrt(1, 2)", &[]).contains("takes 1 argument"));
        assert!(parse_err("max(1)", &[]).contains("at least 2"));
        assert!(parse_err("system(1)", &[]).contains("unknown function"));
    }

    #[test]
    fn math_namespace_selects_checked_domain() {
        let tokens = Lexer::new("math.sqrt(x) + np.sqrt(x)").tokenize().unwrap();
        let params = vec!["x".to_string()];
        let expr = Parser::new(&tokens, &params).parse().unwrap();
        assert!(expr.eval(&[-1.0]).unwrap_err().contains("math domain error"));
        assert!(eval("np.sqrt(x) + sqrt(x)", &["x"], &[-1.0]).is_nan());
    }

    #[test]
    fn rejects_unknown_names_and_placeholder() {
        assert!(parse_err("y + 1", &["x"]).contains("unknown name 'y'"));
        assert!(parse_err("_ + 1", &["x"]).contains("placeholder"));
        assert!(parse_err("x +", &["x"]).contains("end of expression"));
        assert!(parse_err("x 1", &["x"]).contains("trailing"));
        assert!(parse_err("1 if x", &["x"]).contains("else"));
    }
}
