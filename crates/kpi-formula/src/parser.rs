use crate::config::EvaluatorConfig;
use crate::engine::{FormulaError, FormulaResult};
use crate::functions::Function;

/// Parsed formula. The grammar has no variables, control flow or user-defined functions: a call
/// can only target one of the built-in [`Function`]s.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Identifier(String),
    Call {
        function: Function,
        args: Vec<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Negate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Power,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Identifier(String),
    Number(f64),
    String(String),
    Comma,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Eof,
}

struct Lexer<'a> {
    chars: std::str::Chars<'a>,
    peeked: Option<char>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        let mut chars = input.chars();
        let peeked = chars.next();
        Self { chars, peeked }
    }

    fn bump(&mut self) -> Option<char> {
        let current = self.peeked.take();
        self.peeked = self.chars.next();
        current
    }

    fn peek(&self) -> Option<char> {
        self.peeked
    }

    fn consume_while<F>(&mut self, mut predicate: F) -> String
    where
        F: FnMut(char) -> bool,
    {
        let mut buf = String::new();
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            buf.push(ch);
            self.bump();
        }
        buf
    }

    fn single(&mut self, token: Token) -> FormulaResult<Token> {
        self.bump();
        Ok(token)
    }

    /// `*` or `**`, `/` or `//`.
    fn doubled(&mut self, single: Token, double: Token) -> FormulaResult<Token> {
        let ch = self.bump();
        if self.peek() == ch {
            self.bump();
            return Ok(double);
        }
        Ok(single)
    }

    fn next_token(&mut self) -> FormulaResult<Token> {
        self.consume_while(char::is_whitespace);
        let Some(ch) = self.peek() else {
            return Ok(Token::Eof);
        };

        match ch {
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            ',' => self.single(Token::Comma),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.doubled(Token::Star, Token::StarStar),
            '/' => self.doubled(Token::Slash, Token::SlashSlash),
            '"' | '\'' => {
                self.bump();
                let mut out = String::new();
                loop {
                    match self.bump() {
                        None => return Err(FormulaError::Parse("unterminated string".into())),
                        Some(c) if c == ch => break,
                        Some(c) => out.push(c),
                    }
                }
                Ok(Token::String(out))
            }
            c if c.is_ascii_digit() || c == '.' => self.lex_number(),
            c if is_ident_start(c) => Ok(Token::Identifier(self.consume_while(is_ident_part))),
            other => Err(FormulaError::Parse(format!("unexpected character {other:?}"))),
        }
    }

    /// A run of digits, allowing single `_` separators between digits (`1_000`).
    fn consume_digits(&mut self) -> String {
        let mut buf = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                buf.push(c);
                self.bump();
            } else if c == '_'
                && !buf.is_empty()
                && self.chars.clone().next().is_some_and(|d| d.is_ascii_digit())
            {
                self.bump();
            } else {
                break;
            }
        }
        buf
    }

    fn lex_number(&mut self) -> FormulaResult<Token> {
        let mut num_str = self.consume_digits();
        if self.peek() == Some('.') {
            self.bump();
            num_str.push('.');
            num_str.push_str(&self.consume_digits());
        }
        if num_str == "." {
            return Err(FormulaError::Parse("unexpected '.'".into()));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            num_str.push('e');
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.bump();
                num_str.push(sign);
            }
            let exp_digits = self.consume_digits();
            if exp_digits.is_empty() {
                return Err(FormulaError::Parse(format!(
                    "invalid number {num_str:?} (expected exponent digits)"
                )));
            }
            num_str.push_str(&exp_digits);
        }
        // `2x`, `1.2.3` and friends.
        if let Some(c) = self.peek() {
            if is_ident_part(c) || c == '.' {
                return Err(FormulaError::Parse(format!(
                    "invalid number {num_str:?} followed by {c:?}"
                )));
            }
        }
        let num: f64 = num_str
            .parse()
            .map_err(|_| FormulaError::Parse(format!("invalid number {num_str:?}")))?;
        Ok(Token::Number(num))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Token,
    config: &'a EvaluatorConfig,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, config: &'a EvaluatorConfig) -> FormulaResult<Self> {
        let mut lexer = Lexer::new(input);
        let lookahead = lexer.next_token()?;
        Ok(Self {
            lexer,
            lookahead,
            config,
            depth: 0,
        })
    }

    fn bump(&mut self) -> FormulaResult<Token> {
        let current = std::mem::replace(&mut self.lookahead, Token::Eof);
        self.lookahead = self.lexer.next_token()?;
        Ok(current)
    }

    fn expect(&mut self, token: Token) -> FormulaResult<()> {
        if self.lookahead == token {
            self.bump()?;
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "expected {token:?}, found {:?}",
                self.lookahead
            )))
        }
    }

    fn descend(&mut self) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > self.config.max_nesting_depth {
            return Err(FormulaError::TooComplex(format!(
                "nesting deeper than {}",
                self.config.max_nesting_depth
            )));
        }
        Ok(())
    }

    fn parse(&mut self) -> FormulaResult<Expr> {
        let expr = self.parse_expr(0)?;
        if self.lookahead != Token::Eof {
            return Err(FormulaError::Parse(format!(
                "unexpected token {:?}",
                self.lookahead
            )));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self, min_prec: u8) -> FormulaResult<Expr> {
        let mut left = self.parse_prefix()?;
        while let Some((op, prec)) = self.infix_binding_power() {
            if prec < min_prec {
                break;
            }
            self.bump()?;
            // `**` is right-associative: `2 ** 3 ** 2` is `2 ** 9`.
            let next_min = if op == BinaryOp::Power { prec } else { prec + 1 };
            self.descend()?;
            let right = self.parse_expr(next_min)?;
            self.depth -= 1;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> FormulaResult<Expr> {
        match &self.lookahead {
            Token::Minus | Token::Plus => {
                let op = if self.bump()? == Token::Minus {
                    UnaryOp::Negate
                } else {
                    UnaryOp::Plus
                };
                self.descend()?;
                let expr = self.parse_expr(3)?;
                self.depth -= 1;
                Ok(Expr::UnaryOp {
                    op,
                    expr: Box::new(expr),
                })
            }
            Token::Number(n) => {
                let n = *n;
                self.bump()?;
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                let s = s.clone();
                self.bump()?;
                Ok(Expr::Text(s))
            }
            Token::Identifier(_) => self.parse_ident_like(),
            Token::LParen => {
                self.bump()?;
                self.descend()?;
                let inner = self.parse_expr(0)?;
                self.depth -= 1;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(FormulaError::Parse(format!(
                "unexpected token in expression: {other:?}"
            ))),
        }
    }

    fn parse_ident_like(&mut self) -> FormulaResult<Expr> {
        let Token::Identifier(ident) = self.bump()? else {
            return Err(FormulaError::Parse("expected identifier".into()));
        };

        if self.lookahead != Token::LParen {
            return Ok(Expr::Identifier(ident));
        }

        let function = Function::lookup(&ident, self.config.case_insensitive_functions)
            .ok_or_else(|| FormulaError::UnknownFunction(ident.clone()))?;
        self.bump()?;
        self.descend()?;
        let mut args = Vec::new();
        if self.lookahead != Token::RParen {
            loop {
                args.push(self.parse_expr(0)?);
                if self.lookahead == Token::Comma {
                    self.bump()?;
                    continue;
                }
                break;
            }
        }
        self.depth -= 1;
        self.expect(Token::RParen)?;
        function.check_arity(args.len())?;
        Ok(Expr::Call { function, args })
    }

    fn infix_binding_power(&self) -> Option<(BinaryOp, u8)> {
        match self.lookahead {
            Token::Plus => Some((BinaryOp::Add, 1)),
            Token::Minus => Some((BinaryOp::Subtract, 1)),
            Token::Star => Some((BinaryOp::Multiply, 2)),
            Token::Slash => Some((BinaryOp::Divide, 2)),
            Token::SlashSlash => Some((BinaryOp::FloorDivide, 2)),
            // Unary operands are parsed at 3, so `-a ** b` is `-(a ** b)`.
            Token::StarStar => Some((BinaryOp::Power, 4)),
            _ => None,
        }
    }
}

/// Parse with the default [`EvaluatorConfig`].
pub fn parse(input: &str) -> FormulaResult<Expr> {
    parse_with_config(input, &EvaluatorConfig::default())
}

pub fn parse_with_config(input: &str, config: &EvaluatorConfig) -> FormulaResult<Expr> {
    if input.chars().count() > config.max_expression_len {
        return Err(FormulaError::TooComplex(format!(
            "expression longer than {} characters",
            config.max_expression_len
        )));
    }
    Parser::new(input, config)?.parse()
}
