//! Arithmetic-only expression evaluator behind the `calculator` tool.
//!
//! Input is restricted to digits, whitespace, `.` and `+ - * / ( )` before
//! anything is parsed. Supported operators: `+ - * / // **`, unary sign and
//! parentheses. Integer arithmetic stays integral; `/` always yields a float.
//! Every failure is returned as an `Error: ...` string for the model to read.

use std::fmt;

const EMPTY_EXPRESSION: &str = "Error: empty expression";
const DISALLOWED_INPUT: &str = "Error: only numbers and + - * / ** ( ) are allowed";

/// Parenthesis and unary-sign nesting limit.
const MAX_DEPTH: usize = 64;

/// Evaluate `expression` and render the result, or an `Error: ...` message.
pub fn evaluate(expression: &str) -> String {
    let expr = expression.trim();
    if expr.is_empty() {
        return EMPTY_EXPRESSION.to_string();
    }
    if !expr.chars().all(is_allowed) {
        return DISALLOWED_INPUT.to_string();
    }

    match tokenize(expr).and_then(|tokens| Parser::new(tokens).parse()) {
        Ok(value) => value.to_string(),
        Err(reason) => format!("Error: {}", reason),
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || matches!(c, '.' | '+' | '-' | '*' | '/' | '(' | ')')
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Int(i64),
    Float(f64),
}

impl Value {
    fn as_f64(self) -> f64 {
        match self {
            Value::Int(i) => i as f64,
            Value::Float(f) => f,
        }
    }

    fn finite(self) -> Result<Value, String> {
        match self {
            Value::Float(f) if !f.is_finite() => Err("result is not finite".to_string()),
            v => Ok(v),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            // Debug keeps the trailing ".0" on whole floats
            Value::Float(x) => write!(f, "{:?}", x),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(Value),
    Plus,
    Minus,
    Star,
    Pow,
    Slash,
    FloorDiv,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_number(&literal)?));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::FloorDiv);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

fn parse_number(literal: &str) -> Result<Value, String> {
    let invalid = || format!("invalid number '{}'", literal);
    if literal == "." || literal.matches('.').count() > 1 {
        return Err(invalid());
    }
    if literal.contains('.') {
        return literal.parse::<f64>().map(Value::Float).map_err(|_| invalid());
    }
    match literal.parse::<i64>() {
        Ok(i) => Ok(Value::Int(i)),
        // Out of i64 range
        Err(_) => literal.parse::<f64>().map(Value::Float).map_err(|_| invalid()),
    }
}

/// Recursive-descent parser that evaluates as it goes.
///
/// ```text
/// expr  := term (('+' | '-') term)*
/// term  := unary (('*' | '/' | '//') unary)*
/// unary := ('+' | '-') unary | power
/// power := atom ('**' unary)?
/// atom  := NUMBER | '(' expr ')'
/// ```
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn parse(mut self) -> Result<Value, String> {
        let value = self.expr()?;
        if self.pos != self.tokens.len() {
            return Err("invalid syntax".to_string());
        }
        value.finite()
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn enter(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err("expression is nested too deeply".to_string());
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Value, String> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value = add(value, self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value = sub(value, self.term()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<Value, String> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value = mul(value, self.unary()?)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    value = div(value, self.unary()?)?;
                }
                Some(Token::FloorDiv) => {
                    self.pos += 1;
                    value = floor_div(value, self.unary()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<Value, String> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.enter()?;
                let value = self.unary();
                self.depth -= 1;
                value
            }
            Some(Token::Minus) => {
                self.pos += 1;
                self.enter()?;
                let value = self.unary().and_then(negate);
                self.depth -= 1;
                value
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Value, String> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            self.enter()?;
            let exponent = self.unary();
            self.depth -= 1;
            return pow(base, exponent?);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Value, String> {
        match self.advance() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                self.enter()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("unbalanced parentheses".to_string()),
                }
            }
            _ => Err("invalid syntax".to_string()),
        }
    }
}

fn negate(v: Value) -> Result<Value, String> {
    Ok(match v {
        Value::Int(i) => i
            .checked_neg()
            .map(Value::Int)
            .unwrap_or(Value::Float(-(i as f64))),
        Value::Float(f) => Value::Float(-f),
    })
}

fn add(a: Value, b: Value) -> Result<Value, String> {
    let value = match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_add(y)
            .map(Value::Int)
            .unwrap_or(Value::Float(x as f64 + y as f64)),
        _ => Value::Float(a.as_f64() + b.as_f64()),
    };
    value.finite()
}

fn sub(a: Value, b: Value) -> Result<Value, String> {
    let value = match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_sub(y)
            .map(Value::Int)
            .unwrap_or(Value::Float(x as f64 - y as f64)),
        _ => Value::Float(a.as_f64() - b.as_f64()),
    };
    value.finite()
}

fn mul(a: Value, b: Value) -> Result<Value, String> {
    let value = match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_mul(y)
            .map(Value::Int)
            .unwrap_or(Value::Float(x as f64 * y as f64)),
        _ => Value::Float(a.as_f64() * b.as_f64()),
    };
    value.finite()
}

fn div(a: Value, b: Value) -> Result<Value, String> {
    if b.as_f64() == 0.0 {
        return Err("division by zero".to_string());
    }
    Value::Float(a.as_f64() / b.as_f64()).finite()
}

fn floor_div(a: Value, b: Value) -> Result<Value, String> {
    if b.as_f64() == 0.0 {
        return Err("division by zero".to_string());
    }
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => match x.checked_div(y) {
            Some(q) if x % y != 0 && ((x < 0) != (y < 0)) => Ok(Value::Int(q - 1)),
            Some(q) => Ok(Value::Int(q)),
            None => Value::Float((x as f64 / y as f64).floor()).finite(),
        },
        _ => Value::Float((a.as_f64() / b.as_f64()).floor()).finite(),
    }
}

fn pow(base: Value, exponent: Value) -> Result<Value, String> {
    match (base, exponent) {
        (Value::Int(x), Value::Int(y)) if y >= 0 => {
            let checked = u32::try_from(y).ok().and_then(|e| x.checked_pow(e));
            match checked {
                Some(v) => Ok(Value::Int(v)),
                None => Value::Float((x as f64).powf(y as f64)).finite(),
            }
        }
        _ => {
            if base.as_f64() == 0.0 && exponent.as_f64() < 0.0 {
                return Err("zero cannot be raised to a negative power".to_string());
            }
            let value = base.as_f64().powf(exponent.as_f64());
            if value.is_nan() {
                return Err("result is not a real number".to_string());
            }
            Value::Float(value).finite()
        }
    }
}
