//! Small utilities: arithmetic, passwords and the clock.

use super::{OsError, OsResult};
use rand::Rng;
use serde::Serialize;

pub const CALCULATOR_ALPHABET: &str = "0123456789+-*/(). ";
const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";
const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct CurrentTime {
    pub date: String,
    pub time: String,
    pub weekday: String,
    pub utc_offset: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Power,
    Slash,
    FloorDiv,
    LParen,
    RParen,
}

fn lex(expression: &str) -> OsResult<Vec<Token>> {
    if let Some(bad) = expression.chars().find(|c| !CALCULATOR_ALPHABET.contains(*c)) {
        return Err(OsError::InvalidArgument(format!(
            "Invalid character '{}' in expression. Allowed: {}",
            bad,
            CALCULATOR_ALPHABET.trim_end()
        )));
    }

    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let two = chars.get(i + 1).copied();
        let token = match c {
            ' ' => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| OsError::InvalidArgument(format!("bad number '{}'", literal)))?;
                tokens.push(Token::Number(value));
                continue;
            }
            '*' if two == Some('*') => {
                i += 1;
                Token::Power
            }
            '/' if two == Some('/') => {
                i += 1;
                Token::FloorDiv
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => {
                return Err(OsError::InvalidArgument(format!(
                    "unexpected '{}'",
                    other
                )))
            }
        };
        tokens.push(token);
        i += 1;
    }
    Ok(tokens)
}

/// Recursive descent over
/// `expr := term (('+'|'-') term)*`,
/// `term := unary (('*'|'/'|'//') unary)*`,
/// `unary := ('+'|'-') unary | power`,
/// `power := atom ('**' unary)?`.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> OsResult<f64> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> OsResult<f64> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::FloorDiv)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                _ if rhs == 0.0 => {
                    return Err(OsError::InvalidArgument("division by zero".to_string()))
                }
                Token::Slash => value / rhs,
                _ => (value / rhs).floor(),
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> OsResult<f64> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.nested(|p| p.unary()).map(|v| -v)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(|p| p.unary())
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> OsResult<f64> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Power) {
            self.pos += 1;
            let exponent = self.nested(|p| p.unary())?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> OsResult<f64> {
        match self.bump() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.nested(|p| p.expr())?;
                match self.bump() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(OsError::InvalidArgument("missing ')'".to_string())),
                }
            }
            Some(other) => Err(OsError::InvalidArgument(format!(
                "unexpected {:?}",
                other
            ))),
            None => Err(OsError::InvalidArgument(
                "unexpected end of expression".to_string(),
            )),
        }
    }

    fn nested<F>(&mut self, f: F) -> OsResult<f64>
    where
        F: FnOnce(&mut Self) -> OsResult<f64>,
    {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(OsError::InvalidArgument("expression nested too deeply".to_string()));
        }
        let value = f(self);
        self.depth -= 1;
        value
    }
}

/// Evaluate an arithmetic expression over `+ - * / // **` and parentheses.
pub fn evaluate(expression: &str) -> OsResult<f64> {
    let tokens = lex(expression)?;
    if tokens.is_empty() {
        return Err(OsError::InvalidArgument("empty expression".to_string()));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(OsError::InvalidArgument(format!(
            "unexpected {:?}",
            parser.tokens[parser.pos]
        )));
    }
    if !value.is_finite() {
        return Err(OsError::InvalidArgument("result is not finite".to_string()));
    }
    Ok(value)
}

/// Integral values print without a fraction.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

pub fn calculate(expression: &str) -> OsResult<String> {
    evaluate(expression).map(format_number)
}

pub const MAX_PASSWORD_LENGTH: usize = 4096;

/// Random password over letters, digits and punctuation from the OS RNG.
pub fn generate_password(length: usize) -> OsResult<String> {
    if length == 0 || length > MAX_PASSWORD_LENGTH {
        return Err(OsError::InvalidArgument(format!(
            "password length must be between 1 and {}",
            MAX_PASSWORD_LENGTH
        )));
    }
    let mut rng = rand::rngs::OsRng;
    Ok((0..length)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect())
}

pub fn current_time() -> CurrentTime {
    let now = chrono::Local::now();
    CurrentTime {
        date: now.format("%Y-%m-%d").to_string(),
        time: now.format("%H:%M:%S").to_string(),
        weekday: now.format("%A").to_string(),
        utc_offset: now.format("%:z").to_string(),
        timestamp: now.timestamp(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(calculate("2 + 2 * 2").unwrap(), "6");
        assert_eq!(calculate("(2 + 2) * 2").unwrap(), "8");
        assert_eq!(calculate("7 / 2").unwrap(), "3.5");
        assert_eq!(calculate("7 // 2").unwrap(), "3");
    }

    #[test]
    fn test_unary_and_power() {
        assert_eq!(calculate("-3 + 5").unwrap(), "2");
        assert_eq!(calculate("2 ** 10").unwrap(), "1024");
        assert_eq!(calculate("2 ** 3 ** 2").unwrap(), "512");
        assert_eq!(calculate("-2 ** 2").unwrap(), "-4");
        assert_eq!(calculate("--4").unwrap(), "4");
    }

    #[test]
    fn test_errors() {
        assert!(calculate("1 / 0").unwrap_err().to_string().contains("division by zero"));
        assert!(calculate("import os").unwrap_err().to_string().contains("Invalid character"));
        assert!(calculate("(1 + 2").is_err());
        assert!(calculate("1 +").is_err());
        assert!(calculate("").is_err());
        assert!(calculate("1 2").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let expression = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(calculate(&expression).is_err());
    }

    #[test]
    fn test_password() {
        let password = generate_password(32).unwrap();
        assert_eq!(password.chars().count(), 32);
        assert!(password.bytes().all(|b| PASSWORD_ALPHABET.contains(&b)));
        assert!(generate_password(0).is_err());
        assert_eq!(generate_password(MAX_PASSWORD_LENGTH).unwrap().len(), MAX_PASSWORD_LENGTH);
        assert!(generate_password(MAX_PASSWORD_LENGTH + 1).is_err());
        assert!(generate_password(usize::MAX).is_err());
    }
}
