use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use super::base::{Skill, SkillArgs, SkillOutcome};

static TRIGGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:calculate|compute|计算|算一下)\s*[:：]?\s*(?P<expr>[0-9+\-*/%.()\s]+)").unwrap()
});
static BARE_EXPRESSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9+\-*/%.()\s]+$").unwrap());

/// Evaluates a restricted arithmetic expression, matching the original's
/// allowed character set (digits, `+-*/%()` and whitespace only).
pub struct CalculatorSkill;

impl Skill for CalculatorSkill {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "evaluates an arithmetic expression of +-*/%() and numbers"
    }

    fn detect(&self, text: &str) -> Option<SkillArgs> {
        if let Some(caps) = TRIGGER.captures(text) {
            return Some(SkillArgs {
                parameter: caps["expr"].trim().to_string(),
            });
        }
        let trimmed = text.trim();
        if BARE_EXPRESSION.is_match(trimmed) && trimmed.chars().any(|c| c.is_ascii_digit()) {
            return Some(SkillArgs {
                parameter: trimmed.to_string(),
            });
        }
        None
    }

    fn run(&self, args: SkillArgs, _work_dir: &Path) -> SkillOutcome {
        match eval_expression(&args.parameter) {
            Ok(value) => SkillOutcome {
                success: true,
                summary: format!("{} = {value}", args.parameter.trim()),
                data: json!({"expression": args.parameter, "result": value}),
            },
            Err(e) => SkillOutcome {
                success: false,
                summary: format!("could not evaluate '{}': {e}", args.parameter),
                data: json!({"expression": args.parameter, "error": e}),
            },
        }
    }
}

fn eval_expression(input: &str) -> Result<f64, String> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err("unexpected trailing input".to_string());
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
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
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let slice: String = chars[start..i].iter().collect();
                let n = slice
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{slice}'"))?;
                tokens.push(Token::Num(n));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn parse_expr(&mut self) -> Result<f64, String> {
        let mut value = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_term(&mut self) -> Result<f64, String> {
        let mut value = self.parse_factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.parse_factor()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.parse_factor()?;
                    if rhs == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= rhs;
                }
                Some(Token::Percent) => {
                    self.pos += 1;
                    let rhs = self.parse_factor()?;
                    if rhs == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value %= rhs;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_factor(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.parse_factor()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.parse_factor()
            }
            Some(Token::Num(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(n)
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let value = self.parse_expr()?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    _ => Err("expected closing parenthesis".to_string()),
                }
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_precedence_correctly() {
        assert_eq!(eval_expression("2 + 3 * 4").unwrap(), 14.0);
    }

    #[test]
    fn evaluates_parentheses() {
        assert_eq!(eval_expression("(2 + 3) * 4").unwrap(), 20.0);
    }

    #[test]
    fn rejects_division_by_zero() {
        assert!(eval_expression("1 / 0").is_err());
    }

    #[test]
    fn detect_matches_trigger_phrase() {
        let skill = CalculatorSkill;
        let args = skill.detect("calculate: 15 * 85").unwrap();
        assert_eq!(args.parameter.trim(), "15 * 85");
    }

    #[test]
    fn bare_expression_without_trigger_word_is_detected() {
        let skill = CalculatorSkill;
        assert!(skill.detect("100 * 25 + 50").is_some());
        assert!(skill.detect("refactor the parser module").is_none());
    }
}
