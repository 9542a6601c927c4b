//! Built-in mock tools
//!
//! `web_search` echoes its query, `calculator` evaluates plain arithmetic and
//! any other name reports that it ran. None of them touch the outside world.
//! The two named-argument tools fail on non-object arguments.

use super::types::{ToolError, ToolOutput, ToolService};
use crate::engine::display_value;
use async_trait::async_trait;
use serde_json::Value;

/// Tool service with the built-in mock tools
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTools;

#[async_trait]
impl ToolService for BuiltinTools {
    async fn execute(&self, name: &str, args: &Value) -> Result<ToolOutput, ToolError> {
        tracing::debug!(tool = name, %args, "Executing built-in tool");

        if matches!(name, "web_search" | "calculator") && !args.is_object() {
            return Err(ToolError::failed(name, format!("expected object arguments, got {}", args)));
        }

        let result = match name {
            "web_search" => {
                let query = arg_text(args, "query");
                format!("模拟搜索结果：找到关于 \"{}\" 的信息。", query)
            }
            "calculator" => {
                let expression = arg_text(args, "expression");
                match evaluate(&expression) {
                    Some(value) => format!("模拟计算结果：{} = {}", expression, format_number(value)),
                    None => format!("模拟计算失败：无法计算 \"{}\"。", expression),
                }
            }
            other => format!("模拟工具 \"{}\" 已执行。", other),
        };

        Ok(ToolOutput::new(result))
    }
}

fn arg_text(args: &Value, key: &str) -> String {
    args.get(key).map(display_value).unwrap_or_default()
}

/// Evaluate `+ - * / ( )` arithmetic over decimal numbers
///
/// Returns `None` for malformed input, nesting deeper than [`MAX_DEPTH`],
/// or a non-finite result.
pub fn evaluate(expression: &str) -> Option<f64> {
    let mut parser = Parser {
        chars: expression.chars().filter(|c| !c.is_whitespace()).collect(),
        pos: 0,
        depth: 0,
    };
    if parser.chars.is_empty() {
        return None;
    }
    let value = parser.expr()?;
    if parser.pos != parser.chars.len() || !value.is_finite() {
        return None;
    }
    Some(value)
}

/// Integral values print without a fractional part
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Limit on nested signs and parentheses
pub const MAX_DEPTH: usize = 256;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Some(value)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == '*' { value * rhs } else { value / rhs };
        }
        Some(value)
    }

    // factor := '-' factor | '+' factor | '(' expr ')' | number
    fn factor(&mut self) -> Option<f64> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;
        let value = self.unary();
        self.depth -= 1;
        value
    }

    fn unary(&mut self) -> Option<f64> {
        match self.peek()? {
            '-' => {
                self.pos += 1;
                Some(-self.factor()?)
            }
            '+' => {
                self.pos += 1;
                self.factor()
            }
            '(' => {
                self.pos += 1;
                let value = self.expr()?;
                (self.bump()? == ')').then_some(value)
            }
            _ => self.number(),
        }
    }

    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal.parse().ok()
    }
}
