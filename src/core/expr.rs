// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! `OF` macro expression evaluation.
//!
//! An `OF(...)` operand is an infix expression over integer literals and
//! constant names with `+ - * /` and grouping parentheses. Evaluation is a
//! pure three-step pipeline: tokenize the parenthesized text, convert
//! infix to postfix with the shunting-yard algorithm, then fold the
//! postfix form over a constant environment.

use std::collections::HashMap;

/// Error returned from expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Number(i64),
    Name(String),
    Add,
    Sub,
    Mul,
    Div,
    Open,
    Close,
}

/// Evaluate an `OF` expression (outer parens included or not) against the
/// constant subset of the symbol table.
pub fn eval_of(expr: &str, env: &HashMap<String, i64>) -> Result<i64, EvalError> {
    let items = tokenize(expr)?;
    let postfix = to_postfix(&items);
    eval_postfix(&postfix, env)
}

fn tokenize(expr: &str) -> Result<Vec<Item>, EvalError> {
    let mut items = Vec::new();
    let bytes = expr.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        let ch = bytes[pos];
        pos += 1;
        match ch {
            b' ' | b'\t' => {}
            b'(' => items.push(Item::Open),
            b')' => items.push(Item::Close),
            b'+' => items.push(Item::Add),
            b'*' => items.push(Item::Mul),
            b'/' => items.push(Item::Div),
            b'-' => {
                // unary minus only in prefix position, as part of a literal
                let prefix = matches!(
                    items.last(),
                    None | Some(Item::Open | Item::Add | Item::Sub | Item::Mul | Item::Div)
                );
                if prefix && pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    let (n, next) = scan_number(bytes, pos)?;
                    items.push(Item::Number(-n));
                    pos = next;
                } else {
                    items.push(Item::Sub);
                }
            }
            _ if ch.is_ascii_digit() => {
                let (n, next) = scan_number(bytes, pos - 1)?;
                items.push(Item::Number(n));
                pos = next;
            }
            _ if ch.is_ascii_alphabetic() => {
                let mut name = String::from(ch as char);
                while pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() {
                    name.push(bytes[pos] as char);
                    pos += 1;
                }
                items.push(Item::Name(name));
            }
            _ => {
                return Err(EvalError::new(format!(
                    "unexpected character {:?} in expression",
                    ch as char
                )))
            }
        }
    }
    Ok(items)
}

fn scan_number(bytes: &[u8], start: usize) -> Result<(i64, usize), EvalError> {
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let text: String = bytes[start..end].iter().map(|&b| b as char).collect();
    let n = text
        .parse::<i64>()
        .map_err(|err| EvalError::new(format!("invalid number {text:?}: {err}")))?;
    Ok((n, end))
}

/// Lower value means tighter binding.
fn precedence(item: &Item) -> u8 {
    match item {
        Item::Mul | Item::Div => 1,
        Item::Add | Item::Sub => 2,
        _ => 10,
    }
}

fn to_postfix(items: &[Item]) -> Vec<Item> {
    let mut ops: Vec<Item> = Vec::new();
    let mut postfix: Vec<Item> = Vec::new();

    for item in items {
        match item {
            Item::Open => ops.push(Item::Open),
            Item::Close => {
                while ops.last().is_some_and(|top| *top != Item::Open) {
                    if let Some(op) = ops.pop() {
                        postfix.push(op);
                    }
                }
                ops.pop();
            }
            Item::Add | Item::Sub | Item::Mul | Item::Div => {
                // equal precedence pops: left-associative
                while ops.last().is_some_and(|top| precedence(item) >= precedence(top)) {
                    if let Some(op) = ops.pop() {
                        postfix.push(op);
                    }
                }
                ops.push(item.clone());
            }
            operand => postfix.push(operand.clone()),
        }
    }
    while let Some(op) = ops.pop() {
        postfix.push(op);
    }
    postfix
}

fn eval_postfix(postfix: &[Item], env: &HashMap<String, i64>) -> Result<i64, EvalError> {
    let mut stack: Vec<i64> = Vec::new();
    for item in postfix {
        match item {
            Item::Number(n) => stack.push(*n),
            Item::Name(name) => match env.get(name) {
                Some(value) => stack.push(*value),
                None => return Err(EvalError::new(format!("unknown name {name:?}"))),
            },
            Item::Add | Item::Sub | Item::Mul | Item::Div => {
                let b = stack
                    .pop()
                    .ok_or_else(|| EvalError::new("malformed expression"))?;
                let a = stack
                    .pop()
                    .ok_or_else(|| EvalError::new("malformed expression"))?;
                let value = match item {
                    Item::Add => a.wrapping_add(b),
                    Item::Sub => a.wrapping_sub(b),
                    Item::Mul => a.wrapping_mul(b),
                    _ => {
                        if b == 0 {
                            return Err(EvalError::new("division by zero"));
                        }
                        a / b
                    }
                };
                stack.push(value);
            }
            Item::Open | Item::Close => return Err(EvalError::new("malformed expression")),
        }
    }
    match (stack.pop(), stack.is_empty()) {
        (Some(value), true) => Ok(value),
        _ => Err(EvalError::new("malformed expression")),
    }
}
