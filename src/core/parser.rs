// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Concrete-syntax pass: tokens to flat line records.
//!
//! A record is a label placement, an opcode with its parameter list, or an
//! error. Commas between parameters are discarded. A statement is flushed
//! by end-of-line; an opcode or label arriving while a statement is still
//! open closes it as a "missing newline" error record.

use crate::scanner::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Expression(String),
    Macro(String),
    Number(i64),
    QuotedText(String),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub line: u32,
    pub col: u32,
    pub kind: ParamKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Label {
        line: u32,
        col: u32,
        name: String,
    },
    Statement {
        line: u32,
        col: u32,
        op: crate::core::op::Opcode,
        params: Vec<Param>,
    },
    Error {
        line: u32,
        col: u32,
        message: String,
    },
}

pub fn parse(tokens: &[Token]) -> Vec<Record> {
    let mut records = Vec::new();
    let mut open: Option<Record> = None;

    for tok in tokens {
        match &tok.kind {
            TokenKind::EndOfLine => {
                if let Some(stmt) = open.take() {
                    records.push(stmt);
                }
            }
            TokenKind::EndOfInput => {
                if let Some(stmt) = open.take() {
                    records.push(stmt);
                }
                break;
            }
            TokenKind::Error(msg) => {
                if let Some(stmt) = open.take() {
                    records.push(stmt);
                }
                records.push(Record::Error {
                    line: tok.line,
                    col: tok.col,
                    message: msg.clone(),
                });
            }
            TokenKind::Label(name) => {
                if let Some(stmt) = open.take() {
                    records.push(close_as_missing_newline(stmt));
                }
                records.push(Record::Label {
                    line: tok.line,
                    col: tok.col,
                    name: name.clone(),
                });
            }
            TokenKind::Op(code) => {
                if let Some(stmt) = open.take() {
                    records.push(close_as_missing_newline(stmt));
                }
                open = Some(Record::Statement {
                    line: tok.line,
                    col: tok.col,
                    op: *code,
                    params: Vec::new(),
                });
            }
            TokenKind::Comma => {}
            TokenKind::Expression(text) => {
                push_param(&mut records, &mut open, tok, ParamKind::Expression(text.clone()))
            }
            TokenKind::Macro(name) => {
                push_param(&mut records, &mut open, tok, ParamKind::Macro(name.clone()))
            }
            TokenKind::Number(n) => {
                push_param(&mut records, &mut open, tok, ParamKind::Number(*n))
            }
            TokenKind::QuotedText(text) => {
                push_param(&mut records, &mut open, tok, ParamKind::QuotedText(text.clone()))
            }
            TokenKind::Variable(name) => {
                push_param(&mut records, &mut open, tok, ParamKind::Variable(name.clone()))
            }
        }
    }
    records
}

fn push_param(records: &mut Vec<Record>, open: &mut Option<Record>, tok: &Token, kind: ParamKind) {
    match open {
        Some(Record::Statement { params, .. }) => params.push(Param {
            line: tok.line,
            col: tok.col,
            kind,
        }),
        _ => records.push(Record::Error {
            line: tok.line,
            col: tok.col,
            message: format!("unexpected parameter {tok}"),
        }),
    }
}

fn close_as_missing_newline(stmt: Record) -> Record {
    match stmt {
        Record::Statement { line, col, op, .. } => Record::Error {
            line,
            col,
            message: format!("{op}: missing newline"),
        },
        other => other,
    }
}
