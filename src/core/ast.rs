// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Typed instruction nodes built from line records.
//!
//! Label placements become synthetic `MDLABEL` nodes. A label immediately
//! followed by `CON n` collapses into a single `CON` node carrying
//! (label, n); that is the only syntactic rewrite.

use crate::core::error::Error;
use crate::core::op::Opcode;
use crate::core::parser::{ParamKind as CstParamKind, Record};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Expression(String),
    Label(String),
    Macro(String),
    Number(i64),
    QuotedText(String),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub line: u32,
    pub col: u32,
    pub kind: ParamKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub line: u32,
    pub col: u32,
    pub op: Opcode,
    pub params: Vec<Parameter>,
}

pub fn build(records: &[Record]) -> Result<Vec<Node>, Error> {
    let mut nodes: Vec<Node> = Vec::new();
    for record in records {
        match record {
            Record::Error { line, col, message } => {
                return Err(Error::Parse {
                    line: *line,
                    col: *col,
                    message: message.clone(),
                })
            }
            Record::Label { line, col, name } => nodes.push(Node {
                line: *line,
                col: *col,
                op: Opcode::Mdlabel,
                params: vec![Parameter {
                    line: *line,
                    col: *col,
                    kind: ParamKind::Label(name.clone()),
                }],
            }),
            Record::Statement {
                line,
                col,
                op,
                params,
            } => {
                let params: Vec<Parameter> = params
                    .iter()
                    .map(|p| Parameter {
                        line: p.line,
                        col: p.col,
                        kind: match &p.kind {
                            CstParamKind::Expression(text) => ParamKind::Expression(text.clone()),
                            CstParamKind::Macro(name) => ParamKind::Macro(name.clone()),
                            CstParamKind::Number(n) => ParamKind::Number(*n),
                            CstParamKind::QuotedText(text) => ParamKind::QuotedText(text.clone()),
                            CstParamKind::Variable(name) => ParamKind::Variable(name.clone()),
                        },
                    })
                    .collect();

                // [NAME] CON n folds into the pending MDLABEL node.
                if *op == Opcode::Con {
                    if let Some(prior) = nodes.last_mut() {
                        if prior.op == Opcode::Mdlabel {
                            prior.op = Opcode::Con;
                            prior.params.extend(params);
                            continue;
                        }
                    }
                }

                nodes.push(Node {
                    line: *line,
                    col: *col,
                    op: *op,
                    params,
                });
            }
        }
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::{build, Node, ParamKind};
    use crate::core::op::Opcode;
    use crate::core::parser::parse;
    use crate::scanner::Scanner;

    fn nodes(src: &str) -> Vec<Node> {
        build(&parse(&Scanner::tokens(src.as_bytes()))).expect("build")
    }

    #[test]
    fn label_becomes_mdlabel_node() {
        let ns = nodes("[BEGIN]\n");
        assert_eq!(ns[0].op, Opcode::Mdlabel);
        assert_eq!(ns[0].params[0].kind, ParamKind::Label("BEGIN".to_string()));
    }

    #[test]
    fn labelled_con_is_rewritten() {
        let ns = nodes("[TBL] CON 7\n");
        assert_eq!(ns.len(), 1);
        assert_eq!(ns[0].op, Opcode::Con);
        assert_eq!(ns[0].params[0].kind, ParamKind::Label("TBL".to_string()));
        assert_eq!(ns[0].params[1].kind, ParamKind::Number(7));
    }

    #[test]
    fn bare_con_is_kept() {
        let ns = nodes("LAL 1\nCON 7\n");
        assert_eq!(ns[1].op, Opcode::Con);
        assert_eq!(ns[1].params[0].kind, ParamKind::Number(7));
    }

    #[test]
    fn macro_and_expression_parameters_survive() {
        let ns = nodes("AAL OF(2*LNM-LCH)\n");
        assert_eq!(ns[0].op, Opcode::Aal);
        assert_eq!(ns[0].params[0].kind, ParamKind::Macro("OF".to_string()));
        assert_eq!(
            ns[0].params[1].kind,
            ParamKind::Expression("(2*LNM-LCH)".to_string())
        );
    }

    #[test]
    fn error_record_aborts_the_build() {
        let records = parse(&Scanner::tokens(b"MESS 'oops\n"));
        assert!(build(&records).is_err());
    }
}
