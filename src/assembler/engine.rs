// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The emission engine: a single forward pass over the AST, then back-fill.
//!
//! Each node either appends words to core at `PC` or updates metadata
//! (symbols, subroutine bookkeeping) without emitting. Operand name
//! resolution is eager when the symbol is already known and otherwise
//! records a back-fill entry; the back-fill pass patches every recorded
//! operand once emission is complete. Core address 0 is reserved for the
//! initial branch to `BEGIN` and holds `HALT` until that label resolves.

use crate::core::ast::{Node, ParamKind, Parameter};
use crate::core::error::{Diagnostic, Error};
use crate::core::expr::eval_of;
use crate::core::op::Opcode;
use crate::core::symbol_table::{SymbolKind, SymbolTable};
use crate::vm::{Image, ReservedRegisters, Word};

/// Implementation constants seeded before the pass: word lengths, and the
/// character codes LOWL programs name instead of quoting.
const SEED_CONSTANTS: &[(&str, i64)] = &[
    ("LCH", crate::vm::LCH),
    ("LNM", crate::vm::LNM),
    ("LICH", 1),
    ("NLREP", b'\n' as i64),
    ("QUTREP", b'"' as i64),
    ("SPREP", b' ' as i64),
    ("TABREP", b'\t' as i64),
];

/// An assembled program plus everything the listing emitter wants.
#[derive(Debug)]
pub struct Program {
    pub image: Image,
    pub symbols: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn assemble(nodes: &[Node]) -> Result<Program, Error> {
    let mut asm = Assembler::new()?;
    for node in nodes {
        asm.emit_node(node)?;
    }
    asm.finish()
}

struct Subroutine {
    name: String,
    exits: i64,
}

struct Assembler {
    symbols: SymbolTable,
    core: Vec<Word>,
    reserved: ReservedRegisters,
    diagnostics: Vec<Diagnostic>,
    jump_slot: i64,
    current_subr: Option<Subroutine>,
    saw_prgst: bool,
    saw_prgen: bool,
}

/// A numeric operand: resolved now, or patched later by name.
enum NOf {
    Value(i64),
    Backfill(String),
}

/// A node parameter with the `OF` macro pair already folded together.
#[derive(Clone, Copy)]
enum Operand<'a> {
    Number(i64),
    Name(&'a str),
    LabelName(&'a str),
    Quoted(&'a str),
    Of(&'a str),
}

impl Assembler {
    fn new() -> Result<Self, Error> {
        let mut symbols = SymbolTable::new();
        for &(name, value) in SEED_CONSTANTS {
            symbols.define_constant(name, 0, value).map_err(|err| {
                Error::Assemble {
                    line: 0,
                    message: err.to_string(),
                }
            })?;
        }
        Ok(Self {
            symbols,
            // address 0 is the boot word; HALT until BEGIN resolves
            core: vec![Word::new(Opcode::Halt)],
            reserved: ReservedRegisters::default(),
            diagnostics: Vec::new(),
            jump_slot: 0,
            current_subr: None,
            saw_prgst: false,
            saw_prgen: false,
        })
    }

    fn pc(&self) -> usize {
        self.core.len()
    }

    fn emit(&mut self, node: &Node, mut word: Word) {
        word.line = node.line;
        self.core.push(word);
    }

    fn emit_node(&mut self, node: &Node) -> Result<(), Error> {
        let operands = self.operands(node)?;
        match node.op {
            // no operand
            Opcode::Align => {
                // no code, no alignment: every word is one word wide
                self.want(node, &operands, 0)?;
            }
            Opcode::Bmove
            | Opcode::Bstk
            | Opcode::Cfstk
            | Opcode::Css
            | Opcode::Fmove
            | Opcode::Fstk
            | Opcode::Noop => {
                self.want(node, &operands, 0)?;
                self.emit(node, Word::new(node.op));
            }

            // literal, constant name, or OF(...)
            Opcode::Aal
            | Opcode::Cal
            | Opcode::Lal
            | Opcode::Lam
            | Opcode::Lcm
            | Opcode::Multl
            | Opcode::Sal
            | Opcode::Sbl => {
                self.want(node, &operands, 1)?;
                let n = self.n_of(node, &operands[0])?;
                self.emit_n_of(node, node.op, n);
            }
            Opcode::Con => self.emit_con(node, &operands)?,

            // constant name or number
            Opcode::Andl | Opcode::Ccn | Opcode::Lcn | Opcode::Nch => {
                self.want(node, &operands, 1)?;
                let n = match &operands[0] {
                    Operand::Number(n) => NOf::Value(*n),
                    Operand::Name(name) => self.name_n_of(name),
                    _ => return Err(self.err(node, "want constant name or number")),
                };
                self.emit_n_of(node, node.op, n);
            }

            // variable name
            Opcode::Aav
            | Opcode::Abv
            | Opcode::Andv
            | Opcode::Cci
            | Opcode::Clear
            | Opcode::Lbv
            | Opcode::Sav
            | Opcode::Sbv
            | Opcode::Unstk => {
                self.want(node, &operands, 1)?;
                let value = self.variable(node, &operands[0])?;
                self.emit(node, Word::with_value(node.op, value));
            }

            // variable name plus a trailing flag
            Opcode::Cai | Opcode::Cav => self.emit_flagged(node, &operands, &["A", "X"])?,
            Opcode::Lai | Opcode::Lav | Opcode::Lci => {
                self.emit_flagged(node, &operands, &["R", "X"])?
            }
            Opcode::Sti | Opcode::Stv => self.emit_flagged(node, &operands, &["P", "X"])?,
            Opcode::Laa => self.emit_flagged(node, &operands, &["C", "D"])?,

            Opcode::Bump => {
                self.want(node, &operands, 2)?;
                let value = self.variable(node, &operands[0])?;
                let increment = match self.n_of(node, &operands[1])? {
                    NOf::Value(n) => n,
                    NOf::Backfill(name) => {
                        return Err(self.err(node, format!("unknown constant {name:?}")))
                    }
                };
                self.emit(
                    node,
                    Word {
                        op: Opcode::Bump,
                        value,
                        value2: increment,
                        text: None,
                        line: 0,
                    },
                );
            }

            // branches: label, distance, (E|X), (C|T|X)
            Opcode::Go
            | Opcode::Goeq
            | Opcode::Goge
            | Opcode::Gogr
            | Opcode::Gole
            | Opcode::Golt
            | Opcode::Gond
            | Opcode::Gone
            | Opcode::Gopc => self.emit_branch(node, &operands)?,

            Opcode::Goadd => {
                self.want(node, &operands, 1)?;
                let value = self.variable(node, &operands[0])?;
                self.jump_slot = 0;
                self.emit(node, Word::with_value(Opcode::Goadd, value));
            }
            Opcode::Gosub => self.emit_gosub(node, &operands)?,
            Opcode::Exit => self.emit_exit(node, &operands)?,
            Opcode::Subr => self.emit_subr(node, &operands)?,

            Opcode::Dcl => {
                self.want(node, &operands, 1)?;
                let name = self.name(node, &operands[0])?;
                self.define_address(node, name)?;
                self.reserved.record(name, self.pc());
                self.emit(node, Word::new(Opcode::Con));
            }
            Opcode::Equ => {
                self.want(node, &operands, 2)?;
                let alias = self.name(node, &operands[0])?.to_string();
                let target = self.name(node, &operands[1])?;
                self.symbols
                    .define_alias(&alias, node.line, target)
                    .map_err(|err| self.err(node, err.to_string()))?;
            }
            Opcode::Ident => {
                self.want(node, &operands, 2)?;
                let name = self.name(node, &operands[0])?.to_string();
                let value = match operands[1] {
                    Operand::Number(n) => n,
                    _ => return Err(self.err(node, "want decimal integer")),
                };
                self.symbols
                    .define_constant(&name, node.line, value)
                    .map_err(|err| self.err(node, err.to_string()))?;
            }
            Opcode::Mdlabel => {
                self.want(node, &operands, 1)?;
                let name = self.name(node, &operands[0])?;
                self.define_address(node, name)?;
            }

            Opcode::Nb => {} // comment; emits nothing
            Opcode::Prgst => {
                self.want(node, &operands, 1)?;
                let Operand::Quoted(_) = operands[0] else {
                    return Err(self.err(node, "want quoted program name"));
                };
                self.saw_prgst = true;
            }
            Opcode::Prgen => {
                self.want(node, &operands, 0)?;
                self.saw_prgen = true;
                self.emit(node, Word::new(Opcode::Halt));
            }

            Opcode::Mess => {
                let text = self.quoted(node, &operands)?.replace('$', "\n");
                self.emit(
                    node,
                    Word {
                        op: Opcode::Mess,
                        value: 0,
                        value2: 0,
                        text: Some(text),
                        line: 0,
                    },
                );
            }
            Opcode::Ccl => {
                let text = self.quoted(node, &operands)?.replace('$', "\n");
                let mut bytes = text.bytes();
                let (Some(ch), None) = (bytes.next(), bytes.next()) else {
                    return Err(self.err(node, "want a single character"));
                };
                self.emit(node, Word::with_value(Opcode::Ccl, i64::from(ch)));
            }
            Opcode::Str => {
                let text = self.quoted(node, &operands)?.replace('$', "\n");
                for ch in text.bytes() {
                    self.emit(node, Word::with_value(Opcode::Str, i64::from(ch)));
                }
            }

            // never produced by the front end
            _ => return Err(self.err(node, "internal opcode in source")),
        }
        Ok(())
    }

    fn emit_con(&mut self, node: &Node, operands: &[Operand]) -> Result<(), Error> {
        // a rewritten "[NAME] CON n" carries the label as its first operand
        let value_operand = match operands {
            [Operand::LabelName(name), value] => {
                let name = name.to_string();
                self.define_address(node, &name)?;
                value
            }
            [value] => value,
            _ => return Err(self.err(node, format!("want 1 arg: got {}", operands.len()))),
        };
        let n = self.n_of(node, value_operand)?;
        self.emit_n_of(node, Opcode::Con, n);
        Ok(())
    }

    fn emit_flagged(
        &mut self,
        node: &Node,
        operands: &[Operand],
        allowed: &[&str],
    ) -> Result<(), Error> {
        self.want(node, operands, 2)?;
        self.flag(node, &operands[1], allowed)?;
        let value = self.variable(node, &operands[0])?;
        self.emit(node, Word::with_value(node.op, value));
        Ok(())
    }

    fn emit_branch(&mut self, node: &Node, operands: &[Operand]) -> Result<(), Error> {
        self.want(node, operands, 4)?;
        let Operand::Number(_) = operands[1] else {
            return Err(self.err(node, "distance wants an integer"));
        };
        self.flag(node, &operands[2], &["E", "X"])?;
        let table = self.flag(node, &operands[3], &["C", "T", "X"])?;
        let (op, value2) = match table {
            "T" => {
                let slot = self.jump_slot;
                self.jump_slot += 1;
                (Opcode::Gotbl, slot)
            }
            "C" => {
                self.jump_slot += 1;
                (Opcode::Gotbl, self.jump_slot)
            }
            _ => {
                self.jump_slot = 0;
                (node.op, 0)
            }
        };
        let value = self.variable(node, &operands[0])?;
        self.emit(
            node,
            Word {
                op,
                value,
                value2,
                text: None,
                line: 0,
            },
        );
        Ok(())
    }

    fn emit_gosub(&mut self, node: &Node, operands: &[Operand]) -> Result<(), Error> {
        self.want(node, operands, 2)?;
        let name = self.name(node, &operands[0])?.to_string();
        match operands[1] {
            Operand::Name("X") => {
                // X marks a routine supplied by the machine itself
                let op = match name.as_str() {
                    "MDERCH" => Opcode::Mderch,
                    "MDQUIT" => Opcode::Mdquit,
                    _ => return Err(self.err(node, format!("unknown MD routine {name:?}"))),
                };
                self.emit(node, Word::new(op));
            }
            Operand::Number(_) => {
                let value = self.variable(node, &operands[0])?;
                self.jump_slot = 0;
                self.emit(node, Word::with_value(Opcode::Gosub, value));
            }
            _ => return Err(self.err(node, "want distance or X")),
        }
        Ok(())
    }

    fn emit_exit(&mut self, node: &Node, operands: &[Operand]) -> Result<(), Error> {
        self.want(node, operands, 2)?;
        let Operand::Number(n) = operands[0] else {
            return Err(self.err(node, "exit index wants an integer"));
        };
        let name = self.name(node, &operands[1])?;
        let Some(subr) = &self.current_subr else {
            return Err(self.err(node, "EXIT outside a subroutine"));
        };
        if subr.name != name {
            return Err(self.err(
                node,
                format!("exit names {name:?} but the current subroutine is {:?}", subr.name),
            ));
        }
        if n < 1 || n > subr.exits {
            return Err(self.err(
                node,
                format!("exit index {n} out of range 1..={}", subr.exits),
            ));
        }
        self.emit(node, Word::with_value(Opcode::Exit, n));
        Ok(())
    }

    fn emit_subr(&mut self, node: &Node, operands: &[Operand]) -> Result<(), Error> {
        self.want(node, operands, 3)?;
        let name = self.name(node, &operands[0])?.to_string();
        let exits = match operands[2] {
            Operand::Number(n) if n >= 0 => {
                if n == 0 {
                    1
                } else {
                    n
                }
            }
            _ => return Err(self.err(node, "exit count wants a non-negative integer")),
        };
        self.define_address(node, &name)?;
        match self.name(node, &operands[1])? {
            // entry stores register A into the named parameter
            "PARNM" => {
                let parameter = Operand::Name("PARNM");
                let value = self.variable(node, &parameter)?;
                self.emit(node, Word::with_value(Opcode::Stv, value));
            }
            "X" => self.emit(node, Word::new(Opcode::Noop)),
            other => return Err(self.err(node, format!("unknown flag {other:?}"))),
        }
        self.current_subr = Some(Subroutine { name, exits });
        Ok(())
    }

    fn finish(mut self) -> Result<Program, Error> {
        if !self.saw_prgst {
            return Err(Error::Assemble {
                line: 0,
                message: "missing PRGST".to_string(),
            });
        }
        if !self.saw_prgen {
            return Err(Error::Assemble {
                line: 0,
                message: "missing PRGEN".to_string(),
            });
        }

        let undefined = self.symbols.undefined();
        if !undefined.is_empty() {
            let names: Vec<&str> = undefined.iter().map(|sym| sym.name.as_str()).collect();
            let line = undefined.iter().map(|sym| sym.line).max().unwrap_or(0);
            return Err(Error::Assemble {
                line,
                message: format!("undefined symbols: {}", names.join(", ")),
            });
        }

        // back-fill: patch every recorded reference, in insertion order
        let patches: Vec<(i64, Vec<usize>)> = self
            .symbols
            .entries()
            .iter()
            .filter(|sym| !sym.backfill.is_empty())
            .filter_map(|sym| {
                let value = self.symbols.resolved_value(&sym.name)?;
                Some((value, sym.backfill.clone()))
            })
            .collect();
        for (value, addresses) in patches {
            for addr in addresses {
                self.core[addr].value = value;
            }
        }

        // the first executable statement is labelled BEGIN
        match self.symbols.lookup("BEGIN").map(|sym| (&sym.kind, sym.line)) {
            Some((&SymbolKind::Address(addr), line)) => {
                self.core[0] = Word {
                    op: Opcode::Go,
                    value: addr,
                    value2: 0,
                    text: None,
                    line,
                };
            }
            _ => self
                .diagnostics
                .push(Diagnostic::warning(0, "missing BEGIN; machine halts at once")),
        }

        let end = self.core.len();
        Ok(Program {
            image: Image {
                core: self.core,
                end,
                reserved: self.reserved,
            },
            symbols: self.symbols,
            diagnostics: self.diagnostics,
        })
    }

    // operand plumbing

    /// Fold the raw parameter list, pairing each `OF` macro with the
    /// expression that follows it.
    fn operands<'n>(&self, node: &'n Node) -> Result<Vec<Operand<'n>>, Error> {
        let mut operands = Vec::with_capacity(node.params.len());
        let mut params = node.params.iter().peekable();
        while let Some(param) = params.next() {
            match &param.kind {
                ParamKind::Number(n) => operands.push(Operand::Number(*n)),
                ParamKind::Variable(name) => operands.push(Operand::Name(name)),
                ParamKind::Label(name) => operands.push(Operand::LabelName(name)),
                ParamKind::QuotedText(text) => operands.push(Operand::Quoted(text)),
                ParamKind::Macro(name) => {
                    let next: Option<&Parameter> = params.peek().copied();
                    match next.map(|p| &p.kind) {
                        Some(ParamKind::Expression(expr)) => {
                            params.next();
                            operands.push(Operand::Of(expr));
                        }
                        _ => {
                            return Err(
                                self.err(node, format!("{name} macro wants an expression"))
                            )
                        }
                    }
                }
                ParamKind::Expression(_) => {
                    return Err(self.err(node, "expression without a macro"))
                }
            }
        }
        Ok(operands)
    }

    fn want(&self, node: &Node, operands: &[Operand], count: usize) -> Result<(), Error> {
        if operands.len() != count {
            return Err(self.err(
                node,
                format!("want {count} args: got {}", operands.len()),
            ));
        }
        Ok(())
    }

    fn n_of(&self, node: &Node, operand: &Operand) -> Result<NOf, Error> {
        match operand {
            Operand::Number(n) => Ok(NOf::Value(*n)),
            Operand::Name(name) => Ok(self.name_n_of(name)),
            Operand::Of(expr) => {
                let env = self.symbols.environment();
                let value = eval_of(expr, &env).map_err(|err| self.err(node, err.to_string()))?;
                Ok(NOf::Value(value))
            }
            _ => Err(self.err(node, "want literal, constant name, or OF(...)")),
        }
    }

    fn name_n_of(&self, name: &str) -> NOf {
        match self.symbols.resolved_value(name) {
            Some(value) => NOf::Value(value),
            None => NOf::Backfill(name.to_string()),
        }
    }

    fn emit_n_of(&mut self, node: &Node, op: Opcode, n: NOf) {
        let value = match n {
            NOf::Value(value) => value,
            NOf::Backfill(name) => {
                self.symbols.add_reference(&name, self.pc());
                0
            }
        };
        self.emit(node, Word::with_value(op, value));
    }

    /// Resolve a variable/label operand to its address, or record a
    /// back-fill entry at the word about to be emitted.
    fn variable(&mut self, node: &Node, operand: &Operand) -> Result<i64, Error> {
        let name = self.name(node, operand)?;
        match self.symbols.resolved_value(name) {
            Some(value) => Ok(value),
            None => {
                let name = name.to_string();
                self.symbols.add_reference(&name, self.pc());
                Ok(0)
            }
        }
    }

    fn name<'o>(&self, node: &Node, operand: &Operand<'o>) -> Result<&'o str, Error> {
        match *operand {
            Operand::Name(name) | Operand::LabelName(name) => Ok(name),
            _ => Err(self.err(node, "want a name")),
        }
    }

    fn flag<'o>(
        &self,
        node: &Node,
        operand: &Operand<'o>,
        allowed: &[&str],
    ) -> Result<&'o str, Error> {
        let name = match *operand {
            Operand::Name(name) => name,
            _ => {
                return Err(self.err(
                    node,
                    format!("flag wants one of {}", allowed.join("|")),
                ))
            }
        };
        if !allowed.contains(&name) {
            return Err(self.err(
                node,
                format!("unknown flag {name:?}: want {}", allowed.join("|")),
            ));
        }
        Ok(name)
    }

    fn quoted<'o>(&self, node: &Node, operands: &'o [Operand]) -> Result<&'o str, Error> {
        match operands {
            [Operand::Quoted(text)] => Ok(text),
            _ => Err(self.err(node, "want quoted text")),
        }
    }

    fn define_address(&mut self, node: &Node, name: &str) -> Result<(), Error> {
        self.symbols
            .define_address(name, node.line, self.pc() as i64)
            .map_err(|err| self.err(node, err.to_string()))
    }

    fn err(&self, node: &Node, message: impl Into<String>) -> Error {
        Error::Assemble {
            line: node.line,
            message: format!("{}: {}", node.op, message.into()),
        }
    }
}
