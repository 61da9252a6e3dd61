// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Listing file generation.
//!
//! Three parts: a disassembled core dump with label annotations, a sorted
//! symbol dump, and the recorded message texts. Side outputs only; nothing
//! downstream consumes them.

use std::io::Write;

use crate::core::symbol_table::{SymbolKind, SymbolTable};

use super::engine::Program;

/// Writer for listing output.
pub struct ListingWriter<W: Write> {
    out: W,
}

impl<W: Write> ListingWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_program(&mut self, program: &Program) -> std::io::Result<()> {
        self.write_core(program)?;
        self.write_symbols(&program.symbols)?;
        self.write_messages(program)?;
        Ok(())
    }

    pub fn write_core(&mut self, program: &Program) -> std::io::Result<()> {
        writeln!(self.out, "LINE    PC  CODE        VALUE  VALUE2")?;
        writeln!(self.out, "----  ----  --------  -------  ------")?;

        for (pc, word) in program.image.core[..program.image.end].iter().enumerate() {
            for label in labels_at(&program.symbols, pc) {
                writeln!(self.out, "{:>4}  {pc:>4}  [{label}]", word.line)?;
            }
            write!(
                self.out,
                "{:>4}  {pc:>4}  {:<8}  {:>7}  {:>6}",
                word.line,
                word.op.mnemonic(),
                word.value,
                word.value2
            )?;
            match &word.text {
                Some(text) => writeln!(self.out, "  ;; {text:?}")?,
                None => writeln!(self.out)?,
            }
        }
        Ok(())
    }

    pub fn write_symbols(&mut self, symbols: &SymbolTable) -> std::io::Result<()> {
        let mut entries: Vec<_> = symbols.entries().iter().collect();
        entries.sort_by(|left, right| left.name.cmp(&right.name));

        writeln!(self.out, ";; symbols")?;
        for sym in entries {
            let value = match &sym.kind {
                SymbolKind::Address(addr) => format!("{addr:>8}"),
                SymbolKind::Constant(value) => format!("{value:>8}"),
                SymbolKind::Alias(target) => format!("-> {target}"),
                SymbolKind::Undefined => String::new(),
            };
            writeln!(
                self.out,
                ";; {:<15}  defn {:>4}  {:<9} {value}",
                sym.name,
                sym.line,
                sym.kind.describe()
            )?;
        }
        Ok(())
    }

    fn write_messages(&mut self, program: &Program) -> std::io::Result<()> {
        writeln!(self.out, ";; messages")?;
        for word in &program.image.core[..program.image.end] {
            if let Some(text) = &word.text {
                writeln!(self.out, ";;    defn {:>4} {text:?}", word.line)?;
            }
        }
        Ok(())
    }
}

fn labels_at(symbols: &SymbolTable, pc: usize) -> Vec<&str> {
    let mut labels: Vec<&str> = symbols
        .entries()
        .iter()
        .filter(|sym| sym.kind == SymbolKind::Address(pc as i64))
        .map(|sym| sym.name.as_str())
        .collect();
    labels.sort_unstable();
    labels
}
