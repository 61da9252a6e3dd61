// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! LOWL assembler - pipeline wiring.
//!
//! Each pass consumes the previous pass's complete output: bytes to
//! tokens, tokens to line records, records to typed nodes, nodes to an
//! executable image.

pub mod cli;
mod engine;
mod listing;

pub use engine::{assemble, Program};
pub use listing::ListingWriter;

use crate::core::ast;
use crate::core::error::Error;
use crate::core::parser;
use crate::scanner::Scanner;

/// Assemble LOWL source text into an executable image.
pub fn assemble_source(input: &[u8]) -> Result<Program, Error> {
    let tokens = Scanner::tokens(input);
    let records = parser::parse(&tokens);
    let nodes = ast::build(&records)?;
    engine::assemble(&nodes)
}

#[cfg(test)]
mod tests {
    use super::assemble_source;
    use crate::core::error::Error;

    #[test]
    fn scan_errors_surface_with_line_and_column() {
        let err = assemble_source(b"PRGST 'X'\nMESS 'oops\nPRGEN\n").expect_err("want error");
        assert!(matches!(err, Error::Parse { line: 2, col: 6, .. }), "{err}");
    }

    #[test]
    fn a_minimal_program_assembles() {
        let program = assemble_source(b"PRGST 'X'\n[BEGIN] MESS 'hi$'\nPRGEN\n").expect("ok");
        assert!(program.image.end >= 3);
    }
}
