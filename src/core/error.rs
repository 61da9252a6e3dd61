// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types and diagnostics for the assembler and the machine.
//!
//! The pipeline reports exactly seven disjoint failure kinds. `Halted` and
//! `Quit` are not true failures; callers match on them to distinguish a
//! normal stop from an error.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed source: unterminated quote, unknown token, and friends.
    #[error("{line}:{col}: {message}")]
    Parse { line: u32, col: u32, message: String },

    /// Bad program: undefined or redefined symbol, wrong operand, bad flag.
    #[error("line {line}: {message}")]
    Assemble { line: u32, message: String },

    /// The machine executed `HALT` (or was stepped after halting).
    #[error("halted")]
    Halted,

    /// The machine executed `MDQUIT`: a deliberate, non-error exit.
    #[error("quit")]
    Quit,

    /// The fetched word's opcode has no runtime implementation.
    #[error("{pc:06}: invalid opcode {mnemonic}")]
    InvalidOpcode { pc: usize, mnemonic: &'static str },

    /// Forwards/backwards stack pointers met or crossed.
    #[error("{pc:06}: stack overflow")]
    StackOverflow { pc: usize },

    /// A pop from an empty stack (data or subroutine-return).
    #[error("{pc:06}: stack underflow")]
    StackUnderflow { pc: usize },

    /// `run` exhausted its cycle budget without reaching a halt.
    #[error("cycle limit exceeded")]
    CycleLimit,
}

/// Severity level for assembler diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A line-anchored message accumulated during assembly. Errors abort the
/// pipeline; warnings (e.g. a missing `BEGIN`) are reported and ignored.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub line: u32,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        write!(f, "{kind}: line {}: {}", self.line, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, Error};

    #[test]
    fn error_messages_carry_position() {
        let err = Error::Parse {
            line: 3,
            col: 7,
            message: "unterminated quoted text".to_string(),
        };
        assert_eq!(err.to_string(), "3:7: unterminated quoted text");

        let err = Error::Assemble {
            line: 12,
            message: "GO: want 4 args: got 2".to_string(),
        };
        assert_eq!(err.to_string(), "line 12: GO: want 4 args: got 2");
    }

    #[test]
    fn diagnostics_format_with_severity() {
        let diag = Diagnostic::warning(9, "missing BEGIN");
        assert_eq!(diag.to_string(), "WARNING: line 9: missing BEGIN");
    }
}
