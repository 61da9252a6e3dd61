// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueEnum};
use serde_json::json;

use crate::core::symbol_table::{SymbolKind, SymbolTable};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str = "LOWL assembler and abstract-machine interpreter.

Assembles a LOWL source file into a word image and, unless --no-run is
given, executes it. Program output goes to stdout; diagnostics and the
machine trace go to the diagnostics sink (stderr by default).";

#[derive(Parser, Debug)]
#[command(
    name = "lowlforge",
    version = VERSION,
    about = "LOWL assembler and abstract-machine interpreter",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    /// LOWL source file.
    pub input: PathBuf,
    #[arg(
        short = 'l',
        long = "list",
        value_name = "FILE",
        long_help = "Write a listing (core disassembly, symbol dump, messages) to FILE."
    )]
    pub list_name: Option<PathBuf>,
    #[arg(
        long = "labels",
        value_name = "FILE",
        long_help = "Write the assembled symbols to FILE in the selected --format."
    )]
    pub labels_file: Option<PathBuf>,
    #[arg(
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Text,
        long_help = "Output format for --labels. text is default; json emits machine-readable output."
    )]
    pub format: OutputFormat,
    #[arg(
        long = "cycles",
        value_name = "N",
        default_value_t = 100_000,
        long_help = "Cycle budget for the run. The machine stops with a cycle-limit error when exhausted."
    )]
    pub cycles: u64,
    #[arg(
        long = "no-run",
        action = ArgAction::SetTrue,
        long_help = "Stop after assembly (and any listing/labels output) without running the machine."
    )]
    pub no_run: bool,
    #[arg(
        short = 'q',
        long = "quiet",
        action = ArgAction::SetTrue,
        long_help = "Suppress warning diagnostics and the machine trace. Errors are still reported."
    )]
    pub quiet: bool,
    #[arg(
        short = 'E',
        long = "error",
        value_name = "FILE",
        long_help = "Write diagnostics to FILE instead of stderr."
    )]
    pub error_file: Option<PathBuf>,
    #[arg(
        long = "no-error",
        action = ArgAction::SetTrue,
        conflicts_with = "error_file",
        long_help = "Disable all diagnostic output routing."
    )]
    pub no_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Where diagnostics and the machine trace go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticsSinkConfig {
    Disabled,
    Stderr,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub diagnostics_sink: DiagnosticsSinkConfig,
    pub quiet: bool,
    pub cycles: u64,
}

pub fn validate_cli(cli: &Cli) -> Result<CliConfig, String> {
    if cli.cycles == 0 {
        return Err("--cycles must be at least 1".to_string());
    }
    if cli.format == OutputFormat::Json && cli.labels_file.is_none() {
        return Err("--format json requires --labels".to_string());
    }
    let diagnostics_sink = if cli.no_error {
        DiagnosticsSinkConfig::Disabled
    } else {
        match &cli.error_file {
            Some(path) => DiagnosticsSinkConfig::File(path.clone()),
            None => DiagnosticsSinkConfig::Stderr,
        }
    };
    Ok(CliConfig {
        diagnostics_sink,
        quiet: cli.quiet,
        cycles: cli.cycles,
    })
}

/// Write the symbol dump to `path`, sorted by name.
pub fn emit_labels_file(
    path: &Path,
    format: OutputFormat,
    symbols: &SymbolTable,
) -> Result<(), String> {
    let mut entries = symbols.entries().to_vec();
    entries.sort_by(|left, right| left.name.cmp(&right.name));

    let output = match format {
        OutputFormat::Json => {
            let labels: Vec<serde_json::Value> = entries
                .into_iter()
                .map(|sym| {
                    json!({
                        "name": sym.name,
                        "kind": sym.kind.describe(),
                        "value": label_value(&sym.kind),
                        "line": sym.line,
                    })
                })
                .collect();
            json!({ "labels": labels }).to_string()
        }
        OutputFormat::Text => {
            let mut output = String::new();
            for sym in entries {
                let value = match &sym.kind {
                    SymbolKind::Alias(target) => target.clone(),
                    kind => label_value(kind).map(|v| v.to_string()).unwrap_or_default(),
                };
                output.push_str(&format!(
                    "{} = {value} ;; {} line {}\n",
                    sym.name,
                    sym.kind.describe(),
                    sym.line
                ));
            }
            output
        }
    };

    fs::write(path, output)
        .map_err(|err| format!("Error writing labels file {}: {err}", path.display()))
}

fn label_value(kind: &SymbolKind) -> Option<i64> {
    match kind {
        SymbolKind::Address(addr) => Some(*addr),
        SymbolKind::Constant(value) => Some(*value),
        _ => None,
    }
}
