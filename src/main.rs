// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for lowlforge.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;

use lowlforge::assembler::cli::{
    emit_labels_file, validate_cli, Cli, DiagnosticsSinkConfig,
};
use lowlforge::assembler::{assemble_source, ListingWriter};
use lowlforge::core::error::{Error, Severity};
use lowlforge::vm::{Halt, Machine};

struct DiagnosticsSink {
    writer: Box<dyn Write>,
}

impl DiagnosticsSink {
    fn from_config(config: &DiagnosticsSinkConfig) -> io::Result<Self> {
        let writer: Box<dyn Write> = match config {
            DiagnosticsSinkConfig::Disabled => Box::new(io::sink()),
            DiagnosticsSinkConfig::Stderr => Box::new(io::stderr()),
            DiagnosticsSinkConfig::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(path)?;
                Box::new(file)
            }
        };
        Ok(Self { writer })
    }

    fn emit_line(&mut self, line: &str) {
        let _ = writeln!(self.writer, "{line}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match validate_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(1);
        }
    };

    let mut sink = match DiagnosticsSink::from_config(&config.diagnostics_sink) {
        Ok(sink) => sink,
        Err(err) => {
            eprintln!("Failed to open diagnostics sink: {err}");
            return ExitCode::from(1);
        }
    };

    let input = match fs::read(&cli.input) {
        Ok(input) => input,
        Err(err) => {
            sink.emit_line(&format!("{}: {err}", cli.input.display()));
            return ExitCode::from(1);
        }
    };

    let program = match assemble_source(&input) {
        Ok(program) => program,
        Err(err) => {
            sink.emit_line(&err.to_string());
            return exit_code(&err);
        }
    };

    for diag in &program.diagnostics {
        if !config.quiet || diag.severity == Severity::Error {
            sink.emit_line(&diag.to_string());
        }
    }

    if let Some(path) = &cli.list_name {
        let result = File::create(path)
            .and_then(|file| ListingWriter::new(file).write_program(&program));
        if let Err(err) = result {
            sink.emit_line(&format!("Error writing listing {}: {err}", path.display()));
            return ExitCode::from(1);
        }
    }

    if let Some(path) = &cli.labels_file {
        if let Err(err) = emit_labels_file(path, cli.format, &program.symbols) {
            sink.emit_line(&err);
            return ExitCode::from(1);
        }
    }

    if cli.no_run {
        return ExitCode::SUCCESS;
    }

    let mut machine = Machine::from_image(program.image);
    let mut stdout = io::stdout();
    let outcome = if config.quiet {
        machine.run(&mut stdout, &mut io::sink(), config.cycles)
    } else {
        machine.run(&mut stdout, &mut sink.writer, config.cycles)
    };

    match outcome {
        Ok(Halt::Normal) | Ok(Halt::Quit) => ExitCode::SUCCESS,
        Err(err) => {
            sink.emit_line(&err.to_string());
            exit_code(&err)
        }
    }
}

fn exit_code(err: &Error) -> ExitCode {
    let code = match err {
        Error::Halted | Error::Quit => 0,
        Error::Parse { .. } | Error::Assemble { .. } => 1,
        Error::CycleLimit => 2,
        Error::InvalidOpcode { .. } => 3,
        Error::StackOverflow { .. } | Error::StackUnderflow { .. } => 4,
    };
    ExitCode::from(code)
}
