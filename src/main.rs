//! CLI driver: `compiler <input>` where `<input>` is a single `.src` file
//! or a directory of them. Owns argument parsing, logging setup, writing
//! the sibling artifacts of §6, and mapping `CompileError`/I-O failures to
//! exit codes. The library crate (`sourcec`) never prints or logs through
//! `println!`/`eprintln!` — only this binary does.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;

use sourcec::pipeline::{compile_source, CompileArtifacts, CompileOptions, EmitOnly};

/// Compile Source programs to x86-64 assembly text.
#[derive(Parser)]
#[command(name = "compiler", about = "Compile Source programs to x86-64 assembly text")]
struct Cli {
    /// A `.src` file, or a directory of them.
    input: PathBuf,

    /// Fold constant subexpressions before desugaring (stage K).
    #[arg(long)]
    fold_constants: bool,

    /// Raise log verbosity; repeatable (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Limit output to one stage's artifact.
    #[arg(long, default_value = "all")]
    emit_only: String,
}

const EXIT_USAGE: u8 = 1;
const EXIT_MISSING_INPUT: u8 = 2;
const EXIT_UNSUPPORTED_INPUT: u8 = 3;
const EXIT_COMPILE_FAILURE: u8 = 4;

fn install_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    install_logging(cli.verbose);

    let emit_only: EmitOnly = match cli.emit_only.parse() {
        Ok(e) => e,
        Err(msg) => {
            eprintln!("{} {msg}", "error:".red().bold());
            return ExitCode::from(EXIT_USAGE);
        }
    };
    let opts = CompileOptions { fold_constants: cli.fold_constants, emit_only };

    if !cli.input.exists() {
        eprintln!("{} no such file or directory: {}", "error:".red().bold(), cli.input.display());
        return ExitCode::from(EXIT_MISSING_INPUT);
    }

    if cli.input.is_dir() {
        run_directory(&cli.input, &opts)
    } else {
        match run_file(&cli.input, &opts) {
            Ok(()) => ExitCode::SUCCESS,
            Err(code) => ExitCode::from(code),
        }
    }
}

fn run_directory(dir: &Path, opts: &CompileOptions) -> ExitCode {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("{} failed to read directory {}: {e}", "error:".red().bold(), dir.display());
            return ExitCode::from(EXIT_MISSING_INPUT);
        }
    };

    let mut any_failed = false;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("src") {
            continue;
        }
        tracing::info!(file = %path.display(), "compiling");
        if run_file(&path, opts).is_err() {
            any_failed = true;
        }
    }

    if any_failed {
        ExitCode::from(EXIT_COMPILE_FAILURE)
    } else {
        ExitCode::SUCCESS
    }
}

/// Wraps every fallible step in `anyhow::Error` (per SPEC_FULL.md §7
/// ADDITIONS) so file-path context rides along with the error all the way
/// to the single-line diagnostic printed below, regardless of whether the
/// underlying failure was an I/O error or a `CompileError`.
fn run_file(path: &Path, opts: &CompileOptions) -> Result<(), u8> {
    tracing::info!(file = %path.display(), "compiling");

    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))
        .map_err(|e| {
            eprintln!("{} {e:#}", "error:".red().bold());
            EXIT_UNSUPPORTED_INPUT
        })?;

    let artifacts = compile_source(&source, opts)
        .with_context(|| format!("{} failed to compile", path.display()))
        .map_err(|e| {
            eprintln!("{} {e:#}", "error:".red().bold());
            EXIT_COMPILE_FAILURE
        })?;

    write_artifacts(path, &artifacts)
        .with_context(|| format!("failed to write output for {}", path.display()))
        .map_err(|e| {
            eprintln!("{} {e:#}", "error:".red().bold());
            EXIT_UNSUPPORTED_INPUT
        })?;

    tracing::info!(file = %path.display(), "compilation succeeded");
    Ok(())
}

fn write_artifacts(input: &Path, artifacts: &CompileArtifacts) -> std::io::Result<()> {
    if let Some(flat) = &artifacts.flat_source {
        let out = input.with_extension("flatpy");
        std::fs::write(&out, flat)?;
        tracing::info!(file = %out.display(), "wrote artifact");
    }
    if let Some(pyobj) = &artifacts.pyobj_source {
        let out = input.with_extension("pyobjpy");
        std::fs::write(&out, pyobj)?;
        tracing::info!(file = %out.display(), "wrote artifact");
    }
    if let Some(asm) = &artifacts.assembly {
        let out = input.with_extension("s");
        std::fs::write(&out, asm)?;
        tracing::info!(file = %out.display(), "wrote artifact");
    }
    Ok(())
}
