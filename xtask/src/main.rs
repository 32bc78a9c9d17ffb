//! Development automation tasks for the `erpsync` workspace.
//!
//! Run with: `cargo xtask <command>`
//!
//! This is a CLI tool for developers, so `println!` and `eprintln!` are used
//! for user-facing output rather than structured logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;
use std::process::{Command, ExitCode};

use anyhow::{bail, Context};

fn main() -> ExitCode {
    let task = env::args().nth(1);

    let result = match task.as_deref() {
        Some("ci") => run_ci(),
        Some("fmt") => run_fmt(),
        Some("clippy") => run_clippy(),
        Some("test") => run_test(),
        Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(unknown) => {
            eprintln!("Unknown task: {unknown}");
            eprintln!();
            print_help();
            Err(anyhow::anyhow!("Unknown task"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Task failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("ErpSync Development Tasks");
    println!();
    println!("USAGE:");
    println!("    cargo xtask <TASK>");
    println!();
    println!("TASKS:");
    println!("    ci        Run fmt, clippy and test in sequence");
    println!("    fmt       Check Rust code formatting");
    println!("    clippy    Run Clippy lints with warnings denied");
    println!("    test      Run all workspace tests");
    println!("    help      Show this help message");
}

fn run_ci() -> anyhow::Result<()> {
    let steps: [(&str, fn() -> anyhow::Result<()>); 3] =
        [("Checking format", run_fmt), ("Running Clippy", run_clippy), ("Running tests", run_test)];

    for (index, (label, step)) in steps.iter().enumerate() {
        println!("\n==> Step {}/{}: {label}...", index + 1, steps.len());
        step()?;
    }

    println!("\n✓ All CI checks passed!");
    Ok(())
}

fn run_fmt() -> anyhow::Result<()> {
    cargo(&["fmt", "--all", "--", "--check"], "Format check failed. Run 'cargo fmt --all' to fix.")
}

fn run_clippy() -> anyhow::Result<()> {
    cargo(
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        "Clippy found issues. See output above.",
    )
}

fn run_test() -> anyhow::Result<()> {
    cargo(&["test", "--workspace"], "Tests failed")
}

/// Run `cargo <args>` and fail with `failure` on a non-zero exit.
fn cargo(args: &[&str], failure: &str) -> anyhow::Result<()> {
    let status = Command::new(env::var("CARGO").unwrap_or_else(|_| "cargo".into()))
        .args(args)
        .status()
        .with_context(|| format!("failed to spawn cargo {}", args.join(" ")))?;

    if !status.success() {
        bail!("{failure}");
    }
    Ok(())
}
