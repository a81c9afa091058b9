use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

const BUNDLED_MAP: &str = "data/maps/tower_defense.json";

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for towerdef")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, smoke
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Run the headless determinism check against the bundled map
    Smoke,
    /// Run the flocking step benchmark
    Bench,
    /// Build the entire workspace
    Build,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_smoke()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Smoke => run_smoke()?,
        Commands::Bench => run_bench()?,
        Commands::Build => cargo("build", &["build", "--workspace"])?,
    }

    Ok(())
}

fn cargo(label: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {label} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo("fmt check", &["fmt", "--all", "--", "--check"])
}

fn run_clippy() -> Result<()> {
    cargo(
        "clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn run_tests() -> Result<()> {
    cargo("test", &["test", "--workspace"])
}

fn run_smoke() -> Result<()> {
    cargo(
        "smoke",
        &[
            "run",
            "-p",
            "towerdef-cli",
            "--release",
            "--",
            "--map",
            BUNDLED_MAP,
            "determinism",
            "--count",
            "200",
            "--seconds",
            "20",
        ],
    )
}

fn run_bench() -> Result<()> {
    cargo(
        "bench",
        &["bench", "-p", "towerdef-kernel", "--bench", "bench_flock_step"],
    )
}
