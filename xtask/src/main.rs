//! # xtask - development tasks for the `design_kit` workspace.
//!
//! Invoked as `cargo xtask <command>` through the alias in
//! `.cargo/config.toml`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use toml::Value;
use walkdir::WalkDir;

const DEMO: &str = "demos/catalog-design";

#[derive(Parser, Debug)]
#[command(author, version, about = "Development tasks for the design_kit workspace.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs every target of the demo design.
    ///
    /// The output directory comes from `[package.metadata.design_kit]` in the
    /// demo's `Cargo.toml`; generated Rust is parsed afterwards.
    GenerateDemo,

    /// Parses every `.rs` file under a directory.
    CheckGenerated {
        /// Defaults to the demo's output directory.
        dir: Option<PathBuf>,
    },

    /// Lints the workspace with `cargo clippy -D warnings`.
    Lint,

    /// Runs all unit and integration tests in the workspace.
    Test,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::GenerateDemo => generate_demo()?,
        Commands::CheckGenerated { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => demo_output_dir()?,
            };
            check_generated(&dir)?
        }
        Commands::Lint => lint()?,
        Commands::Test => test()?,
    }

    Ok(())
}

fn generate_demo() -> Result<()> {
    println!("▶️  Generating code for the demo design...");

    let project_root = get_project_root()?;
    let demo_dir = project_root.join(DEMO);
    let output_dir = demo_output_dir()?;

    let status = Command::new("cargo")
        .current_dir(&demo_dir)
        .args(["run", "--quiet", "--", "gen", "--output"])
        .arg(&output_dir)
        .status()
        .context("Failed to run the demo design")?;

    if !status.success() {
        anyhow::bail!("Generation failed for {}", demo_dir.display());
    }

    check_generated(&output_dir)?;
    println!("✅ Demo generated in: {}", output_dir.display());
    Ok(())
}

fn check_generated(dir: &Path) -> Result<()> {
    println!("   Parsing generated Rust under {}...", dir.display());
    let mut checked = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        syn::parse_file(&source).with_context(|| format!("{} is not valid Rust", path.display()))?;
        checked += 1;
    }
    println!("   {checked} files parsed.");
    Ok(())
}

fn lint() -> Result<()> {
    println!("▶️  Running linter...");

    let project_root = get_project_root()?;

    let clippy_status = Command::new("cargo")
        .current_dir(&project_root)
        .args(["clippy", "--workspace", "--all-features", "--", "-D", "warnings"])
        .status()
        .context("Failed to run cargo clippy")?;

    if !clippy_status.success() {
        anyhow::bail!("Clippy found errors.");
    }

    println!("✅ All checks passed.");
    Ok(())
}

fn test() -> Result<()> {
    println!("▶️  Running all tests...");

    let project_root = get_project_root()?;

    let status = Command::new("cargo")
        .current_dir(&project_root)
        .args(["test", "--workspace", "--all-features"])
        .status()
        .context("Failed to run cargo test")?;

    if !status.success() {
        anyhow::bail!("Tests failed.");
    }

    println!("✅ All tests passed.");
    Ok(())
}

fn get_project_root() -> Result<PathBuf> {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .context("Failed to get project root")
        .map(|p| p.to_path_buf())
}

/// `output_dir` from the demo's `[package.metadata.design_kit]` table,
/// `generated` when absent.
fn demo_output_dir() -> Result<PathBuf> {
    let demo_dir = get_project_root()?.join(DEMO);
    let manifest = demo_dir.join("Cargo.toml");
    let content = fs::read_to_string(&manifest)
        .with_context(|| format!("Failed to read {}", manifest.display()))?;
    let value: Value = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", manifest.display()))?;

    let output_dir = value
        .get("package")
        .and_then(|p| p.get("metadata"))
        .and_then(|m| m.get("design_kit"))
        .and_then(|d| d.get("output_dir"))
        .and_then(Value::as_str)
        .unwrap_or("generated");

    Ok(demo_dir.join(output_dir))
}
