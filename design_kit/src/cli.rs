//! Command-line driver for a design binary.
//!
//! A design crate builds its [`Design`] in `main` and hands it over:
//!
//! ```no_run
//! use design_kit::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut design = Design::new();
//!     design.service("Catalog", |_| Ok(()));
//!     design_kit::cli::run(design)
//! }
//! ```

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::codegen::{generate_all, TargetRegistry};
use crate::config::Config;
use crate::error::Error;
use crate::eval::Design;
use crate::validate::ValidatedDesign;

#[derive(Parser, Debug)]
#[command(author, version, about = "Validate a service design and generate code from it.")]
struct Cli {
    /// Configuration file. Defaults to `design-kit.toml` in the working directory.
    #[arg(long, global = true, env = "DESIGN_KIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validates the design and prints every diagnostic.
    Check {
        /// Print diagnostics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generates code. Runs the configured targets when none are named.
    Gen {
        targets: Vec<String>,

        /// Output root, overriding the configuration.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Prepend a generation timestamp to generated sources.
        #[arg(long)]
        stamp: bool,

        /// Run targets one after the other.
        #[arg(long)]
        serial: bool,
    },

    /// Lists the registered targets.
    Targets,
}

/// Runs the driver with the process arguments.
pub fn run(design: Design) -> Result<()> {
    run_from(design, std::env::args_os())
}

pub fn run_from<I, T>(design: Design, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    init_tracing();
    let cli = Cli::parse_from(args);
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(&std::env::current_dir().context("no working directory")?)?,
    };
    let registry = TargetRegistry::discover().context("failed to collect targets")?;

    match cli.command {
        Commands::Targets => {
            for target in registry.iter() {
                println!("{:<14} {}", target.name(), target.description());
            }
        }
        Commands::Check { json } => {
            let validated = compile(design, json)?;
            println!(
                "design is valid: {} services, {} types",
                validated.services().len(),
                validated.type_order().len()
            );
        }
        Commands::Gen {
            targets,
            output,
            stamp,
            serial,
        } => {
            let validated = compile(design, false)?;
            let names: Vec<String> = if !targets.is_empty() {
                targets
            } else if !config.targets.is_empty() {
                config.targets.clone()
            } else {
                registry.names().into_iter().map(String::from).collect()
            };
            let root = output.unwrap_or_else(|| config.output.clone());
            let mut options = config.options();
            options.stamp |= stamp;
            options.parallel &= !serial;

            let reports = generate_all(&validated, &registry, &names, &root, &options);
            let mut failed = 0;
            for report in &reports {
                match &report.result {
                    Ok(paths) => {
                        info!(target_name = %report.target, files = paths.len(), "target done");
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {e}", report.target);
                        if let Error::Incomplete { written, .. } = e {
                            for path in written {
                                eprintln!("  written: {}", path.display());
                            }
                        }
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} of {} targets failed", reports.len());
            }
            println!("generated {} targets into {}", reports.len(), root.display());
        }
    }
    Ok(())
}

fn compile(design: Design, json: bool) -> Result<ValidatedDesign> {
    match design.compile() {
        Ok(validated) => Ok(validated),
        Err(diagnostics) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&diagnostics)?);
            } else {
                eprintln!("{diagnostics}");
            }
            bail!("design is invalid: {} diagnostics", diagnostics.len())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A test harness may already have installed a subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::STRING;

    fn design() -> Design {
        let mut design = Design::new();
        design.service("Catalog", |d| {
            d.method("Get", |d| {
                d.result("Item")?;
                d.http(|d| d.get("/items"))
            })
        });
        design.user_type("Item", |d| d.attribute("id", STRING));
        design
    }

    #[test]
    fn gen_writes_the_named_targets() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let config = dir.path().join("design-kit.toml");
        std::fs::write(&config, "parallel = false\n").unwrap();
        run_from(
            design(),
            [
                "design",
                "--config",
                config.to_str().unwrap(),
                "gen",
                "openapi",
                "--output",
                out.to_str().unwrap(),
            ],
        )
        .unwrap();
        assert!(out.join("openapi.json").is_file());
        assert!(!out.join("http").exists());
    }

    #[test]
    fn check_fails_on_an_invalid_design() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("design-kit.toml");
        std::fs::write(&config, "").unwrap();
        let mut design = Design::new();
        design.user_type("Item", |d| d.attribute("owner", "Nobody"));
        let err = run_from(design, ["design", "--config", config.to_str().unwrap(), "check"]).unwrap_err();
        assert!(err.to_string().contains("1 diagnostics"));
    }
}
