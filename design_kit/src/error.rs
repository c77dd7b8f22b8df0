use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostic::Diagnostics;

#[derive(Error, Debug)]
pub enum Error {
    #[error("design is invalid ({n} diagnostics):\n{0}", n = .0.len())]
    Invalid(Diagnostics),

    #[error("unknown target `{0}`")]
    UnknownTarget(String),

    #[error("target `{0}` is already registered")]
    DuplicateTarget(String),

    #[error("target `{target}` failed: {message}")]
    Contract { target: String, message: String },

    #[error("Template Error in section `{section}`: {message}")]
    Template { section: String, message: String },

    #[error("generated file {path} is not valid Rust: {message}")]
    InvalidRust { path: PathBuf, message: String },

    #[error("target `{target}` stopped after writing {count} files: {source}", count = .written.len())]
    Incomplete {
        target: String,
        written: Vec<PathBuf>,
        #[source]
        source: Box<Error>,
    },

    #[error("Config Error: {0}")]
    Config(String),

    #[error("IO Error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SerdeJson Error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// A target's own invariant did not hold.
    pub fn contract(target: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Contract {
            target: target.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_design_counts_its_diagnostics() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push("Catalog", "service \"Catalog\" is already defined");
        diagnostics.push("Item.owner", "unknown type \"Missing\"");
        let message = Error::Invalid(diagnostics).to_string();
        assert!(message.starts_with("design is invalid (2 diagnostics):\n"));
        assert!(message.contains("Item.owner: unknown type \"Missing\""));
    }

    #[test]
    fn incomplete_names_written_count_and_cause() {
        let err = Error::Incomplete {
            target: "http-server".into(),
            written: vec![PathBuf::from("http/mod.rs")],
            source: Box::new(Error::contract("http-server", "boom")),
        };
        assert_eq!(
            err.to_string(),
            "target `http-server` stopped after writing 1 files: target `http-server` failed: boom"
        );
    }

    #[test]
    fn json_errors_convert() {
        fn parse() -> Result<serde_json::Value> {
            Ok(serde_json::from_str("{")?)
        }
        assert!(matches!(parse(), Err(Error::SerdeJson(_))));
    }
}
