use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::error::{Error, Result};

/// Extensions that take a `//` line comment, and therefore a stamp.
const COMMENTED: &[&str] = &["rs", "proto"];

/// Rejects paths that would land outside the output root.
pub(crate) fn check_relative(target: &str, path: &Path) -> Result<()> {
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || path.as_os_str().is_empty() {
        return Err(Error::contract(
            target,
            format!("file path {} is not relative to the output root", path.display()),
        ));
    }
    Ok(())
}

/// Parses generated Rust so a broken template never reaches disk.
pub(crate) fn check_rust(path: &Path, content: &str) -> Result<()> {
    if path.extension().and_then(|e| e.to_str()) != Some("rs") {
        return Ok(());
    }
    syn::parse_file(content).map_err(|e| Error::InvalidRust {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// Prepends a generation timestamp where the format has line comments.
pub(crate) fn stamp(path: &Path, content: String) -> String {
    let commented = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| COMMENTED.contains(&ext));
    if !commented {
        return content;
    }
    format!(
        "// Generated by design_kit at {}\n{}",
        Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        content
    )
}

/// Writes one file under `root`, creating parent directories as needed.
pub(crate) fn write(root: &Path, relative: &Path, content: &str) -> Result<PathBuf> {
    let full = root.join(relative);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(&full, content).map_err(|e| Error::io(&full, e))?;
    debug!(path = %full.display(), bytes = content.len(), "wrote file");
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_components_are_rejected() {
        assert!(check_relative("t", Path::new("src/../../etc")).is_err());
        assert!(check_relative("t", Path::new("/abs.rs")).is_err());
        assert!(check_relative("t", Path::new("src/lib.rs")).is_ok());
    }

    #[test]
    fn only_rust_is_parsed() {
        assert!(check_rust(Path::new("a.rs"), "fn main( {").is_err());
        assert!(check_rust(Path::new("a.rs"), "fn main() {}").is_ok());
        assert!(check_rust(Path::new("a.json"), "{").is_ok());
    }

    #[test]
    fn json_is_never_stamped() {
        assert_eq!(stamp(Path::new("openapi.json"), "{}".into()), "{}");
        assert!(stamp(Path::new("lib.rs"), String::new()).starts_with("// Generated by design_kit at "));
    }

    #[test]
    fn write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), Path::new("a/b/c.txt"), "hi").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hi");
    }
}
