//! File and section envelopes, the target registry, and the generation
//! protocol that turns a [`ValidatedDesign`] into files on disk.
//!
//! A target returns a list of [`File`]s. Each file is an ordered list of
//! named [`Section`]s; a section is a handlebars template plus the JSON data
//! it renders. Nothing is written until a target has produced every file,
//! and files are then written one by one so that a failure part way through
//! reports exactly what already reached disk.

mod registry;
mod render;
mod writer;

pub use registry::{Target, TargetFn, TargetRegistration, TargetRegistry};
pub use render::Renderer;

use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::validate::ValidatedDesign;

/// A named piece of a generated file.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub template: Cow<'static, str>,
    pub data: Value,
}

impl Section {
    pub fn new(name: impl Into<String>, template: impl Into<Cow<'static, str>>, data: Value) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            data,
        }
    }

    pub fn render(&self, renderer: &Renderer) -> Result<String> {
        renderer.render(&self.name, &self.template, &self.data)
    }
}

/// A generated file: a path relative to the output root and its sections,
/// concatenated in order.
#[derive(Debug, Clone)]
pub struct File {
    pub path: PathBuf,
    pub sections: Vec<Section>,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sections: Vec::new(),
        }
    }

    pub fn with(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn push(&mut self, section: Section) -> &mut Self {
        self.sections.push(section);
        self
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    pub fn render(&self, renderer: &Renderer) -> Result<String> {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&section.render(renderer)?);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Prepend a generation timestamp to files that can carry a comment.
    /// Off by default so repeated runs produce identical bytes.
    pub stamp: bool,
    /// Render the files of a target, and run several targets, on the rayon
    /// pool.
    pub parallel: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            stamp: false,
            parallel: true,
        }
    }
}

/// Outcome of one target in [`generate_all`].
#[derive(Debug)]
pub struct TargetReport {
    pub target: String,
    pub result: Result<Vec<PathBuf>>,
}

/// Runs one target with the default options and writes its files under
/// `root`.
pub fn generate(
    design: &ValidatedDesign,
    registry: &TargetRegistry,
    target: &str,
    root: &Path,
) -> Result<Vec<PathBuf>> {
    generate_with(design, registry, target, root, &GenerateOptions::default())
}

/// Runs one target and writes its files under `root`.
///
/// Returns the written paths in the order the target listed them. A failure
/// after the first write is wrapped in [`Error::Incomplete`] together with
/// the paths already written.
pub fn generate_with(
    design: &ValidatedDesign,
    registry: &TargetRegistry,
    target: &str,
    root: &Path,
    options: &GenerateOptions,
) -> Result<Vec<PathBuf>> {
    let rendered = prepare(design, registry, target, options)?;
    write_rendered(root, target, rendered)
}

/// A file of a target, rendered and checked but not yet written.
struct Rendered {
    path: PathBuf,
    content: Result<String>,
}

/// Runs the target function and renders its files. A panic inside the
/// target becomes a contract error of that target.
fn prepare(
    design: &ValidatedDesign,
    registry: &TargetRegistry,
    target: &str,
    options: &GenerateOptions,
) -> Result<Vec<Rendered>> {
    let entry = registry
        .get(target)
        .ok_or_else(|| Error::UnknownTarget(target.to_string()))?;
    let files = panic::catch_unwind(AssertUnwindSafe(|| entry.files(design)))
        .map_err(|payload| Error::contract(target, format!("panicked: {}", panic_message(&*payload))))??;

    let mut seen = HashSet::new();
    for file in &files {
        writer::check_relative(target, &file.path)?;
        if !seen.insert(file.path.as_path()) {
            return Err(Error::contract(
                target,
                format!("file {} is produced more than once", file.path.display()),
            ));
        }
    }

    let renderer = Renderer::new();
    let render_one = |file: &File| Rendered {
        path: file.path.clone(),
        content: file.render(&renderer).and_then(|content| {
            writer::check_rust(&file.path, &content)?;
            Ok(if options.stamp {
                writer::stamp(&file.path, content)
            } else {
                content
            })
        }),
    };
    Ok(if options.parallel {
        files.par_iter().map(render_one).collect()
    } else {
        files.iter().map(render_one).collect()
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

fn write_rendered(root: &Path, target: &str, rendered: Vec<Rendered>) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(rendered.len());
    for file in rendered {
        let result = file
            .content
            .and_then(|content| writer::write(root, &file.path, &content));
        match result {
            Ok(path) => written.push(path),
            Err(source) if written.is_empty() => return Err(source),
            Err(source) => {
                return Err(Error::Incomplete {
                    target: target.to_string(),
                    written,
                    source: Box::new(source),
                })
            }
        }
    }
    info!(target_name = target, files = written.len(), "generated");
    Ok(written)
}

/// Runs several targets against the same design. Each target succeeds or
/// fails on its own; reports come back in the order `targets` lists them.
///
/// Every target is rendered before anything is written. A path produced by
/// more than one target fails each of those targets, and none of them
/// writes.
pub fn generate_all(
    design: &ValidatedDesign,
    registry: &TargetRegistry,
    targets: &[String],
    root: &Path,
    options: &GenerateOptions,
) -> Vec<TargetReport> {
    let prepare_one = |target: &String| prepare(design, registry, target, options);
    let prepared: Vec<Result<Vec<Rendered>>> = if options.parallel {
        targets.par_iter().map(prepare_one).collect()
    } else {
        targets.iter().map(prepare_one).collect()
    };

    let mut owners: BTreeMap<&Path, Vec<&str>> = BTreeMap::new();
    for (target, files) in targets.iter().zip(&prepared) {
        for file in files.iter().flatten() {
            owners.entry(file.path.as_path()).or_default().push(target.as_str());
        }
    }
    let mut clashes: HashMap<&str, String> = HashMap::new();
    for (path, names) in &owners {
        if names.len() > 1 {
            for name in names {
                clashes.entry(*name).or_insert_with(|| {
                    format!("file {} is also produced by {}", path.display(), names.join(", "))
                });
            }
        }
    }
    let clashes: HashMap<String, String> = clashes
        .into_iter()
        .map(|(name, message)| (name.to_string(), message))
        .collect();

    let finish = |(target, files): (&String, Result<Vec<Rendered>>)| {
        let result = match clashes.get(target.as_str()) {
            Some(message) => Err(Error::contract(target.as_str(), message.as_str())),
            None => files.and_then(|files| write_rendered(root, target, files)),
        };
        if let Err(e) = &result {
            warn!(target_name = %target, error = %e, "target failed");
        }
        TargetReport {
            target: target.clone(),
            result,
        }
    };
    if options.parallel {
        targets.par_iter().zip(prepared).map(finish).collect()
    } else {
        targets.iter().zip(prepared).map(finish).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Design;
    use serde_json::json;

    fn design() -> ValidatedDesign {
        let mut design = Design::new();
        design.service("Catalog", |_| Ok(()));
        design.compile().unwrap()
    }

    fn serial() -> GenerateOptions {
        GenerateOptions {
            stamp: false,
            parallel: false,
        }
    }

    #[test]
    fn sections_are_concatenated_in_order() {
        let file = File::new("a.txt")
            .with(Section::new("one", "{{x}}-", json!({"x": 1})))
            .with(Section::new("two", "{{x}}", json!({"x": 2})));
        assert_eq!(file.render(&Renderer::new()).unwrap(), "1-2");
        assert!(file.section("two").is_some());
    }

    #[test]
    fn unknown_targets_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate(&design(), &TargetRegistry::new(), "nope", dir.path()).unwrap_err();
        assert!(matches!(err, Error::UnknownTarget(_)));
    }

    #[test]
    fn duplicate_paths_break_the_contract() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = TargetRegistry::new();
        registry
            .register("twice", "", |_| Ok(vec![File::new("a.txt"), File::new("a.txt")]))
            .unwrap();
        let err = generate_with(&design(), &registry, "twice", dir.path(), &serial()).unwrap_err();
        assert!(matches!(err, Error::Contract { .. }));
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn failures_after_a_write_list_the_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = TargetRegistry::new();
        registry
            .register("half", "", |_| {
                Ok(vec![
                    File::new("ok.txt").with(Section::new("body", "fine", Value::Null)),
                    File::new("bad.rs").with(Section::new("body", "fn (", Value::Null)),
                ])
            })
            .unwrap();
        let err = generate_with(&design(), &registry, "half", dir.path(), &serial()).unwrap_err();
        match err {
            Error::Incomplete { written, source, .. } => {
                assert_eq!(written, [dir.path().join("ok.txt")]);
                assert!(matches!(*source, Error::InvalidRust { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("bad.rs").exists());
    }

    #[test]
    fn targets_fail_independently() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = TargetRegistry::new();
        registry
            .register("good", "", |_| {
                Ok(vec![File::new("good.txt").with(Section::new("body", "x", Value::Null))])
            })
            .unwrap();
        registry
            .register("bad", "", |_| Err(Error::contract("bad", "nope")))
            .unwrap();
        let reports = generate_all(
            &design(),
            &registry,
            &["bad".to_string(), "good".to_string()],
            dir.path(),
            &GenerateOptions::default(),
        );
        assert_eq!(reports[0].target, "bad");
        assert!(reports[0].result.is_err());
        assert!(reports[1].result.is_ok());
        assert!(dir.path().join("good.txt").exists());
    }

    #[test]
    fn a_panicking_target_fails_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = TargetRegistry::new();
        registry
            .register("good", "", |_| {
                Ok(vec![File::new("good.txt").with(Section::new("body", "x", Value::Null))])
            })
            .unwrap();
        registry
            .register("broken", "", |_| panic!("index out of range"))
            .unwrap();
        for options in [serial(), GenerateOptions::default()] {
            let reports = generate_all(
                &design(),
                &registry,
                &["broken".to_string(), "good".to_string()],
                dir.path(),
                &options,
            );
            match &reports[0].result {
                Err(Error::Contract { target, message }) => {
                    assert_eq!(target, "broken");
                    assert_eq!(message, "panicked: index out of range");
                }
                other => panic!("unexpected result: {other:?}"),
            }
            assert!(reports[1].result.is_ok());
        }
        assert!(dir.path().join("good.txt").exists());
    }

    #[test]
    fn targets_claiming_the_same_file_both_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = TargetRegistry::new();
        for name in ["first", "second"] {
            registry
                .register(name, "", move |_| {
                    Ok(vec![File::new("shared.txt").with(Section::new("body", name, Value::Null))])
                })
                .unwrap();
        }
        registry
            .register("other", "", |_| {
                Ok(vec![File::new("other.txt").with(Section::new("body", "x", Value::Null))])
            })
            .unwrap();
        let reports = generate_all(
            &design(),
            &registry,
            &["first".to_string(), "second".to_string(), "other".to_string()],
            dir.path(),
            &GenerateOptions::default(),
        );
        for report in &reports[..2] {
            match &report.result {
                Err(Error::Contract { message, .. }) => {
                    assert_eq!(message, "file shared.txt is also produced by first, second");
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
        assert!(reports[2].result.is_ok());
        assert!(!dir.path().join("shared.txt").exists());
    }
}
