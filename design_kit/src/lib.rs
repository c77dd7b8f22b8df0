//! # design_kit
//!
//! A declarative service-design compiler. A design is written as nested
//! builder closures, evaluated into an expression graph, validated as a
//! whole, then handed to one or more generation targets.
//!
//! ```
//! use design_kit::prelude::*;
//!
//! let mut design = Design::new();
//! design.service("Catalog", |d| {
//!     d.http(|d| d.path("/catalog"))?;
//!     d.method("Get", |d| {
//!         d.payload_with(object(), |d| {
//!             d.attribute("id", STRING)?;
//!             d.require(["id"])
//!         })?;
//!         d.result("Item")?;
//!         d.http(|d| d.get("/items/{id}"))
//!     })
//! });
//! design.result_type("Item", |d| {
//!     d.attribute("id", STRING)?;
//!     d.attribute("name", STRING)
//! });
//!
//! let validated = design.compile().expect("design is valid");
//! let out = tempfile::tempdir().unwrap();
//! let registry = TargetRegistry::builtin();
//! let written = design_kit::generate(&validated, &registry, "openapi", out.path()).unwrap();
//! assert_eq!(written, [out.path().join("openapi.json")]);
//! ```
//!
//! ## Pieces
//!
//! - [`eval`] runs builder closures against a context stack and a finalize
//!   queue; [`dsl`] holds the keywords.
//! - [`expr`] is the graph the builders produce.
//! - [`validate`] reports every problem of a design at once, or freezes it
//!   into a [`ValidatedDesign`].
//! - [`codegen`] defines the [`File`]/[`Section`] envelope, the
//!   [`TargetRegistry`] and the generation protocol; [`targets`] holds the
//!   built-in targets.
//! - Custom targets are plain functions registered with
//!   [`TargetRegistry::register`] or with the `#[design_kit::target]`
//!   attribute.

pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod dsl;
pub mod error;
pub mod eval;
pub mod expr;
pub mod targets;
pub mod validate;

#[cfg(feature = "cli")]
pub mod cli;

pub use codegen::{
    generate, generate_all, generate_with, File, GenerateOptions, Section, TargetRegistration,
    TargetRegistry, TargetReport,
};
pub use config::Config;
pub use diagnostic::{Diagnostic, Diagnostics};
pub use error::{Error, Result};
pub use eval::{Design, Dsl, DslResult};
pub use validate::{validate, ValidatedDesign};

#[cfg(feature = "macros")]
pub use design_kit_macros::target;

// `#[target]` 生成的代码通过这里引用 inventory
pub use inventory;

/// Everything a design file needs.
pub mod prelude {
    pub use crate::codegen::{File, Section};
    pub use crate::dsl::{
        ANY, BOOLEAN, BYTES, FLOAT32, FLOAT64, INT, INT32, INT64, STRING, UINT, UINT32, UINT64,
    };
    pub use crate::eval::{Design, Dsl, DslResult};
    pub use crate::expr::{array_of, map_of, object, Format, KeyLocation, SchemeKind};
    pub use crate::validate::ValidatedDesign;
    pub use crate::TargetRegistry;
}
