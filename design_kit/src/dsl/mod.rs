//! The DSL surface: one method of [`Dsl`](crate::Dsl) per keyword.
//!
//! ```
//! use design_kit::prelude::*;
//!
//! let mut design = Design::new();
//! design.service("Catalog", |d| {
//!     d.method("Get", |d| {
//!         d.payload_with(object(), |d| {
//!             d.attribute("id", STRING)?;
//!             d.require(["id"])
//!         })?;
//!         d.result("Item")?;
//!         d.http(|d| d.get("/items/{id}"))
//!     })
//! });
//! design.user_type("Item", |d| {
//!     d.attribute("id", STRING)?;
//!     d.attribute("name", STRING)
//! });
//! assert!(design.compile().is_ok());
//! ```

mod attribute;
mod security;
mod service;
mod top;
mod transport;
mod view;

use crate::expr::Primitive;

pub const BOOLEAN: Primitive = Primitive::Boolean;
pub const INT: Primitive = Primitive::Int;
pub const INT32: Primitive = Primitive::Int32;
pub const INT64: Primitive = Primitive::Int64;
pub const UINT: Primitive = Primitive::UInt;
pub const UINT32: Primitive = Primitive::UInt32;
pub const UINT64: Primitive = Primitive::UInt64;
pub const FLOAT32: Primitive = Primitive::Float32;
pub const FLOAT64: Primitive = Primitive::Float64;
pub const STRING: Primitive = Primitive::String;
pub const BYTES: Primitive = Primitive::Bytes;
pub const ANY: Primitive = Primitive::Any;
