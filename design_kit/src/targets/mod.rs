//! Built-in generation targets.
//!
//! Every target is a plain function of the validated design. Data handed to
//! templates is assembled from sorted accessors only (services and methods
//! by name, types in dependency order, attributes in declaration order), so
//! output bytes do not depend on hash ordering.

pub mod client_cli;
pub mod grpc_proto;
pub mod http_server;
pub mod openapi;
mod rust;

use heck::ToUpperCamelCase;

use crate::codegen::TargetFn;
use crate::expr::{ErrorDef, TypeId};
use crate::validate::{ValidatedDesign, DEFAULT_VIEW};

/// First line of every generated source file.
pub(crate) const GENERATED: &str = "Code generated by design_kit. DO NOT EDIT.";

pub(crate) const BUILTIN: &[(&str, &str, TargetFn)] = &[
    (
        http_server::NAME,
        "Rust service traits, types, route tables and handlers",
        http_server::generate,
    ),
    (
        client_cli::NAME,
        "clap command tree turning sub-commands into HTTP calls",
        client_cli::generate,
    ),
    (
        openapi::NAME,
        "OpenAPI 3.1 document of the HTTP bindings",
        openapi::generate,
    ),
    (
        grpc_proto::NAME,
        "protobuf definitions of the gRPC bindings",
        grpc_proto::generate,
    ),
];

/// Name of the type a result type is rendered as under `view`. The full
/// type stands for the implicit default view.
pub(crate) fn view_type_name(design: &ValidatedDesign, id: TypeId, view: Option<&str>) -> String {
    let def = design.user_type(id);
    match view {
        Some(view)
            if def.is_result() && (view != DEFAULT_VIEW || def.view(view).is_some()) =>
        {
            format!("{}{}View", def.name.to_upper_camel_case(), view.to_upper_camel_case())
        }
        _ => def.name.to_upper_camel_case(),
    }
}

/// `NotFound` for a service error, `GetNotFound` for an error local to `Get`,
/// suffixed with `Error` unless the name already ends with it.
pub(crate) fn error_type_name(error: &ErrorDef) -> String {
    let name: String = error
        .path
        .split('.')
        .skip(1)
        .map(|part| part.to_upper_camel_case())
        .collect();
    if name.ends_with("Error") {
        name
    } else {
        format!("{name}Error")
    }
}

pub(crate) fn doc_lines(text: Option<&str>) -> Vec<String> {
    text.map(|t| t.lines().map(|l| l.trim_end().to_string()).collect())
        .unwrap_or_default()
}
