//! `http-server`: Rust scaffolding for the HTTP bindings.
//!
//! * `http/mod.rs` declares the service modules and the request decoding
//!   helpers shared by every handler.
//! * `http/types.rs` declares every user and result type (plus one struct
//!   per explicit view) in dependency order, one section per type.
//! * `http/<service>.rs` holds the service trait, inline payload and result
//!   structs, error enums, the route table and one handler per method.

use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use serde_json::{json, Value};

use super::rust::{field_ident, type_ident, RustTypes};
use super::{doc_lines, error_type_name, GENERATED};
use crate::codegen::{File, Section};
use crate::error::{Error, Result};
use crate::expr::{DataType, Primitive, ServiceDef, ServiceId};
use crate::validate::ValidatedDesign;

pub const NAME: &str = "http-server";

const HEADER: &str = include_str!("templates/header.hbs");
const STRUCTS: &str = include_str!("templates/structs.hbs");
const MODULES: &str = include_str!("templates/http_mod.hbs");
const DECODE: &str = include_str!("templates/http_decode.hbs");
const FAILURES: &str = include_str!("templates/http_failures.hbs");
const SERVICE: &str = include_str!("templates/http_service.hbs");
const ROUTES: &str = include_str!("templates/http_routes.hbs");
const HANDLER: &str = include_str!("templates/http_handler.hbs");
const DISPATCH: &str = include_str!("templates/http_dispatch.hbs");

const SERVICE_USES: &[&str] = &[
    "#![allow(unused_imports)]",
    "",
    "use super::types::*;",
    "use super::{decode, encode, merge_params, unknown_operation, Rejection, Reply, Request, Requirement};",
];

pub fn generate(design: &ValidatedDesign) -> Result<Vec<File>> {
    let services: Vec<(ServiceId, &ServiceDef)> = design
        .services()
        .into_iter()
        .filter(|(id, service)| {
            service.http.is_some() || design.methods(*id).iter().any(|(_, m)| m.http.is_some())
        })
        .collect();

    let mut modules = Vec::with_capacity(services.len());
    for (_, service) in &services {
        let module = field_ident(&service.name);
        if module == "types" {
            return Err(Error::contract(
                NAME,
                format!("service \"{}\" would shadow the types module", service.name),
            ));
        }
        modules.push(module);
    }

    let mut files = vec![
        File::new("http/mod.rs")
            .with(Section::new(
                "modules",
                MODULES,
                json!({"generated": GENERATED, "modules": modules}),
            ))
            .with(Section::new("decode", DECODE, Value::Null)),
        types_file(design),
    ];
    for ((id, service), module) in services.iter().zip(&modules) {
        files.push(service_file(design, *id, service, module));
    }
    Ok(files)
}

fn header(uses: &[&str]) -> Section {
    Section::new(
        "header",
        HEADER,
        json!({"generated": GENERATED, "uses": uses}),
    )
}

fn types_file(design: &ValidatedDesign) -> File {
    let mut file = File::new("http/types.rs").with(header(&[]));
    for id in design.type_order() {
        let def = design.user_type(*id);
        let mut types = RustTypes::new(design);
        types.object(
            &def.name,
            def.attr,
            design.attribute(def.attr).description.as_deref(),
        );
        for view in design.views(*id) {
            if def.view(&view.name).is_some() {
                types.view(*id, view);
            }
        }
        file.push(Section::new(
            format!("type-{}", def.name),
            STRUCTS,
            json!({"structs": types.take()}),
        ));
    }
    file
}

fn is_object(design: &ValidatedDesign, attr: crate::expr::AttrId) -> bool {
    matches!(
        design.attribute(attr).ty,
        DataType::Object(_) | DataType::User(_)
    )
}

/// Payload fields that arrive as text but decode as JSON scalars.
fn scalar_fields(design: &ValidatedDesign, payload: crate::expr::AttrId) -> Vec<String> {
    design
        .fields(payload)
        .iter()
        .filter(|f| {
            matches!(
                design.attribute(f.attr).ty,
                DataType::Primitive(p) if !matches!(p, Primitive::String | Primitive::Bytes)
            )
        })
        .map(|f| f.name.clone())
        .collect()
}

fn service_file(design: &ValidatedDesign, sid: ServiceId, service: &ServiceDef, module: &str) -> File {
    let trait_name = type_ident(&service.name);
    let mut inline = RustTypes::new(design);
    let mut error_types = RustTypes::new(design);
    let mut declared: Vec<String> = Vec::new();

    let mut methods = Vec::new();
    let mut failures = Vec::new();
    let mut routes = Vec::new();
    let mut handlers = Vec::new();
    let mut handler_sections = Vec::new();
    let mut secured = false;

    for (mid, method) in design.methods(sid) {
        let op = method.name.to_upper_camel_case();
        let payload = method.payload.map(|a| {
            inline.type_of(a, &format!("{op}Payload"), design.attribute(a).view.as_deref())
        });
        let result = method
            .result
            .map(|a| inline.type_of(a, &format!("{op}Result"), design.attribute(a).view.as_deref()))
            .unwrap_or_else(|| "()".to_string());
        let failure = type_ident(&format!("{op}Failure"));

        let mut variants = Vec::new();
        for error in design.method_errors(mid) {
            let body = error_type_name(error);
            if !declared.contains(&body) {
                error_types.object(&body, error.attr, error.description.as_deref());
                declared.push(body.clone());
            }
            variants.push(json!({
                "error": error.name,
                "ident": type_ident(&error.name),
                "body": type_ident(&body),
                "status": error.status.unwrap_or(500),
            }));
        }
        failures.push(json!({"operation": method.name, "name": failure, "variants": variants}));

        let ident = field_ident(&method.name);
        methods.push(json!({
            "ident": ident,
            "doc": doc_lines(method.description.as_deref()),
            "payload": payload,
            "result": result,
            "failure": failure,
        }));

        let Some(http) = &method.http else {
            continue;
        };
        for route in design.routes(mid) {
            routes.push(json!({
                "method": route.method.as_str(),
                "path": route.path,
                "operation": method.name,
            }));
        }

        let handler = format!("handle_{}", method.name.to_snake_case());
        let object = method.payload.is_some_and(|a| is_object(design, a));
        let scalars = method
            .payload
            .filter(|_| object)
            .map(|a| scalar_fields(design, a))
            .unwrap_or_default();
        let default_status = if method.result.is_some() { 200 } else { 204 };
        let security: Vec<Value> = design
            .requirements(mid)
            .iter()
            .map(|r| json!({"schemes": r.schemes, "scopes": r.scopes}))
            .collect();
        secured |= !security.is_empty();
        handler_sections.push(Section::new(
            format!("handler-{}", method.name),
            HANDLER,
            json!({
                "operation": method.name,
                "handler": handler,
                "service": trait_name,
                "ident": ident,
                "payload": payload,
                "object": object,
                "scalars": scalars,
                "scalars_const": format!("{}_SCALARS", method.name.to_shouty_snake_case()),
                "status": http.responses.first().copied().unwrap_or(default_status),
                "security": security,
                "security_const": format!("{}_SECURITY", method.name.to_shouty_snake_case()),
            }),
        ));
        handlers.push(json!({"operation": method.name, "handler": handler}));
    }

    let mut file = File::new(format!("http/{module}.rs"))
        .with(header(SERVICE_USES))
        .with(Section::new("types", STRUCTS, json!({"structs": inline.take()})))
        .with(Section::new(
            "error-types",
            STRUCTS,
            json!({"structs": error_types.take()}),
        ))
        .with(Section::new("errors", FAILURES, json!({"failures": failures})))
        .with(Section::new(
            "service",
            SERVICE,
            json!({
                "name": trait_name,
                "doc": doc_lines(service.description.as_deref()),
                "methods": methods,
                "secured": secured,
            }),
        ))
        .with(Section::new("routes", ROUTES, json!({"routes": routes})));
    for section in handler_sections {
        file.push(section);
    }
    file.with(Section::new(
        "dispatch",
        DISPATCH,
        json!({"service": trait_name, "handlers": handlers}),
    ))
}
