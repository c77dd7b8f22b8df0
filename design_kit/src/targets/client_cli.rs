//! `client-cli`: a clap command tree with one sub-command per HTTP
//! operation, named `<service>.<method>`, and a function turning the parsed
//! arguments into a ready-to-send call.

use heck::ToKebabCase;
use serde_json::{json, Value};

use super::GENERATED;
use crate::codegen::{File, Section};
use crate::error::Result;
use crate::expr::{AttrId, DataType, MethodDef, MethodId, Primitive};
use crate::validate::ValidatedDesign;

pub const NAME: &str = "client-cli";

const HEADER: &str = include_str!("templates/header.hbs");
const RUNTIME: &str = include_str!("templates/cli_runtime.hbs");
const COMMAND: &str = include_str!("templates/cli_command.hbs");
const CALL: &str = include_str!("templates/cli_call.hbs");

const USES: &[&str] = &[
    "use clap::{Arg, ArgAction, ArgMatches, Command};",
    "use serde_json::{Map, Value};",
];

pub fn generate(design: &ValidatedDesign) -> Result<Vec<File>> {
    let (bin, about) = match design.api() {
        Some(api) => (
            api.name.to_kebab_case(),
            api.title
                .clone()
                .unwrap_or_else(|| format!("Client for the {} API", api.name)),
        ),
        None => ("client".to_string(), "Generated API client".to_string()),
    };

    let mut commands = Vec::new();
    for (sid, service) in design.services() {
        for (mid, method) in design.methods(sid) {
            if let Some(command) = command(design, &service.name, mid, method) {
                commands.push(command);
            }
        }
    }

    let file = File::new("cli/commands.rs")
        .with(Section::new(
            "header",
            HEADER,
            json!({"generated": GENERATED, "uses": USES}),
        ))
        .with(Section::new("runtime", RUNTIME, Value::Null))
        .with(Section::new(
            "command",
            COMMAND,
            json!({"bin": bin, "about": about, "commands": commands}),
        ))
        .with(Section::new("call", CALL, json!({"commands": commands})));
    Ok(vec![file])
}

fn command(design: &ValidatedDesign, service: &str, id: MethodId, method: &MethodDef) -> Option<Value> {
    let http = method.http.as_ref()?;
    let route = design.routes(id).into_iter().next()?;
    let (args, whole) = match method.payload {
        None => (Vec::new(), false),
        Some(payload) if takes_fields(design, payload) => (field_args(design, payload), false),
        Some(_) => (
            vec![json!({
                "id": "body",
                "long": "body",
                "help": "payload as JSON",
                "required": true,
                "parse": true,
            })],
            true,
        ),
    };
    let about = method
        .description
        .as_deref()
        .and_then(|d| d.lines().next())
        .map(str::to_string)
        .unwrap_or_else(|| method.path.clone());

    Some(json!({
        "name": format!("{}.{}", service.to_kebab_case(), method.name.to_kebab_case()),
        "about": about,
        "args": args,
        "method": route.method.as_str(),
        "path": route.path,
        "has_body": route.method.has_body(),
        "body": http.body,
        "params": http.params,
        "whole": whole,
    }))
}

fn takes_fields(design: &ValidatedDesign, payload: AttrId) -> bool {
    matches!(
        design.attribute(payload).ty,
        DataType::Object(_) | DataType::User(_)
    )
}

fn field_args(design: &ValidatedDesign, payload: AttrId) -> Vec<Value> {
    design
        .fields(payload)
        .iter()
        .map(|field| {
            let attr = design.attribute(field.attr);
            let text = matches!(
                attr.ty,
                DataType::Primitive(Primitive::String | Primitive::Bytes)
            );
            json!({
                "id": field.name,
                "long": field.name.to_kebab_case(),
                "help": attr.description.as_deref().and_then(|d| d.lines().next()).unwrap_or(""),
                "required": field.required && attr.default.is_none(),
                "parse": !text,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::Renderer;
    use crate::dsl::{INT32, STRING};
    use crate::eval::Design;
    use crate::expr::object;

    fn design() -> ValidatedDesign {
        let mut design = Design::new();
        design.api("shop", |d| d.title("Shop"));
        design.service("Catalog", |d| {
            d.method("ListItems", |d| {
                d.description("List items.\nPaged.")?;
                d.payload_with(object(), |d| {
                    d.attribute("category", STRING)?;
                    d.attribute("pageSize", INT32)
                })?;
                d.http(|d| {
                    d.get("/categories/{category}/items")?;
                    d.param("pageSize")
                })
            })?;
            d.method("Internal", |_| Ok(()))
        });
        design.compile().unwrap()
    }

    #[test]
    fn commands_cover_http_methods_only() {
        let files = generate(&design()).unwrap();
        let command = &files[0].section("command").unwrap().data;
        let commands = command["commands"].as_array().unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0]["name"], "catalog.list-items");
        assert_eq!(commands[0]["about"], "List items.");
        assert_eq!(command["bin"], "shop");
    }

    #[test]
    fn non_text_fields_are_parsed_as_json() {
        let files = generate(&design()).unwrap();
        let args = files[0].section("command").unwrap().data["commands"][0]["args"].clone();
        assert_eq!(args[0]["parse"], false);
        assert_eq!(args[1]["long"], "page-size");
        assert_eq!(args[1]["parse"], true);
    }

    #[test]
    fn rendered_module_is_valid_rust() {
        let files = generate(&design()).unwrap();
        let source = files[0].render(&Renderer::new()).unwrap();
        if let Err(e) = syn::parse_file(&source) {
            panic!("{e}\n{source}");
        }
        assert!(source.contains(r#"Command::new("catalog.list-items")"#));
        assert!(source.contains(r#"params: &["pageSize", ],"#));
    }
}
