//! `grpc-proto`: one `.proto` file per gRPC-bound service.
//!
//! Every user type becomes a message, in dependency order; inline objects
//! become messages named after their owner. Payloads and results that are
//! not user types are wrapped in `<Method>Request` / `<Method>Response`.

use heck::{ToSnakeCase, ToUpperCamelCase};
use serde_json::{json, Value};

use super::{doc_lines, GENERATED};
use crate::codegen::{File, Section};
use crate::error::{Error, Result};
use crate::expr::{AttrId, DataType, GrpcService, Primitive, ServiceDef, ServiceId};
use crate::validate::ValidatedDesign;

pub const NAME: &str = "grpc-proto";

const HEADER: &str = include_str!("templates/proto.hbs");
const MESSAGES: &str = include_str!("templates/proto_messages.hbs");
const SERVICE: &str = include_str!("templates/proto_service.hbs");

const VALUE_IMPORT: &str = "google/protobuf/struct.proto";

pub fn generate(design: &ValidatedDesign) -> Result<Vec<File>> {
    let mut files = Vec::new();
    for (sid, service) in design.services() {
        if let Some(grpc) = &service.grpc {
            files.push(service_file(design, sid, service, grpc)?);
        }
    }
    Ok(files)
}

fn service_file(
    design: &ValidatedDesign,
    sid: ServiceId,
    service: &ServiceDef,
    grpc: &GrpcService,
) -> Result<File> {
    let mut types = Messages::new(design);
    for id in design.type_order() {
        let def = design.user_type(*id);
        let doc = design.attribute(def.attr).description.as_deref();
        types.message(&def.name.to_upper_camel_case(), def.attr, doc)?;
    }

    let mut wrappers = Messages::new(design);
    let mut rpcs = Vec::new();
    for (_, method) in design.methods(sid) {
        let op = method.name.to_upper_camel_case();
        let request = wrappers.wrap(method.payload, format!("{op}Request"))?;
        let response = wrappers.wrap(method.result, format!("{op}Response"))?;
        let mut doc = doc_lines(method.description.as_deref());
        if let Some(status) = method.grpc.as_ref().map(|g| &g.status).filter(|s| *s != "OK") {
            doc.push(format!("success status: {status}"));
        }
        rpcs.push(json!({"name": op, "doc": doc, "request": request, "response": response}));
    }

    let imports: Vec<&str> = if types.needs_value || wrappers.needs_value {
        vec![VALUE_IMPORT]
    } else {
        Vec::new()
    };
    let package = grpc
        .package
        .clone()
        .unwrap_or_else(|| service.name.to_snake_case());

    Ok(File::new(format!("proto/{}.proto", service.name.to_snake_case()))
        .with(Section::new(
            "header",
            HEADER,
            json!({"generated": GENERATED, "package": package, "imports": imports}),
        ))
        .with(Section::new("messages", MESSAGES, json!({"messages": types.messages})))
        .with(Section::new(
            "requests",
            MESSAGES,
            json!({"messages": wrappers.messages}),
        ))
        .with(Section::new(
            "service",
            SERVICE,
            json!({
                "name": service.name.to_upper_camel_case(),
                "doc": doc_lines(service.description.as_deref()),
                "rpcs": rpcs,
            }),
        )))
}

struct Messages<'a> {
    design: &'a ValidatedDesign,
    messages: Vec<Value>,
    needs_value: bool,
}

impl<'a> Messages<'a> {
    fn new(design: &'a ValidatedDesign) -> Self {
        Self {
            design,
            messages: Vec::new(),
            needs_value: false,
        }
    }

    fn message(&mut self, name: &str, attr: AttrId, doc: Option<&str>) -> Result<()> {
        let design = self.design;
        let mut fields = Vec::new();
        for (index, field) in design.fields(attr).iter().enumerate() {
            let hint = format!("{name}{}", field.name.to_upper_camel_case());
            let (label, ty) = self.field_type(field.attr, &hint, field.required)?;
            fields.push(json!({
                "label": label,
                "ty": ty,
                "name": field.name.to_snake_case(),
                "number": index + 1,
            }));
        }
        self.messages.push(json!({"name": name, "doc": doc_lines(doc), "fields": fields}));
        Ok(())
    }

    /// Message used for a request or response.
    fn wrap(&mut self, attr: Option<AttrId>, name: String) -> Result<String> {
        let design = self.design;
        let Some(attr) = attr else {
            self.messages.push(json!({"name": name, "doc": [], "fields": []}));
            return Ok(name);
        };
        let def = design.attribute(attr);
        match &def.ty {
            DataType::User(id) => Ok(design.user_type(*id).name.to_upper_camel_case()),
            DataType::Object(_) => {
                self.message(&name, attr, def.description.as_deref())?;
                Ok(name)
            }
            _ => {
                let (label, ty) = self.field_type(attr, &format!("{name}Value"), true)?;
                self.messages.push(json!({
                    "name": name,
                    "doc": doc_lines(def.description.as_deref()),
                    "fields": [{"label": label, "ty": ty, "name": "value", "number": 1}],
                }));
                Ok(name)
            }
        }
    }

    fn field_type(&mut self, attr: AttrId, hint: &str, required: bool) -> Result<(Option<&'static str>, String)> {
        match &self.design.attribute(attr).ty {
            DataType::Array(elem) => Ok((Some("repeated"), self.element(*elem, &format!("{hint}Item"))?)),
            DataType::Map { key, elem } => {
                let key = self.map_key(*key)?;
                let elem = self.element(*elem, &format!("{hint}Value"))?;
                Ok((None, format!("map<{key}, {elem}>")))
            }
            DataType::Primitive(p) => {
                let label = (!required && *p != Primitive::Any).then_some("optional");
                Ok((label, self.scalar(*p)))
            }
            _ => Ok((None, self.element(attr, hint)?)),
        }
    }

    /// Type of a single value; collections of collections have no protobuf
    /// spelling.
    fn element(&mut self, attr: AttrId, hint: &str) -> Result<String> {
        let design = self.design;
        let def = design.attribute(attr);
        match &def.ty {
            DataType::Primitive(p) => Ok(self.scalar(*p)),
            DataType::Object(_) => {
                self.message(hint, attr, def.description.as_deref())?;
                Ok(hint.to_string())
            }
            DataType::User(id) => Ok(design.user_type(*id).name.to_upper_camel_case()),
            DataType::Array(_) | DataType::Map { .. } => Err(Error::contract(
                NAME,
                format!("{}: nested collections cannot be expressed in protobuf", def.path),
            )),
            DataType::Pending(name) | DataType::Dangling(name) => Err(Error::contract(
                NAME,
                format!("{}: type \"{name}\" is not resolved", def.path),
            )),
        }
    }

    fn map_key(&self, attr: AttrId) -> Result<String> {
        let def = self.design.attribute(attr);
        match def.ty {
            DataType::Primitive(p) if p.is_integer() || matches!(p, Primitive::String | Primitive::Boolean) => {
                Ok(scalar_name(p).to_string())
            }
            _ => Err(Error::contract(
                NAME,
                format!("{}: protobuf map keys must be integers, booleans or strings", def.path),
            )),
        }
    }

    fn scalar(&mut self, p: Primitive) -> String {
        if p == Primitive::Any {
            self.needs_value = true;
        }
        scalar_name(p).to_string()
    }
}

fn scalar_name(p: Primitive) -> &'static str {
    match p {
        Primitive::Boolean => "bool",
        Primitive::Int | Primitive::Int64 => "int64",
        Primitive::Int32 => "int32",
        Primitive::UInt | Primitive::UInt64 => "uint64",
        Primitive::UInt32 => "uint32",
        Primitive::Float32 => "float",
        Primitive::Float64 => "double",
        Primitive::String => "string",
        Primitive::Bytes => "bytes",
        Primitive::Any => "google.protobuf.Value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::Renderer;
    use crate::dsl::{ANY, FLOAT64, INT64, STRING};
    use crate::eval::Design;
    use crate::expr::{array_of, map_of, object};

    fn rendered(design: Design) -> String {
        let files = generate(&design.compile().unwrap()).unwrap();
        assert_eq!(files.len(), 1);
        files[0].render(&Renderer::new()).unwrap()
    }

    #[test]
    fn services_become_proto_services() {
        let mut design = Design::new();
        design.service("Catalog", |d| {
            d.grpc(|d| d.package("shop.catalog.v1"))?;
            d.method("Get", |d| {
                d.payload(STRING)?;
                d.result("Item")?;
                d.grpc(|d| d.status("OK"))
            })?;
            d.method("Create", |d| {
                d.payload("Item")?;
                d.grpc(|d| d.status("ALREADY_EXISTS"))
            })
        });
        design.user_type("Item", |d| {
            d.attribute("id", STRING)?;
            d.attribute("price", FLOAT64)?;
            d.attribute("tags", array_of(STRING))?;
            d.require(["id"])
        });
        let proto = rendered(design);
        assert!(proto.contains("package shop.catalog.v1;"));
        assert!(proto.contains("  string id = 1;"));
        assert!(proto.contains("  optional double price = 2;"));
        assert!(proto.contains("  repeated string tags = 3;"));
        assert!(proto.contains("message GetRequest {\n  string value = 1;\n}"));
        assert!(proto.contains("rpc Get(GetRequest) returns (Item);"));
        assert!(proto.contains("rpc Create(Item) returns (CreateResponse);"));
        assert!(proto.contains("// success status: ALREADY_EXISTS"));
    }

    #[test]
    fn any_values_import_the_struct_definitions() {
        let mut design = Design::new();
        design.service("Store", |d| {
            d.grpc(|_| Ok(()))?;
            d.method("Put", |d| {
                d.payload_with(object(), |d| d.attribute("data", map_of(STRING, ANY)))
            })
        });
        let proto = rendered(design);
        assert!(proto.contains("import \"google/protobuf/struct.proto\";"));
        assert!(proto.contains("package store;"));
        assert!(proto.contains("map<string, google.protobuf.Value> data = 1;"));
    }

    #[test]
    fn nested_collections_break_the_contract() {
        let mut design = Design::new();
        design.service("Grid", |d| {
            d.grpc(|_| Ok(()))?;
            d.method("Put", |d| d.payload_with(object(), |d| d.attribute("rows", array_of(array_of(INT64)))))
        });
        let err = generate(&design.compile().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Contract { .. }));
    }
}
