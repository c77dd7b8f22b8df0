use heck::{ToSnakeCase, ToUpperCamelCase};
use serde_json::{json, Value};

use super::{doc_lines, view_type_name};
use crate::expr::{AttrId, DataType, Primitive, TypeId};
use crate::validate::{ResolvedView, ValidatedDesign};

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be written as raw identifiers.
const RESERVED: &[&str] = &["self", "Self", "super", "crate"];

pub(crate) fn field_ident(name: &str) -> String {
    escape(name.to_snake_case())
}

pub(crate) fn type_ident(name: &str) -> String {
    escape(name.to_upper_camel_case())
}

fn escape(ident: String) -> String {
    if RESERVED.contains(&ident.as_str()) {
        format!("{ident}_")
    } else if KEYWORDS.contains(&ident.as_str()) {
        format!("r#{ident}")
    } else if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{ident}")
    } else {
        ident
    }
}

pub(crate) fn primitive_type(p: Primitive) -> &'static str {
    match p {
        Primitive::Boolean => "bool",
        Primitive::Int | Primitive::Int64 => "i64",
        Primitive::Int32 => "i32",
        Primitive::UInt | Primitive::UInt64 => "u64",
        Primitive::UInt32 => "u32",
        Primitive::Float32 => "f32",
        Primitive::Float64 => "f64",
        Primitive::String => "String",
        Primitive::Bytes => "Vec<u8>",
        Primitive::Any => "serde_json::Value",
    }
}

/// Collects struct declarations for objects, naming inline objects after
/// the place they are declared.
pub(crate) struct RustTypes<'a> {
    design: &'a ValidatedDesign,
    structs: Vec<Value>,
}

impl<'a> RustTypes<'a> {
    pub(crate) fn new(design: &'a ValidatedDesign) -> Self {
        Self {
            design,
            structs: Vec::new(),
        }
    }

    /// Declares `name` for the object attribute `attr`. Inline objects
    /// nested inside are declared first.
    pub(crate) fn object(&mut self, name: &str, attr: AttrId, description: Option<&str>) {
        let design = self.design;
        let mut fields = Vec::new();
        for field in design.fields(attr) {
            let def = design.attribute(field.attr);
            let hint = format!("{name}{}", field.name.to_upper_camel_case());
            let ty = self.type_of(field.attr, &hint, def.view.as_deref());
            fields.push(field_data(&field.name, ty, field.required, def.description.as_deref()));
        }
        self.structs.push(json!({
            "name": type_ident(name),
            "doc": doc_lines(description),
            "fields": fields,
        }));
    }

    /// Declares the struct a result type is rendered as under `view`.
    pub(crate) fn view(&mut self, id: TypeId, view: &ResolvedView) {
        let design = self.design;
        let def = design.user_type(id);
        let name = view_type_name(design, id, Some(&view.name));
        let all = design.type_fields(id);
        let mut fields = Vec::new();
        for listed in &view.fields {
            let Some(field) = all.iter().find(|f| f.name == listed.name) else {
                continue;
            };
            let attr = design.attribute(field.attr);
            let selected = listed.view.as_deref().or(attr.view.as_deref());
            let hint = format!("{name}{}", field.name.to_upper_camel_case());
            let ty = self.type_of(field.attr, &hint, selected);
            let required = view.required.contains(&field.name);
            fields.push(field_data(&field.name, ty, required, attr.description.as_deref()));
        }
        let doc = format!("`{}` rendered with the `{}` view.", def.name, view.name);
        self.structs.push(json!({
            "name": type_ident(&name),
            "doc": [doc],
            "fields": fields,
        }));
    }

    /// Rust type of an attribute. `hint` names the struct declared when the
    /// attribute is an inline object.
    pub(crate) fn type_of(&mut self, attr: AttrId, hint: &str, view: Option<&str>) -> String {
        let design = self.design;
        match &design.attribute(attr).ty {
            DataType::Primitive(p) => primitive_type(*p).to_string(),
            DataType::Array(elem) => {
                format!("Vec<{}>", self.type_of(*elem, &format!("{hint}Item"), view))
            }
            DataType::Map { key, elem } => {
                let key = self.type_of(*key, &format!("{hint}Key"), None);
                let elem = self.type_of(*elem, &format!("{hint}Value"), view);
                format!("std::collections::BTreeMap<{key}, {elem}>")
            }
            DataType::Object(_) => {
                self.object(hint, attr, design.attribute(attr).description.as_deref());
                type_ident(hint)
            }
            DataType::User(id) => type_ident(&view_type_name(design, *id, view)),
            DataType::Pending(_) | DataType::Dangling(_) => "serde_json::Value".to_string(),
        }
    }

    pub(crate) fn take(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.structs)
    }
}

fn field_data(name: &str, ty: String, required: bool, description: Option<&str>) -> Value {
    let ident = field_ident(name);
    let bare = ident.trim_start_matches("r#");
    json!({
        "ident": ident,
        "rename": (bare != name).then(|| name.to_string()),
        "ty": if required { ty } else { format!("Option<{ty}>") },
        "required": required,
        "doc": doc_lines(description),
    })
}
