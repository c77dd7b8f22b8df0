use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DataType, Meta};

/// An attribute node: its type, its documentation and its validation rules.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    pub ty: DataType,
    pub description: Option<String>,
    /// Set with `required()` from inside the attribute's own builder.
    pub required: bool,
    /// Set with `require([...])` on an object attribute.
    pub required_names: Vec<String>,
    pub validation: Validation,
    pub default: Option<Value>,
    pub example: Option<Value>,
    /// Sub-view used when the attribute is a result type.
    pub view: Option<String>,
    /// `Extend` targets, resolved by name in the finalize pass.
    pub bases: Vec<DataType>,
    /// `Reference` targets, resolved by name in the finalize pass.
    pub references: Vec<DataType>,
    pub meta: Meta,
    /// Dotted location of the node, used for diagnostics.
    pub path: String,
}

impl AttributeDef {
    pub fn new(ty: DataType, path: impl Into<String>) -> Self {
        Self {
            ty,
            description: None,
            required: false,
            required_names: Vec::new(),
            validation: Validation::default(),
            default: None,
            example: None,
            view: None,
            bases: Vec::new(),
            references: Vec::new(),
            meta: Meta::new(),
            path: path.into(),
        }
    }

    /// Inherit documentation, rules and default from `other` where this
    /// attribute declares none.
    pub(crate) fn inherit_from(&mut self, other: &AttributeDef) {
        if self.description.is_none() {
            self.description = other.description.clone();
        }
        if self.default.is_none() {
            self.default = other.default.clone();
        }
        for (key, values) in &other.meta {
            self.meta.entry(key.clone()).or_insert_with(|| values.clone());
        }
        self.validation.inherit_from(&other.validation);
    }
}

/// Validation rules attached to an attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl Validation {
    pub fn is_empty(&self) -> bool {
        *self == Validation::default()
    }

    fn inherit_from(&mut self, other: &Validation) {
        if self.enum_values.is_none() {
            self.enum_values = other.enum_values.clone();
        }
        if self.format.is_none() {
            self.format = other.format;
        }
        if self.pattern.is_none() {
            self.pattern = other.pattern.clone();
        }
        self.min_length = self.min_length.or(other.min_length);
        self.max_length = self.max_length.or(other.max_length);
        self.minimum = self.minimum.or(other.minimum);
        self.maximum = self.maximum.or(other.maximum);
    }
}

/// Well-known string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    Date,
    DateTime,
    Uuid,
    Email,
    Hostname,
    Ipv4,
    Ipv6,
    Ip,
    Uri,
    Mac,
    Cidr,
    Regexp,
    Json,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Date => "date",
            Format::DateTime => "date-time",
            Format::Uuid => "uuid",
            Format::Email => "email",
            Format::Hostname => "hostname",
            Format::Ipv4 => "ipv4",
            Format::Ipv6 => "ipv6",
            Format::Ip => "ip",
            Format::Uri => "uri",
            Format::Mac => "mac",
            Format::Cidr => "cidr",
            Format::Regexp => "regexp",
            Format::Json => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Primitive;
    use serde_json::json;

    #[test]
    fn inheritance_keeps_own_rules() {
        let mut base = AttributeDef::new(DataType::Primitive(Primitive::String), "Base.name");
        base.description = Some("display name".into());
        base.validation.max_length = Some(64);
        base.validation.min_length = Some(1);
        base.default = Some(json!("anonymous"));

        let mut own = AttributeDef::new(DataType::Primitive(Primitive::String), "Child.name");
        own.validation.max_length = Some(16);
        own.inherit_from(&base);

        assert_eq!(own.description.as_deref(), Some("display name"));
        assert_eq!(own.validation.max_length, Some(16));
        assert_eq!(own.validation.min_length, Some(1));
        assert_eq!(own.default, Some(json!("anonymous")));
    }

    #[test]
    fn formats_use_their_wire_names() {
        assert_eq!(Format::DateTime.as_str(), "date-time");
        assert_eq!(serde_json::to_value(Format::Ipv6).unwrap(), json!("ipv6"));
    }
}
