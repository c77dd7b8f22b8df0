//! The expression graph.
//!
//! Every node lives in an arena owned by [`Graph`] and is addressed by a typed
//! id. Ids are the unit of reference: two inline objects with the same shape
//! are two nodes, while every attribute typed by the same user type points at
//! the same [`TypeId`].

mod attribute;
mod http;
mod security;
mod service;
mod types;

pub use attribute::{AttributeDef, Format, Validation};
pub use http::{GrpcEndpoint, GrpcService, HttpEndpoint, HttpMethod, HttpService, Route};
pub use security::{
    FlowDef, FlowKind, KeyLocation, Meta, Requirement, SchemeDef, SchemeKind, ScopeDef,
};
pub use service::{ApiDef, ErrorDef, MethodDef, MethodError, ServiceDef};
pub use types::{
    array_of, map_of, object, DataType, Field, Object, Primitive, TypeSpec, UserTypeDef, ViewDef,
    ViewField,
};

use serde::Serialize;

macro_rules! arena_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
            pub struct $name(pub(crate) usize);

            impl $name {
                pub fn index(self) -> usize {
                    self.0
                }
            }
        )*
    };
}

arena_id!(
    /// An attribute node: a field, a payload, a collection element, a type body.
    AttrId,
    /// A named user type or result type.
    TypeId,
    ServiceId,
    MethodId,
    ErrorId,
);

/// The node a context frame is configuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    /// The design root: the empty context stack.
    Root,
    Api,
    Service(ServiceId),
    Method(MethodId),
    Error(ErrorId),
    Type(TypeId),
    Attribute(AttrId),
    View(TypeId, usize),
    ServiceHttp(ServiceId),
    MethodHttp(MethodId),
    ServiceGrpc(ServiceId),
    MethodGrpc(MethodId),
    /// A security scheme, by index into the scheme list.
    Scheme(usize),
    /// The requirement most recently appended to its owner.
    Security(SecurityOwner),
}

/// The node a `Security` requirement is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityOwner {
    Api,
    Service(ServiceId),
    Method(MethodId),
}

/// The design root. Created once per design load, mutated by the builders,
/// the finalize pass and the validator, then frozen.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub(crate) api: Option<ApiDef>,
    pub(crate) services: Vec<ServiceDef>,
    pub(crate) methods: Vec<MethodDef>,
    pub(crate) errors: Vec<ErrorDef>,
    pub(crate) attributes: Vec<AttributeDef>,
    pub(crate) types: Vec<UserTypeDef>,
    pub(crate) schemes: Vec<SchemeDef>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api(&self) -> Option<&ApiDef> {
        self.api.as_ref()
    }

    pub fn service(&self, id: ServiceId) -> &ServiceDef {
        &self.services[id.0]
    }

    pub fn method(&self, id: MethodId) -> &MethodDef {
        &self.methods[id.0]
    }

    pub fn error(&self, id: ErrorId) -> &ErrorDef {
        &self.errors[id.0]
    }

    pub fn attribute(&self, id: AttrId) -> &AttributeDef {
        &self.attributes[id.0]
    }

    pub fn user_type(&self, id: TypeId) -> &UserTypeDef {
        &self.types[id.0]
    }

    /// Security schemes in declaration order.
    pub fn schemes(&self) -> &[SchemeDef] {
        &self.schemes
    }

    pub fn find_scheme(&self, name: &str) -> Option<&SchemeDef> {
        self.schemes.iter().find(|s| s.name == name)
    }

    /// Requirements attached to `owner`, in declaration order.
    pub fn requirements(&self, owner: SecurityOwner) -> &[Requirement] {
        match owner {
            SecurityOwner::Api => match &self.api {
                Some(api) => &api.security,
                None => &[],
            },
            SecurityOwner::Service(id) => &self.service(id).security,
            SecurityOwner::Method(id) => &self.method(id).security,
        }
    }

    pub(crate) fn requirements_mut(&mut self, owner: SecurityOwner) -> Option<&mut Vec<Requirement>> {
        match owner {
            SecurityOwner::Api => self.api.as_mut().map(|a| &mut a.security),
            SecurityOwner::Service(id) => Some(&mut self.service_mut(id).security),
            SecurityOwner::Method(id) => Some(&mut self.method_mut(id).security),
        }
    }

    /// Annotations of the node a frame configures; types and errors carry
    /// theirs on the body attribute.
    pub(crate) fn meta_mut(&mut self, node: NodeRef) -> Option<&mut Meta> {
        let attr = match node {
            NodeRef::Api => return self.api.as_mut().map(|a| &mut a.meta),
            NodeRef::Service(id) => return Some(&mut self.service_mut(id).meta),
            NodeRef::Method(id) => return Some(&mut self.method_mut(id).meta),
            NodeRef::Type(id) => self.user_type(id).attr,
            NodeRef::Error(id) => self.error(id).attr,
            NodeRef::Attribute(id) => id,
            _ => return None,
        };
        Some(&mut self.attribute_mut(attr).meta)
    }

    /// Services in declaration order.
    pub fn services(&self) -> impl Iterator<Item = (ServiceId, &ServiceDef)> {
        self.services.iter().enumerate().map(|(i, s)| (ServiceId(i), s))
    }

    /// User and result types in declaration order.
    pub fn user_types(&self) -> impl Iterator<Item = (TypeId, &UserTypeDef)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId(i), t))
    }

    pub fn attributes(&self) -> impl Iterator<Item = (AttrId, &AttributeDef)> {
        self.attributes.iter().enumerate().map(|(i, a)| (AttrId(i), a))
    }

    /// The first type declared under `name`. Later duplicates are reported by
    /// the validator and never win a lookup.
    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        self.types.iter().position(|t| t.name == name).map(TypeId)
    }

    pub fn find_service(&self, name: &str) -> Option<ServiceId> {
        self.services.iter().position(|s| s.name == name).map(ServiceId)
    }

    pub(crate) fn attribute_mut(&mut self, id: AttrId) -> &mut AttributeDef {
        &mut self.attributes[id.0]
    }

    pub(crate) fn service_mut(&mut self, id: ServiceId) -> &mut ServiceDef {
        &mut self.services[id.0]
    }

    pub(crate) fn method_mut(&mut self, id: MethodId) -> &mut MethodDef {
        &mut self.methods[id.0]
    }

    pub(crate) fn error_mut(&mut self, id: ErrorId) -> &mut ErrorDef {
        &mut self.errors[id.0]
    }

    pub(crate) fn user_type_mut(&mut self, id: TypeId) -> &mut UserTypeDef {
        &mut self.types[id.0]
    }

    pub(crate) fn add_attribute(&mut self, def: AttributeDef) -> AttrId {
        self.attributes.push(def);
        AttrId(self.attributes.len() - 1)
    }

    pub(crate) fn add_type(&mut self, def: UserTypeDef) -> TypeId {
        self.types.push(def);
        TypeId(self.types.len() - 1)
    }

    pub(crate) fn add_service(&mut self, def: ServiceDef) -> ServiceId {
        self.services.push(def);
        ServiceId(self.services.len() - 1)
    }

    pub(crate) fn add_method(&mut self, def: MethodDef) -> MethodId {
        self.methods.push(def);
        MethodId(self.methods.len() - 1)
    }

    pub(crate) fn add_error(&mut self, def: ErrorDef) -> ErrorId {
        self.errors.push(def);
        ErrorId(self.errors.len() - 1)
    }

    /// The object an attribute describes, following a user type reference.
    pub fn object_of(&self, id: AttrId) -> Option<(AttrId, &Object)> {
        match &self.attribute(id).ty {
            DataType::Object(object) => Some((id, object)),
            DataType::User(t) => {
                let body = self.user_type(*t).attr;
                match &self.attribute(body).ty {
                    DataType::Object(object) => Some((body, object)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Human readable type name used in diagnostics.
    pub fn type_name(&self, ty: &DataType) -> String {
        match ty {
            DataType::Primitive(p) => p.name().to_string(),
            DataType::Array(elem) => format!("ArrayOf({})", self.type_name(&self.attribute(*elem).ty)),
            DataType::Map { key, elem } => format!(
                "MapOf({}, {})",
                self.type_name(&self.attribute(*key).ty),
                self.type_name(&self.attribute(*elem).ty)
            ),
            DataType::Object(_) => "Object".to_string(),
            DataType::User(t) => self.user_type(*t).name.clone(),
            DataType::Pending(name) | DataType::Dangling(name) => name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(graph: &mut Graph, ty: DataType) -> AttrId {
        graph.add_attribute(AttributeDef::new(ty, "test"))
    }

    #[test]
    fn find_type_returns_first_declaration() {
        let mut graph = Graph::new();
        let a = attr(&mut graph, DataType::Object(Object::default()));
        let b = attr(&mut graph, DataType::Object(Object::default()));
        let first = graph.add_type(UserTypeDef::new("Item", a, false));
        graph.add_type(UserTypeDef::new("Item", b, false));
        assert_eq!(graph.find_type("Item"), Some(first));
        assert_eq!(graph.find_type("Missing"), None);
    }

    #[test]
    fn object_of_follows_user_types() {
        let mut graph = Graph::new();
        let id = attr(&mut graph, DataType::Primitive(Primitive::String));
        let mut object = Object::default();
        object.push("id", id);
        let body = attr(&mut graph, DataType::Object(object));
        let item = graph.add_type(UserTypeDef::new("Item", body, false));
        let field = attr(&mut graph, DataType::User(item));

        let (resolved, object) = graph.object_of(field).unwrap();
        assert_eq!(resolved, body);
        assert_eq!(object.get("id"), Some(id));
        assert!(graph.object_of(id).is_none());
    }

    #[test]
    fn type_names_read_like_the_dsl() {
        let mut graph = Graph::new();
        let key = attr(&mut graph, DataType::Primitive(Primitive::String));
        let elem = attr(&mut graph, DataType::Primitive(Primitive::Int64));
        let list = attr(&mut graph, DataType::Array(elem));
        assert_eq!(graph.type_name(&graph.attribute(list).ty), "ArrayOf(Int64)");
        assert_eq!(
            graph.type_name(&DataType::Map { key, elem }),
            "MapOf(String, Int64)"
        );
    }
}
