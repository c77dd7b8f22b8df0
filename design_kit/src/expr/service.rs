use super::{AttrId, Meta, Requirement, ErrorId, GrpcEndpoint, GrpcService, HttpEndpoint, HttpService, MethodId, ServiceId};

/// API-wide metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiDef {
    pub name: String,
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub servers: Vec<String>,
    /// Requirements every method inherits unless its service or itself declares some.
    pub security: Vec<Requirement>,
    pub meta: Meta,
}

#[derive(Debug, Clone)]
pub struct ServiceDef {
    pub name: String,
    pub description: Option<String>,
    pub methods: Vec<MethodId>,
    /// Errors shared by every method of the service.
    pub errors: Vec<ErrorId>,
    pub http: Option<HttpService>,
    pub grpc: Option<GrpcService>,
    pub security: Vec<Requirement>,
    pub meta: Meta,
}

impl ServiceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            methods: Vec::new(),
            errors: Vec::new(),
            http: None,
            grpc: None,
            security: Vec::new(),
            meta: Meta::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub service: ServiceId,
    pub description: Option<String>,
    pub payload: Option<AttrId>,
    pub result: Option<AttrId>,
    pub errors: Vec<MethodError>,
    pub http: Option<HttpEndpoint>,
    pub grpc: Option<GrpcEndpoint>,
    pub security: Vec<Requirement>,
    /// Set by `NoSecurity`: the method ignores inherited requirements.
    pub no_security: bool,
    pub meta: Meta,
    /// `Service.Method`, used for diagnostics.
    pub path: String,
}

impl MethodDef {
    pub fn new(name: impl Into<String>, service: ServiceId, service_name: &str) -> Self {
        let name = name.into();
        Self {
            path: format!("{service_name}.{name}"),
            name,
            service,
            description: None,
            payload: None,
            result: None,
            errors: Vec::new(),
            http: None,
            grpc: None,
            security: Vec::new(),
            no_security: false,
            meta: Meta::new(),
        }
    }
}

/// An error a method may return. `error` is `None` while a reference to a
/// service error is pending, and stays `None` if the name does not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodError {
    pub name: String,
    pub error: Option<ErrorId>,
}

#[derive(Debug, Clone)]
pub struct ErrorDef {
    pub name: String,
    pub description: Option<String>,
    /// Object attribute describing the error body.
    pub attr: AttrId,
    pub status: Option<u16>,
    pub path: String,
}
