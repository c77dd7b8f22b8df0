use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Methods whose payload travels in the request body by default.
    pub fn has_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service-level HTTP binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpService {
    /// Prefix prepended to every route of the service.
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
}

/// Method-level HTTP binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpEndpoint {
    pub routes: Vec<Route>,
    /// Payload attributes read from the query string.
    pub params: Vec<String>,
    /// Payload attribute used as the whole request body.
    pub body: Option<String>,
    /// Success status codes.
    pub responses: Vec<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrpcService {
    pub package: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcEndpoint {
    pub status: String,
}

impl Default for GrpcEndpoint {
    fn default() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}
