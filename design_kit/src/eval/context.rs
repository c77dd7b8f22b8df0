use std::fmt;

use crate::expr::NodeRef;

/// Every keyword of the DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Api,
    Service,
    Type,
    ResultType,
    Title,
    Version,
    Server,
    Description,
    Method,
    Error,
    Http,
    Grpc,
    Payload,
    Result,
    Attribute,
    Required,
    Extend,
    Reference,
    View,
    Default,
    Enum,
    Format,
    Pattern,
    MinLength,
    MaxLength,
    Minimum,
    Maximum,
    Example,
    UseView,
    Include,
    StatusCode,
    Path,
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Param,
    Body,
    Response,
    Package,
    Status,
    BasicAuthSecurity,
    ApiKeySecurity,
    OAuth2Security,
    JwtSecurity,
    Security,
    NoSecurity,
    Scope,
    Key,
    AuthorizationCodeFlow,
    ImplicitFlow,
    PasswordFlow,
    ClientCredentialsFlow,
    Meta,
}

impl Keyword {
    pub fn name(self) -> &'static str {
        use Keyword::*;
        match self {
            Api => "Api",
            Service => "Service",
            Type => "Type",
            ResultType => "ResultType",
            Title => "Title",
            Version => "Version",
            Server => "Server",
            Description => "Description",
            Method => "Method",
            Error => "Error",
            Http => "HTTP",
            Grpc => "GRPC",
            Payload => "Payload",
            Result => "Result",
            Attribute => "Attribute",
            Required => "Required",
            Extend => "Extend",
            Reference => "Reference",
            View => "View",
            Default => "Default",
            Enum => "Enum",
            Format => "Format",
            Pattern => "Pattern",
            MinLength => "MinLength",
            MaxLength => "MaxLength",
            Minimum => "Minimum",
            Maximum => "Maximum",
            Example => "Example",
            UseView => "UseView",
            Include => "Include",
            StatusCode => "StatusCode",
            Path => "Path",
            Get => "GET",
            Post => "POST",
            Put => "PUT",
            Patch => "PATCH",
            Delete => "DELETE",
            Head => "HEAD",
            Options => "OPTIONS",
            Param => "Param",
            Body => "Body",
            Response => "Response",
            Package => "Package",
            Status => "Status",
            BasicAuthSecurity => "BasicAuthSecurity",
            ApiKeySecurity => "APIKeySecurity",
            OAuth2Security => "OAuth2Security",
            JwtSecurity => "JWTSecurity",
            Security => "Security",
            NoSecurity => "NoSecurity",
            Scope => "Scope",
            Key => "Key",
            AuthorizationCodeFlow => "AuthorizationCodeFlow",
            ImplicitFlow => "ImplicitFlow",
            PasswordFlow => "PasswordFlow",
            ClientCredentialsFlow => "ClientCredentialsFlow",
            Meta => "Meta",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The capability set of a context kind: the closed list of keywords that
/// may be used while a node of this kind is on top of the stack.
#[derive(Debug)]
pub struct Role {
    pub name: &'static str,
    pub keywords: &'static [Keyword],
}

impl Role {
    pub fn allows(&self, keyword: Keyword) -> bool {
        self.keywords.contains(&keyword)
    }
}

use Keyword as K;

pub static TOP: Role = Role {
    name: "top level",
    keywords: &[
        K::Api,
        K::Service,
        K::Type,
        K::ResultType,
        K::BasicAuthSecurity,
        K::ApiKeySecurity,
        K::OAuth2Security,
        K::JwtSecurity,
    ],
};

pub static API: Role = Role {
    name: "Api",
    keywords: &[
        K::Title,
        K::Version,
        K::Description,
        K::Server,
        K::Security,
        K::Meta,
    ],
};

pub static SERVICE: Role = Role {
    name: "Service",
    keywords: &[
        K::Description,
        K::Method,
        K::Error,
        K::Http,
        K::Grpc,
        K::Security,
        K::Meta,
    ],
};

pub static METHOD: Role = Role {
    name: "Method",
    keywords: &[
        K::Description,
        K::Payload,
        K::Result,
        K::Error,
        K::Http,
        K::Grpc,
        K::Security,
        K::NoSecurity,
        K::Meta,
    ],
};

pub static USER_TYPE: Role = Role {
    name: "Type",
    keywords: &[
        K::Description,
        K::Attribute,
        K::Required,
        K::Extend,
        K::Reference,
        K::Meta,
    ],
};

pub static RESULT_TYPE: Role = Role {
    name: "ResultType",
    keywords: &[
        K::Description,
        K::Attribute,
        K::Required,
        K::Extend,
        K::Reference,
        K::View,
        K::Meta,
    ],
};

pub static ATTRIBUTE: Role = Role {
    name: "Attribute",
    keywords: &[
        K::Description,
        K::Attribute,
        K::Required,
        K::Extend,
        K::Reference,
        K::Default,
        K::Enum,
        K::Format,
        K::Pattern,
        K::MinLength,
        K::MaxLength,
        K::Minimum,
        K::Maximum,
        K::Example,
        K::UseView,
        K::Meta,
    ],
};

pub static VIEW: Role = Role {
    name: "View",
    keywords: &[K::Include],
};

pub static ERROR: Role = Role {
    name: "Error",
    keywords: &[
        K::Description,
        K::Attribute,
        K::Required,
        K::StatusCode,
        K::Meta,
    ],
};

pub static SERVICE_HTTP: Role = Role {
    name: "HTTP (service)",
    keywords: &[K::Path],
};

pub static METHOD_HTTP: Role = Role {
    name: "HTTP (method)",
    keywords: &[
        K::Get,
        K::Post,
        K::Put,
        K::Patch,
        K::Delete,
        K::Head,
        K::Options,
        K::Param,
        K::Body,
        K::Response,
    ],
};

pub static SERVICE_GRPC: Role = Role {
    name: "GRPC (service)",
    keywords: &[K::Package],
};

pub static METHOD_GRPC: Role = Role {
    name: "GRPC (method)",
    keywords: &[K::Status],
};

pub static SCHEME: Role = Role {
    name: "security scheme",
    keywords: &[
        K::Description,
        K::Scope,
        K::Key,
        K::AuthorizationCodeFlow,
        K::ImplicitFlow,
        K::PasswordFlow,
        K::ClientCredentialsFlow,
    ],
};

pub static SECURITY: Role = Role {
    name: "Security",
    keywords: &[K::Scope],
};

/// One entry of the context stack.
#[derive(Debug, Clone)]
pub struct Frame {
    pub role: &'static Role,
    pub node: NodeRef,
    pub label: String,
}
