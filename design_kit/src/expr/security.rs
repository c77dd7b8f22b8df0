use std::collections::BTreeMap;

/// Key/value annotations read by targets, e.g. `openapi:summary`.
pub type Meta = BTreeMap<String, Vec<String>>;

/// How a scheme carries its credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeKind {
    BasicAuth,
    ApiKey,
    OAuth2,
    Jwt,
}

impl SchemeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemeKind::BasicAuth => "BasicAuth",
            SchemeKind::ApiKey => "APIKey",
            SchemeKind::OAuth2 => "OAuth2",
            SchemeKind::Jwt => "JWT",
        }
    }

    /// Schemes whose requirements may list scopes.
    pub fn has_scopes(self) -> bool {
        matches!(self, SchemeKind::OAuth2 | SchemeKind::Jwt)
    }
}

/// Where an API key or token is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLocation {
    Header,
    Query,
}

impl KeyLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyLocation::Header => "header",
            KeyLocation::Query => "query",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    AuthorizationCode,
    Implicit,
    Password,
    ClientCredentials,
}

impl FlowKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowKind::AuthorizationCode => "authorization_code",
            FlowKind::Implicit => "implicit",
            FlowKind::Password => "password",
            FlowKind::ClientCredentials => "client_credentials",
        }
    }
}

/// An OAuth2 flow. Which URLs are set depends on the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowDef {
    pub kind: FlowKind,
    pub authorization_url: Option<String>,
    pub token_url: Option<String>,
    pub refresh_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeDef {
    pub name: String,
    pub description: String,
}

/// A named security scheme declared at the top level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeDef {
    pub name: String,
    pub kind: SchemeKind,
    pub description: Option<String>,
    pub scopes: Vec<ScopeDef>,
    pub flows: Vec<FlowDef>,
    /// Location of the key for `APIKey` and `JWT` schemes.
    pub location: Option<(KeyLocation, String)>,
}

impl SchemeDef {
    pub fn new(name: impl Into<String>, kind: SchemeKind) -> Self {
        let location = match kind {
            SchemeKind::ApiKey | SchemeKind::Jwt => {
                Some((KeyLocation::Header, "Authorization".to_string()))
            }
            _ => None,
        };
        Self {
            name: name.into(),
            kind,
            description: None,
            scopes: Vec::new(),
            flows: Vec::new(),
            location,
        }
    }

    pub fn scope(&self, name: &str) -> Option<&ScopeDef> {
        self.scopes.iter().find(|s| s.name == name)
    }
}

/// One way to satisfy the security of an operation: every scheme listed,
/// with the scopes listed. Scheme names are checked by the validator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirement {
    pub schemes: Vec<String>,
    pub scopes: Vec<String>,
    /// Dotted location of the `Security` expression, used for diagnostics.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_schemes_default_to_the_authorization_header() {
        let jwt = SchemeDef::new("jwt", SchemeKind::Jwt);
        assert_eq!(jwt.location, Some((KeyLocation::Header, "Authorization".into())));
        assert_eq!(SchemeDef::new("basic", SchemeKind::BasicAuth).location, None);
        assert!(SchemeKind::OAuth2.has_scopes());
        assert!(!SchemeKind::ApiKey.has_scopes());
    }
}
