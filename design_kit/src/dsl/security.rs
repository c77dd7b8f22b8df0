use crate::eval::{Dsl, DslResult, Keyword, SCHEME, SECURITY};
use crate::expr::{
    FlowDef, FlowKind, KeyLocation, NodeRef, Requirement, SchemeDef, SchemeKind, ScopeDef,
    SecurityOwner,
};

type NoBuilder = fn(&mut Dsl) -> DslResult;

const NO_DESCRIPTION: &str = "no description";

impl Dsl {
    pub fn basic_auth_security<F>(&mut self, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.security_scheme(SchemeKind::BasicAuth, name, f)
    }

    /// A key sent in the `Authorization` header unless [`Dsl::key`] says
    /// otherwise.
    pub fn api_key_security<F>(&mut self, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.security_scheme(SchemeKind::ApiKey, name, f)
    }

    /// An OAuth2 scheme. At least one flow must be declared.
    pub fn oauth2_security<F>(&mut self, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.security_scheme(SchemeKind::OAuth2, name, f)
    }

    pub fn jwt_security<F>(&mut self, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.security_scheme(SchemeKind::Jwt, name, f)
    }

    /// Declares a named scheme. Names are unique across kinds.
    pub fn security_scheme<F>(&mut self, kind: SchemeKind, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        let keyword = match kind {
            SchemeKind::BasicAuth => Keyword::BasicAuthSecurity,
            SchemeKind::ApiKey => Keyword::ApiKeySecurity,
            SchemeKind::OAuth2 => Keyword::OAuth2Security,
            SchemeKind::Jwt => Keyword::JwtSecurity,
        };
        self.enter(keyword)?;
        if self.graph.find_scheme(name).is_some() {
            let message = format!("security scheme \"{name}\" is already defined");
            return self.fail_at(name.to_string(), message);
        }
        self.graph.schemes.push(SchemeDef::new(name, kind));
        let index = self.graph.schemes.len() - 1;
        self.nest(&SCHEME, NodeRef::Scheme(index), name, f)
    }

    /// Requires every scheme listed. Several `security` calls on one node
    /// are alternatives: satisfying any one of them is enough.
    pub fn security<I, S>(&mut self, schemes: I) -> DslResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_requirement::<NoBuilder, _, _>(schemes, None)
    }

    /// Like [`Dsl::security`], with scopes listed by the closure.
    pub fn security_with<I, S, F>(&mut self, schemes: I, f: F) -> DslResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.add_requirement(schemes, Some(f))
    }

    fn add_requirement<F, I, S>(&mut self, schemes: I, f: Option<F>) -> DslResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        let owner = match self.enter(Keyword::Security)? {
            NodeRef::Api => SecurityOwner::Api,
            NodeRef::Service(id) => SecurityOwner::Service(id),
            NodeRef::Method(id) => SecurityOwner::Method(id),
            _ => return self.misplaced(Keyword::Security),
        };
        let schemes: Vec<String> = schemes.into_iter().map(Into::into).collect();
        if schemes.is_empty() {
            return self.fail("Security requires at least one scheme");
        }
        let requirement = Requirement {
            schemes,
            scopes: Vec::new(),
            path: self.child_path(Keyword::Security.name()),
        };
        let Some(list) = self.graph.requirements_mut(owner) else {
            return self.misplaced(Keyword::Security);
        };
        list.push(requirement);
        match f {
            Some(f) => self.nest(&SECURITY, NodeRef::Security(owner), Keyword::Security.name(), f),
            None => Ok(()),
        }
    }

    /// The method is public: inherited requirements do not apply.
    pub fn no_security(&mut self) -> DslResult {
        let NodeRef::Method(id) = self.enter(Keyword::NoSecurity)? else {
            return self.misplaced(Keyword::NoSecurity);
        };
        self.graph.method_mut(id).no_security = true;
        Ok(())
    }

    /// In a scheme, declares a scope; in a requirement, asks for one.
    pub fn scope(&mut self, name: &str) -> DslResult {
        match self.enter(Keyword::Scope)? {
            NodeRef::Scheme(_) => self.scope_described(name, NO_DESCRIPTION),
            NodeRef::Security(owner) => {
                if let Some(requirement) = self
                    .graph
                    .requirements_mut(owner)
                    .and_then(|list| list.last_mut())
                {
                    if !requirement.scopes.iter().any(|s| s == name) {
                        requirement.scopes.push(name.to_string());
                    }
                }
                Ok(())
            }
            _ => self.misplaced(Keyword::Scope),
        }
    }

    /// Declares a scope of the scheme being configured.
    pub fn scope_described(&mut self, name: &str, description: &str) -> DslResult {
        let NodeRef::Scheme(index) = self.enter(Keyword::Scope)? else {
            return self.fail("scope descriptions belong to security schemes");
        };
        let scheme = &mut self.graph.schemes[index];
        if scheme.scope(name).is_some() {
            return self.fail(format!("scope \"{name}\" is already defined"));
        }
        scheme.scopes.push(ScopeDef {
            name: name.to_string(),
            description: description.to_string(),
        });
        Ok(())
    }

    /// Where an `APIKey` or `JWT` scheme reads its credential.
    pub fn key(&mut self, location: KeyLocation, name: &str) -> DslResult {
        let NodeRef::Scheme(index) = self.enter(Keyword::Key)? else {
            return self.misplaced(Keyword::Key);
        };
        let kind = self.graph.schemes[index].kind;
        if !matches!(kind, SchemeKind::ApiKey | SchemeKind::Jwt) {
            return self.fail(format!("Key is not valid for {} schemes", kind.as_str()));
        }
        self.graph.schemes[index].location = Some((location, name.to_string()));
        Ok(())
    }

    pub fn authorization_code_flow(
        &mut self,
        authorization_url: &str,
        token_url: &str,
        refresh_url: &str,
    ) -> DslResult {
        self.flow(
            Keyword::AuthorizationCodeFlow,
            FlowKind::AuthorizationCode,
            Some(authorization_url),
            Some(token_url),
            refresh_url,
        )
    }

    pub fn implicit_flow(&mut self, authorization_url: &str, refresh_url: &str) -> DslResult {
        self.flow(
            Keyword::ImplicitFlow,
            FlowKind::Implicit,
            Some(authorization_url),
            None,
            refresh_url,
        )
    }

    pub fn password_flow(&mut self, token_url: &str, refresh_url: &str) -> DslResult {
        self.flow(Keyword::PasswordFlow, FlowKind::Password, None, Some(token_url), refresh_url)
    }

    pub fn client_credentials_flow(&mut self, token_url: &str, refresh_url: &str) -> DslResult {
        self.flow(
            Keyword::ClientCredentialsFlow,
            FlowKind::ClientCredentials,
            None,
            Some(token_url),
            refresh_url,
        )
    }

    /// An empty refresh URL means none.
    fn flow(
        &mut self,
        keyword: Keyword,
        kind: FlowKind,
        authorization_url: Option<&str>,
        token_url: Option<&str>,
        refresh_url: &str,
    ) -> DslResult {
        let NodeRef::Scheme(index) = self.enter(keyword)? else {
            return self.misplaced(keyword);
        };
        let scheme = &self.graph.schemes[index];
        if scheme.kind != SchemeKind::OAuth2 {
            let kind = scheme.kind.as_str();
            return self.fail(format!("{keyword} is only valid for OAuth2 schemes, not {kind}"));
        }
        if scheme.flows.iter().any(|f| f.kind == kind) {
            return self.fail(format!("{keyword} is already defined"));
        }
        if authorization_url.is_some_and(str::is_empty) || token_url.is_some_and(str::is_empty) {
            return self.fail(format!("{keyword} requires non-empty URLs"));
        }
        self.graph.schemes[index].flows.push(FlowDef {
            kind,
            authorization_url: authorization_url.map(str::to_string),
            token_url: token_url.map(str::to_string),
            refresh_url: Some(refresh_url).filter(|u| !u.is_empty()).map(str::to_string),
        });
        Ok(())
    }

    /// Appends values under `key` on the node being configured. Targets read
    /// the keys they know and ignore the rest.
    pub fn meta<I, S>(&mut self, key: &str, values: I) -> DslResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let node = self.enter(Keyword::Meta)?;
        let Some(meta) = self.graph.meta_mut(node) else {
            return self.misplaced(Keyword::Meta);
        };
        meta.entry(key.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        Ok(())
    }
}
