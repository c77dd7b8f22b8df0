use std::collections::BTreeSet;

use super::Validator;
use crate::expr::{Requirement, SchemeKind, SecurityOwner};

impl Validator {
    /// Every scheme a requirement names exists, every scope it asks for is
    /// declared by one of those schemes, and OAuth2 schemes have a flow.
    pub(super) fn check_security(&mut self) {
        let mut problems = Vec::new();
        for scheme in self.graph.schemes() {
            if scheme.kind == SchemeKind::OAuth2 && scheme.flows.is_empty() {
                problems.push((
                    scheme.name.clone(),
                    format!("OAuth2 scheme \"{}\" declares no flow", scheme.name),
                ));
            }
        }

        let mut owners = vec![SecurityOwner::Api];
        let mut services: Vec<_> = self.graph.services().collect();
        services.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        for (sid, service) in services {
            owners.push(SecurityOwner::Service(sid));
            let mut methods = service.methods.clone();
            methods.sort_by(|a, b| self.graph.method(*a).name.cmp(&self.graph.method(*b).name));
            owners.extend(methods.into_iter().map(SecurityOwner::Method));
        }
        for owner in owners {
            for requirement in self.graph.requirements(owner) {
                problems.extend(self.requirement_problems(requirement));
            }
        }

        for (path, message) in problems {
            self.report(path, message);
        }
    }

    fn requirement_problems(&self, requirement: &Requirement) -> Vec<(String, String)> {
        let mut problems = Vec::new();
        let mut scoped = Vec::new();
        for name in &requirement.schemes {
            match self.graph.find_scheme(name) {
                None => problems.push((
                    requirement.path.clone(),
                    format!("security scheme \"{name}\" not found"),
                )),
                Some(scheme) if scheme.kind.has_scopes() => scoped.push(scheme),
                Some(_) => {}
            }
        }
        if !problems.is_empty() {
            return problems;
        }
        for scope in &requirement.scopes {
            if scoped.iter().any(|s| s.scope(scope).is_some()) {
                continue;
            }
            let names: BTreeSet<&str> = requirement.schemes.iter().map(String::as_str).collect();
            let names: Vec<&str> = names.into_iter().collect();
            problems.push((
                requirement.path.clone(),
                format!("scope \"{scope}\" is not declared by {}", names.join(", ")),
            ));
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::Design;

    fn messages(design: Design) -> Vec<(String, String)> {
        match design.compile() {
            Ok(_) => Vec::new(),
            Err(found) => found
                .iter()
                .map(|d| (d.path.clone(), d.message.clone()))
                .collect(),
        }
    }

    #[test]
    fn unknown_schemes_are_reported_where_they_are_required() {
        let mut design = Design::new();
        design.top(|d| d.jwt_security("jwt", |_| Ok(())));
        design.service("Catalog", |d| {
            d.method("Get", |d| d.security(["jwt", "session"]))
        });
        assert_eq!(
            messages(design),
            [(
                "Catalog.Get.Security".to_string(),
                "security scheme \"session\" not found".to_string()
            )]
        );
    }

    #[test]
    fn scopes_must_be_declared_by_a_listed_scheme() {
        let mut design = Design::new();
        design.top(|d| {
            d.oauth2_security("oauth", |d| {
                d.client_credentials_flow("https://auth/token", "")?;
                d.scope("items:read")
            })
        });
        design.top(|d| d.basic_auth_security("basic", |_| Ok(())));
        design.api("shop", |d| {
            d.security_with(["oauth"], |d| d.scope("items:read"))?;
            d.security_with(["basic", "oauth"], |d| d.scope("items:write"))
        });
        assert_eq!(
            messages(design),
            [(
                "shop.Security".to_string(),
                "scope \"items:write\" is not declared by basic, oauth".to_string()
            )]
        );
    }

    #[test]
    fn oauth2_schemes_need_a_flow() {
        let mut design = Design::new();
        design.top(|d| d.oauth2_security("oauth", |d| d.scope("items:read")));
        assert_eq!(
            messages(design),
            [(
                "oauth".to_string(),
                "OAuth2 scheme \"oauth\" declares no flow".to_string()
            )]
        );
    }

    #[test]
    fn resolved_requirements_pass() {
        let mut design = Design::new();
        design.top(|d| d.jwt_security("jwt", |d| d.scope("admin")));
        design.service("Admin", |d| {
            d.security_with(["jwt"], |d| d.scope("admin"))?;
            d.method("Health", |d| d.no_security())
        });
        assert!(messages(design).is_empty());
    }
}
