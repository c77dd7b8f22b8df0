//! The validator.
//!
//! Turns an evaluated [`Graph`] into a [`ValidatedDesign`], or into the full
//! list of problems found. Passes never stop at the first problem: each one
//! appends to the same [`Diagnostics`] and later passes skip what an earlier
//! pass already reported (for instance dangling references).

mod cycles;
mod extend;
mod http;
mod rules;
mod security;
mod views;

pub use http::wildcards;
pub use views::DEFAULT_VIEW;

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::diagnostic::Diagnostics;
use crate::expr::{
    ApiDef, AttrId, AttributeDef, DataType, ErrorDef, Graph, MethodDef, MethodId, Requirement,
    Route, SchemeDef, SecurityOwner, ServiceDef, ServiceId, TypeId, UserTypeDef, ViewField,
};

/// An attribute of an object after extension: base attributes first, in the
/// base's order, with overrides replaced in place, then own additions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedField {
    pub name: String,
    pub attr: AttrId,
    pub required: bool,
}

/// A view of a result type with its effective required set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedView {
    pub name: String,
    pub fields: Vec<ViewField>,
    pub required: Vec<String>,
}

pub(crate) struct Validator {
    graph: Graph,
    diagnostics: Diagnostics,
    resolved: HashMap<AttrId, Vec<ResolvedField>>,
    views: HashMap<TypeId, Vec<ResolvedView>>,
    type_order: Vec<TypeId>,
}

/// Runs every validation pass over `graph`.
///
/// Returns the frozen design when no diagnostic was found, every diagnostic
/// otherwise.
pub fn validate(graph: Graph) -> Result<ValidatedDesign, Diagnostics> {
    let mut validator = Validator {
        graph,
        diagnostics: Diagnostics::new(),
        resolved: HashMap::new(),
        views: HashMap::new(),
        type_order: Vec::new(),
    };
    validator.check_namespaces();
    validator.check_references();
    validator.check_security();
    validator.resolve_extensions();
    validator.apply_references();
    validator.check_required_names();
    validator.check_cycles();
    validator.resolve_views();
    validator.check_rules();
    validator.check_http();
    validator.order_types();
    debug!(diagnostics = validator.diagnostics.len(), "validation finished");

    if validator.diagnostics.is_empty() {
        Ok(ValidatedDesign {
            graph: validator.graph,
            resolved: validator.resolved,
            views: validator.views,
            type_order: validator.type_order,
        })
    } else {
        Err(validator.diagnostics)
    }
}

impl Validator {
    fn report(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(path, message);
    }

    fn fields_of(&self, attr: AttrId) -> &[ResolvedField] {
        let attr = match &self.graph.attribute(attr).ty {
            DataType::User(t) => self.graph.user_type(*t).attr,
            _ => attr,
        };
        self.resolved.get(&attr).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A design that passed validation. Read only: targets share one instance
/// across threads during generation.
#[derive(Debug)]
pub struct ValidatedDesign {
    graph: Graph,
    resolved: HashMap<AttrId, Vec<ResolvedField>>,
    views: HashMap<TypeId, Vec<ResolvedView>>,
    type_order: Vec<TypeId>,
}

impl ValidatedDesign {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn api(&self) -> Option<&ApiDef> {
        self.graph.api()
    }

    /// Services sorted by name.
    pub fn services(&self) -> Vec<(ServiceId, &ServiceDef)> {
        let mut services: Vec<_> = self.graph.services().collect();
        services.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        services
    }

    pub fn service(&self, id: ServiceId) -> &ServiceDef {
        self.graph.service(id)
    }

    /// Methods of a service sorted by name.
    pub fn methods(&self, service: ServiceId) -> Vec<(MethodId, &MethodDef)> {
        let mut methods: Vec<_> = self
            .graph
            .service(service)
            .methods
            .iter()
            .map(|id| (*id, self.graph.method(*id)))
            .collect();
        methods.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        methods
    }

    pub fn method(&self, id: MethodId) -> &MethodDef {
        self.graph.method(id)
    }

    pub fn attribute(&self, id: AttrId) -> &AttributeDef {
        self.graph.attribute(id)
    }

    pub fn user_type(&self, id: TypeId) -> &UserTypeDef {
        self.graph.user_type(id)
    }

    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        self.graph.find_type(name)
    }

    /// Resolved attributes of an object attribute, following user types.
    /// Empty for anything that is not an object.
    pub fn fields(&self, attr: AttrId) -> &[ResolvedField] {
        let attr = match &self.graph.attribute(attr).ty {
            DataType::User(t) => self.graph.user_type(*t).attr,
            _ => attr,
        };
        self.resolved.get(&attr).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn type_fields(&self, id: TypeId) -> &[ResolvedField] {
        self.fields(self.graph.user_type(id).attr)
    }

    /// Views of a result type, explicit ones first, then the implicit
    /// `default` view when none was declared. Empty for user types.
    pub fn views(&self, id: TypeId) -> &[ResolvedView] {
        self.views.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn view(&self, id: TypeId, name: &str) -> Option<&ResolvedView> {
        self.views(id).iter().find(|v| v.name == name)
    }

    /// User and result types, every type after the types it references.
    pub fn type_order(&self) -> &[TypeId] {
        &self.type_order
    }

    /// Errors a method may return: its own and the service errors it names,
    /// followed by the remaining service errors.
    pub fn method_errors(&self, id: MethodId) -> Vec<&ErrorDef> {
        let method = self.graph.method(id);
        let mut errors: Vec<&ErrorDef> = method
            .errors
            .iter()
            .filter_map(|e| e.error)
            .map(|e| self.graph.error(e))
            .collect();
        for shared in &self.graph.service(method.service).errors {
            let error = self.graph.error(*shared);
            if !errors.iter().any(|e| e.name == error.name) {
                errors.push(error);
            }
        }
        errors
    }

    pub fn service_errors(&self, id: ServiceId) -> Vec<&ErrorDef> {
        self.graph
            .service(id)
            .errors
            .iter()
            .map(|e| self.graph.error(*e))
            .collect()
    }

    /// Security schemes sorted by name.
    pub fn schemes(&self) -> Vec<&SchemeDef> {
        let mut schemes: Vec<_> = self.graph.schemes().iter().collect();
        schemes.sort_by(|a, b| a.name.cmp(&b.name));
        schemes
    }

    /// Requirements that apply to a method: its own, else its service's,
    /// else the API's. Empty when the method opted out with `NoSecurity`.
    pub fn requirements(&self, id: MethodId) -> &[Requirement] {
        let method = self.graph.method(id);
        if method.no_security {
            return &[];
        }
        [
            SecurityOwner::Method(id),
            SecurityOwner::Service(method.service),
            SecurityOwner::Api,
        ]
        .into_iter()
        .map(|owner| self.graph.requirements(owner))
        .find(|list| !list.is_empty())
        .unwrap_or(&[])
    }

    /// HTTP routes of a method with the service prefix applied.
    pub fn routes(&self, id: MethodId) -> Vec<Route> {
        let method = self.graph.method(id);
        let prefix = self
            .graph
            .service(method.service)
            .http
            .as_ref()
            .and_then(|h| h.path.as_deref())
            .unwrap_or("");
        method
            .http
            .iter()
            .flat_map(|h| h.routes.iter())
            .map(|r| Route {
                method: r.method,
                path: http::join_path(prefix, &r.path),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::STRING;
    use crate::eval::Design;

    fn assert_sync<T: Send + Sync>() {}

    #[test]
    fn validated_design_can_be_shared_between_threads() {
        assert_sync::<ValidatedDesign>();
    }

    #[test]
    fn services_and_methods_are_sorted_by_name() {
        let mut design = Design::new();
        design.service("Zoo", |d| {
            d.method("Feed", |_| Ok(()))?;
            d.method("Count", |_| Ok(()))
        });
        design.service("Aquarium", |_| Ok(()));
        let validated = design.compile().unwrap();

        let services: Vec<_> = validated.services().iter().map(|s| s.1.name.clone()).collect();
        assert_eq!(services, ["Aquarium", "Zoo"]);
        let zoo = validated.graph().find_service("Zoo").unwrap();
        let methods: Vec<_> = validated.methods(zoo).iter().map(|m| m.1.name.clone()).collect();
        assert_eq!(methods, ["Count", "Feed"]);
    }

    #[test]
    fn routes_carry_the_service_prefix() {
        let mut design = Design::new();
        design.service("Catalog", |d| {
            d.http(|d| d.path("/v1/"))?;
            d.method("List", |d| d.http(|d| d.get("/items")))
        });
        let validated = design.compile().unwrap();
        let catalog = validated.graph().find_service("Catalog").unwrap();
        let (list, _) = validated.methods(catalog)[0];
        assert_eq!(validated.routes(list)[0].path, "/v1/items");
    }

    #[test]
    fn requirements_fall_back_from_method_to_service_to_api() {
        let mut design = Design::new();
        design.top(|d| d.jwt_security("jwt", |_| Ok(())));
        design.top(|d| d.basic_auth_security("basic", |_| Ok(())));
        design.api("shop", |d| d.security(["basic"]));
        design.service("Catalog", |d| {
            d.security(["jwt"])?;
            d.method("Get", |_| Ok(()))?;
            d.method("Login", |d| d.security(["basic"]))?;
            d.method("Health", |d| d.no_security())
        });
        design.service("Status", |d| d.method("Ping", |_| Ok(())));
        let validated = design.compile().unwrap();

        let schemes = |sid| {
            validated
                .methods(sid)
                .into_iter()
                .map(|(mid, m)| {
                    let names: Vec<_> = validated
                        .requirements(mid)
                        .iter()
                        .flat_map(|r| r.schemes.clone())
                        .collect();
                    (m.name.clone(), names)
                })
                .collect::<Vec<_>>()
        };
        let catalog = validated.graph().find_service("Catalog").unwrap();
        assert_eq!(
            schemes(catalog),
            [
                ("Get".to_string(), vec!["jwt".to_string()]),
                ("Health".to_string(), vec![]),
                ("Login".to_string(), vec!["basic".to_string()]),
            ]
        );
        let status = validated.graph().find_service("Status").unwrap();
        assert_eq!(schemes(status), [("Ping".to_string(), vec!["basic".to_string()])]);
        let names: Vec<_> = validated.schemes().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["basic", "jwt"]);
    }

    #[test]
    fn fields_follow_user_types() {
        let mut design = Design::new();
        design.user_type("Item", |d| d.attribute("id", STRING));
        design.user_type("Order", |d| d.attribute("item", "Item"));
        let validated = design.compile().unwrap();
        let order = validated.find_type("Order").unwrap();
        let item_attr = validated.type_fields(order)[0].attr;
        let names: Vec<_> = validated.fields(item_attr).iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id"]);
    }
}
