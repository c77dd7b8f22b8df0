//! The evaluation engine.
//!
//! A [`Design`] is a list of top-level builder closures. Evaluating it runs
//! two strictly sequential passes against one [`Dsl`] handle:
//!
//! 1. the registration pass executes every top-level builder, depth first,
//!    pushing a [`Frame`] for each node being configured;
//! 2. the finalize pass runs the queued finalize actions in FIFO order, so a
//!    reference registered by one node can see every node declared after it.

mod context;

pub use context::{
    Frame, Keyword, Role, API, ATTRIBUTE, ERROR, METHOD, METHOD_GRPC, METHOD_HTTP, RESULT_TYPE,
    SCHEME, SECURITY, SERVICE, SERVICE_GRPC, SERVICE_HTTP, TOP, USER_TYPE, VIEW,
};

use std::collections::VecDeque;

use tracing::debug;

use crate::diagnostic::Diagnostics;
use crate::expr::{Graph, NodeRef, SchemeKind};
use crate::validate::{validate, ValidatedDesign};

/// Marker returned by a keyword that recorded a diagnostic. Propagating it
/// with `?` abandons the rest of the enclosing builder closure; siblings of
/// that closure still run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;

pub type DslResult<T = ()> = std::result::Result<T, Aborted>;

type Builder = Box<dyn FnOnce(&mut Dsl) -> DslResult>;
type Finalizer = Box<dyn FnOnce(&mut Graph)>;

/// The handle every builder closure receives.
///
/// Keywords are methods on this type; each one checks the capability of the
/// frame on top of the context stack before touching the graph.
pub struct Dsl {
    pub(crate) graph: Graph,
    stack: Vec<Frame>,
    finalizers: VecDeque<Finalizer>,
    pub(crate) diagnostics: Diagnostics,
}

impl Dsl {
    pub(crate) fn new() -> Self {
        Self {
            graph: Graph::new(),
            stack: Vec::new(),
            finalizers: VecDeque::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Dotted path of the node being configured, e.g. `Catalog.Get.Payload`.
    pub fn location(&self) -> String {
        self.stack
            .iter()
            .map(|f| f.label.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub(crate) fn child_path(&self, label: &str) -> String {
        if self.stack.is_empty() {
            label.to_string()
        } else {
            format!("{}.{}", self.location(), label)
        }
    }

    fn role(&self) -> &'static Role {
        self.stack.last().map_or(&TOP, |f| f.role)
    }

    /// Capability check: returns the node on top of the stack when the
    /// keyword is valid for its role.
    pub(crate) fn enter(&mut self, keyword: Keyword) -> DslResult<NodeRef> {
        let role = self.role();
        if role.allows(keyword) {
            Ok(self.stack.last().map_or(NodeRef::Root, |f| f.node))
        } else {
            self.misplaced(keyword)
        }
    }

    pub(crate) fn misplaced<T>(&mut self, keyword: Keyword) -> DslResult<T> {
        let message = format!("invalid use of {} in {}", keyword, self.role().name);
        self.fail(message)
    }

    /// Records a diagnostic at the current path and aborts the closure.
    pub(crate) fn fail<T>(&mut self, message: impl Into<String>) -> DslResult<T> {
        let path = self.location();
        self.fail_at(path, message)
    }

    pub(crate) fn fail_at<T>(&mut self, path: String, message: impl Into<String>) -> DslResult<T> {
        let message = message.into();
        debug!(%path, %message, "builder aborted");
        self.diagnostics.push(path, message);
        Err(Aborted)
    }

    /// Runs a nested builder with `node` on top of the stack. A failure inside
    /// the nested closure stays inside it.
    pub(crate) fn nest<F>(&mut self, role: &'static Role, node: NodeRef, label: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.stack.push(Frame {
            role,
            node,
            label: label.to_string(),
        });
        let _ = f(self);
        self.stack.pop();
        Ok(())
    }

    /// Queues an action for the finalize pass.
    pub(crate) fn defer(&mut self, action: impl FnOnce(&mut Graph) + 'static) {
        self.finalizers.push_back(Box::new(action));
    }

    fn finalize(&mut self) {
        debug!(actions = self.finalizers.len(), "finalize pass");
        while let Some(action) = self.finalizers.pop_front() {
            action(&mut self.graph);
        }
    }
}

/// A design: top-level builders registered in declaration order.
///
/// Nothing runs until [`Design::evaluate`] or [`Design::compile`].
#[derive(Default)]
pub struct Design {
    builders: Vec<Builder>,
}

/// Outcome of the two evaluation passes.
#[derive(Debug)]
pub struct Evaluated {
    pub graph: Graph,
    pub diagnostics: Diagnostics,
}

impl Design {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut Dsl) -> DslResult + 'static,
    {
        let name = name.to_string();
        self.builders.push(Box::new(move |d| d.api(&name, f)));
        self
    }

    pub fn service<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut Dsl) -> DslResult + 'static,
    {
        let name = name.to_string();
        self.builders.push(Box::new(move |d| d.service(&name, f)));
        self
    }

    pub fn user_type<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut Dsl) -> DslResult + 'static,
    {
        let name = name.to_string();
        self.builders.push(Box::new(move |d| d.user_type(&name, f)));
        self
    }

    pub fn result_type<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut Dsl) -> DslResult + 'static,
    {
        let name = name.to_string();
        self.builders.push(Box::new(move |d| d.result_type(&name, f)));
        self
    }

    /// Declares a security scheme of the given kind.
    pub fn security_scheme<F>(&mut self, kind: SchemeKind, name: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut Dsl) -> DslResult + 'static,
    {
        let name = name.to_string();
        self.builders
            .push(Box::new(move |d| d.security_scheme(kind, &name, f)));
        self
    }

    /// Any top-level builder; the closure runs with the empty stack.
    pub fn top<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut Dsl) -> DslResult + 'static,
    {
        self.builders.push(Box::new(f));
        self
    }

    pub fn evaluate(self) -> Evaluated {
        let mut dsl = Dsl::new();
        debug!(builders = self.builders.len(), "registration pass");
        for builder in self.builders {
            let _ = builder(&mut dsl);
        }
        dsl.finalize();
        Evaluated {
            graph: dsl.graph,
            diagnostics: dsl.diagnostics,
        }
    }

    /// Evaluates then validates. Builder diagnostics come first, followed by
    /// every diagnostic of the validator.
    pub fn compile(self) -> Result<ValidatedDesign, Diagnostics> {
        let Evaluated {
            graph,
            mut diagnostics,
        } = self.evaluate();
        match validate(graph) {
            Ok(design) if diagnostics.is_empty() => Ok(design),
            Ok(_) => Err(diagnostics),
            Err(found) => {
                diagnostics.append(found);
                Err(diagnostics)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::STRING;

    #[test]
    fn invalid_keyword_is_reported_with_the_context_path() {
        let mut design = Design::new();
        design.service("Catalog", |d| {
            d.method("Get", |d| {
                d.payload_with(crate::expr::object(), |d| {
                    d.attribute_with("id", STRING, |d| d.method("Nested", |_| Ok(())))
                })
            })
        });

        let evaluated = design.evaluate();
        let diagnostics: Vec<_> = evaluated.diagnostics.iter().collect();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].path, "Catalog.Get.Payload.id");
        assert_eq!(diagnostics[0].message, "invalid use of Method in Attribute");
    }

    #[test]
    fn failure_aborts_only_the_enclosing_closure() {
        let mut design = Design::new();
        design.service("Catalog", |d| {
            d.method("Broken", |d| {
                d.title("not here")?;
                d.description("never reached")
            })?;
            d.method("Fine", |d| d.description("still declared"))
        });

        let evaluated = design.evaluate();
        assert_eq!(evaluated.diagnostics.len(), 1);
        let service = evaluated.graph.find_service("Catalog").unwrap();
        let methods: Vec<_> = evaluated
            .graph
            .service(service)
            .methods
            .iter()
            .map(|m| evaluated.graph.method(*m))
            .collect();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].description, None);
        assert_eq!(methods[1].description.as_deref(), Some("still declared"));
    }

    #[test]
    fn finalize_runs_after_every_builder() {
        let mut design = Design::new();
        design.user_type("Order", |d| d.attribute("item", "Item"));
        design.user_type("Item", |d| d.attribute("id", STRING));

        let evaluated = design.evaluate();
        assert!(evaluated.diagnostics.is_empty());
        let graph = &evaluated.graph;
        let order = graph.find_type("Order").unwrap();
        let (_, body) = graph.object_of(graph.user_type(order).attr).unwrap();
        let item_attr = body.get("item").unwrap();
        assert_eq!(
            graph.attribute(item_attr).ty,
            crate::expr::DataType::User(graph.find_type("Item").unwrap())
        );
    }

    #[test]
    fn unresolved_names_are_left_dangling() {
        let mut design = Design::new();
        design.user_type("Order", |d| d.attribute("item", "Missing"));
        let evaluated = design.evaluate();
        let graph = &evaluated.graph;
        let order = graph.find_type("Order").unwrap();
        let (_, body) = graph.object_of(graph.user_type(order).attr).unwrap();
        assert_eq!(
            graph.attribute(body.get("item").unwrap()).ty,
            crate::expr::DataType::Dangling("Missing".into())
        );
    }
}
