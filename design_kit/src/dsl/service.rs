use crate::eval::{Dsl, DslResult, Keyword, ATTRIBUTE, ERROR, METHOD};
use crate::expr::{
    AttrId, AttributeDef, DataType, ErrorDef, ErrorId, MethodDef, MethodError, MethodId, NodeRef,
    Object, Primitive, TypeSpec,
};

type NoBuilder = fn(&mut Dsl) -> DslResult;

impl Dsl {
    pub fn method<F>(&mut self, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        let NodeRef::Service(service) = self.enter(Keyword::Method)? else {
            return self.misplaced(Keyword::Method);
        };
        let graph = &self.graph;
        let taken = graph
            .service(service)
            .methods
            .iter()
            .any(|m| graph.method(*m).name == name);
        if taken {
            return self.fail(format!("method \"{name}\" is already defined"));
        }
        let service_name = self.graph.service(service).name.clone();
        let id = self
            .graph
            .add_method(MethodDef::new(name, service, &service_name));
        self.graph.service_mut(service).methods.push(id);
        self.nest(&METHOD, NodeRef::Method(id), name, f)
    }

    /// In a service, declares a shared error with the default
    /// `{name, message}` shape. In a method, references the service error of
    /// that name; the reference is resolved in the finalize pass.
    pub fn error(&mut self, name: &str) -> DslResult {
        self.declare_error::<NoBuilder>(name, None)
    }

    /// Declares an error whose shape is given by the closure: shared when
    /// used in a service, local to the method otherwise.
    pub fn error_with<F>(&mut self, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.declare_error(name, Some(f))
    }

    fn declare_error<F>(&mut self, name: &str, f: Option<F>) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        match self.enter(Keyword::Error)? {
            NodeRef::Service(service) => {
                let graph = &self.graph;
                let taken = graph
                    .service(service)
                    .errors
                    .iter()
                    .any(|e| graph.error(*e).name == name);
                if taken {
                    return self.fail(format!("error \"{name}\" is already defined"));
                }
                let id = self.new_error(name);
                self.graph.service_mut(service).errors.push(id);
                self.shape_error(id, name, f)
            }
            NodeRef::Method(method) => {
                let taken = self.graph.method(method).errors.iter().any(|e| e.name == name);
                if taken {
                    return self.fail(format!("error \"{name}\" is already defined"));
                }
                match f {
                    Some(f) => {
                        let id = self.new_error(name);
                        self.graph.method_mut(method).errors.push(MethodError {
                            name: name.to_string(),
                            error: Some(id),
                        });
                        self.shape_error(id, name, Some(f))
                    }
                    None => {
                        self.reference_service_error(method, name);
                        Ok(())
                    }
                }
            }
            _ => self.misplaced(Keyword::Error),
        }
    }

    fn new_error(&mut self, name: &str) -> ErrorId {
        let path = self.child_path(name);
        let attr = self
            .graph
            .add_attribute(AttributeDef::new(DataType::Object(Object::default()), path.clone()));
        self.graph.add_error(ErrorDef {
            name: name.to_string(),
            description: None,
            attr,
            status: None,
            path,
        })
    }

    fn shape_error<F>(&mut self, id: ErrorId, name: &str, f: Option<F>) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        if let Some(f) = f {
            self.nest(&ERROR, NodeRef::Error(id), name, f)?;
        }
        let attr = self.graph.error(id).attr;
        let declared = self
            .graph
            .attribute(attr)
            .ty
            .as_object()
            .is_some_and(|o| !o.is_empty());
        if !declared {
            let path = self.graph.error(id).path.clone();
            let mut shape = Object::default();
            for field in ["name", "message"] {
                let def = AttributeDef::new(
                    DataType::Primitive(Primitive::String),
                    format!("{path}.{field}"),
                );
                shape.push(field, self.graph.add_attribute(def));
            }
            let body = self.graph.attribute_mut(attr);
            body.ty = DataType::Object(shape);
            body.required_names = vec!["name".to_string(), "message".to_string()];
        }
        Ok(())
    }

    fn reference_service_error(&mut self, method: MethodId, name: &str) {
        let errors = &mut self.graph.method_mut(method).errors;
        errors.push(MethodError {
            name: name.to_string(),
            error: None,
        });
        let slot = errors.len() - 1;
        let name = name.to_string();
        self.defer(move |graph| {
            let service = graph.method(method).service;
            let found = graph
                .service(service)
                .errors
                .iter()
                .copied()
                .find(|e| graph.error(*e).name == name);
            graph.method_mut(method).errors[slot].error = found;
        });
    }

    pub fn payload(&mut self, spec: impl Into<TypeSpec>) -> DslResult {
        self.method_shape::<NoBuilder>(Keyword::Payload, spec.into(), None)
    }

    /// Payload configured by a closure in the attribute role, typically with
    /// `object()` to declare an inline object.
    pub fn payload_with<F>(&mut self, spec: impl Into<TypeSpec>, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.method_shape(Keyword::Payload, spec.into(), Some(f))
    }

    pub fn result(&mut self, spec: impl Into<TypeSpec>) -> DslResult {
        self.method_shape::<NoBuilder>(Keyword::Result, spec.into(), None)
    }

    pub fn result_with<F>(&mut self, spec: impl Into<TypeSpec>, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.method_shape(Keyword::Result, spec.into(), Some(f))
    }

    fn method_shape<F>(&mut self, keyword: Keyword, spec: TypeSpec, f: Option<F>) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        let NodeRef::Method(method) = self.enter(keyword)? else {
            return self.misplaced(keyword);
        };
        let label = keyword.name();
        let existing = match keyword {
            Keyword::Payload => self.graph.method(method).payload,
            _ => self.graph.method(method).result,
        };
        if existing.is_some() {
            return self.fail(format!("{label} is already defined"));
        }
        let path = self.child_path(label);
        let attr: AttrId = self.build_attribute(spec, path);
        let def = self.graph.method_mut(method);
        match keyword {
            Keyword::Payload => def.payload = Some(attr),
            _ => def.result = Some(attr),
        }
        match f {
            Some(f) => self.nest(&ATTRIBUTE, NodeRef::Attribute(attr), label, f),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dsl::{INT, STRING};
    use crate::eval::Design;
    use crate::expr::{object, DataType};

    #[test]
    fn duplicate_method_is_a_builder_error() {
        let mut design = Design::new();
        design.service("Catalog", |d| {
            d.method("Get", |_| Ok(()))?;
            d.method("Get", |_| Ok(()))
        });
        let evaluated = design.evaluate();
        let diagnostic = evaluated.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.path, "Catalog");
        assert_eq!(diagnostic.message, "method \"Get\" is already defined");
    }

    #[test]
    fn method_errors_resolve_forward_to_service_errors() {
        let mut design = Design::new();
        design.service("Catalog", |d| {
            d.method("Get", |d| d.error("NotFound"))?;
            d.error_with("NotFound", |d| d.status_code(404))
        });
        let evaluated = design.evaluate();
        assert!(evaluated.diagnostics.is_empty());
        let graph = &evaluated.graph;
        let service = graph.service(graph.find_service("Catalog").unwrap());
        let method = graph.method(service.methods[0]);
        assert_eq!(method.errors[0].error, Some(service.errors[0]));
        assert_eq!(graph.error(service.errors[0]).status, Some(404));
    }

    #[test]
    fn errors_without_a_shape_get_name_and_message() {
        let mut design = Design::new();
        design.service("Catalog", |d| d.error("Unavailable"));
        let graph = design.evaluate().graph;
        let service = graph.service(graph.find_service("Catalog").unwrap());
        let error = graph.error(service.errors[0]);
        let body = graph.attribute(error.attr);
        let names: Vec<_> = body.ty.as_object().unwrap().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "message"]);
        assert_eq!(body.required_names, ["name", "message"]);
    }

    #[test]
    fn payload_twice_is_rejected() {
        let mut design = Design::new();
        design.service("Catalog", |d| {
            d.method("Count", |d| {
                d.payload(INT)?;
                d.payload(STRING)
            })
        });
        let evaluated = design.evaluate();
        let diagnostic = evaluated.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.path, "Catalog.Count");
        assert_eq!(diagnostic.message, "Payload is already defined");
    }

    #[test]
    fn inline_payload_is_an_object_node() {
        let mut design = Design::new();
        design.service("Catalog", |d| {
            d.method("Get", |d| d.payload_with(object(), |d| d.attribute("id", STRING)))
        });
        let graph = design.evaluate().graph;
        let service = graph.service(graph.find_service("Catalog").unwrap());
        let payload = graph.method(service.methods[0]).payload.unwrap();
        let DataType::Object(body) = &graph.attribute(payload).ty else {
            panic!("payload should be an inline object");
        };
        let id = body.get("id").unwrap();
        assert_eq!(graph.attribute(id).path, "Catalog.Get.Payload.id");
    }
}
