use crate::eval::{Dsl, DslResult, Keyword, API, RESULT_TYPE, SERVICE, USER_TYPE};
use crate::expr::{ApiDef, AttributeDef, DataType, NodeRef, Object, ServiceDef, UserTypeDef};

impl Dsl {
    /// Declares the API root. Only one may exist per design.
    pub fn api<F>(&mut self, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.enter(Keyword::Api)?;
        if let Some(existing) = &self.graph.api {
            let message = format!("API is already declared as \"{}\"", existing.name);
            return self.fail_at(name.to_string(), message);
        }
        self.graph.api = Some(ApiDef {
            name: name.to_string(),
            ..ApiDef::default()
        });
        self.nest(&API, NodeRef::Api, name, f)
    }

    /// Declares a service. Duplicate names are reported by the validator.
    pub fn service<F>(&mut self, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.enter(Keyword::Service)?;
        let id = self.graph.add_service(ServiceDef::new(name));
        self.nest(&SERVICE, NodeRef::Service(id), name, f)
    }

    pub fn user_type<F>(&mut self, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.declare_type(Keyword::Type, name, f)
    }

    pub fn result_type<F>(&mut self, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.declare_type(Keyword::ResultType, name, f)
    }

    fn declare_type<F>(&mut self, keyword: Keyword, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.enter(keyword)?;
        let result = keyword == Keyword::ResultType;
        let body = self.graph.add_attribute(AttributeDef::new(
            DataType::Object(Object::default()),
            name,
        ));
        let id = self.graph.add_type(UserTypeDef::new(name, body, result));
        let role = if result { &RESULT_TYPE } else { &USER_TYPE };
        self.nest(role, NodeRef::Type(id), name, f)
    }

    pub fn title(&mut self, title: &str) -> DslResult {
        self.enter(Keyword::Title)?;
        if let Some(api) = self.graph.api.as_mut() {
            api.title = Some(title.to_string());
        }
        Ok(())
    }

    pub fn version(&mut self, version: &str) -> DslResult {
        self.enter(Keyword::Version)?;
        if let Some(api) = self.graph.api.as_mut() {
            api.version = Some(version.to_string());
        }
        Ok(())
    }

    pub fn server(&mut self, url: &str) -> DslResult {
        self.enter(Keyword::Server)?;
        if let Some(api) = self.graph.api.as_mut() {
            api.servers.push(url.to_string());
        }
        Ok(())
    }

    /// Documents whichever node is being configured.
    pub fn description(&mut self, text: &str) -> DslResult {
        let text = Some(text.to_string());
        match self.enter(Keyword::Description)? {
            NodeRef::Api => {
                if let Some(api) = self.graph.api.as_mut() {
                    api.description = text;
                }
            }
            NodeRef::Service(id) => self.graph.service_mut(id).description = text,
            NodeRef::Method(id) => self.graph.method_mut(id).description = text,
            NodeRef::Error(id) => self.graph.error_mut(id).description = text,
            NodeRef::Type(id) => {
                let body = self.graph.user_type(id).attr;
                self.graph.attribute_mut(body).description = text;
            }
            NodeRef::Attribute(id) => self.graph.attribute_mut(id).description = text,
            _ => return self.misplaced(Keyword::Description),
        }
        Ok(())
    }
}
