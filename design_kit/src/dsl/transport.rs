use crate::eval::{Dsl, DslResult, Keyword, METHOD_GRPC, METHOD_HTTP, SERVICE_GRPC, SERVICE_HTTP};
use crate::expr::{HttpMethod, MethodId, NodeRef, Route};

impl Dsl {
    /// Opens the HTTP binding of the service or method being configured.
    pub fn http<F>(&mut self, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        match self.enter(Keyword::Http)? {
            NodeRef::Service(id) => {
                self.graph.service_mut(id).http.get_or_insert_with(Default::default);
                self.nest(&SERVICE_HTTP, NodeRef::ServiceHttp(id), "HTTP", f)
            }
            NodeRef::Method(id) => {
                self.graph.method_mut(id).http.get_or_insert_with(Default::default);
                self.nest(&METHOD_HTTP, NodeRef::MethodHttp(id), "HTTP", f)
            }
            _ => self.misplaced(Keyword::Http),
        }
    }

    /// Opens the gRPC binding of the service or method being configured.
    pub fn grpc<F>(&mut self, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        match self.enter(Keyword::Grpc)? {
            NodeRef::Service(id) => {
                self.graph.service_mut(id).grpc.get_or_insert_with(Default::default);
                self.nest(&SERVICE_GRPC, NodeRef::ServiceGrpc(id), "GRPC", f)
            }
            NodeRef::Method(id) => {
                self.graph.method_mut(id).grpc.get_or_insert_with(Default::default);
                self.nest(&METHOD_GRPC, NodeRef::MethodGrpc(id), "GRPC", f)
            }
            _ => self.misplaced(Keyword::Grpc),
        }
    }

    /// Path prefix shared by every route of the service.
    pub fn path(&mut self, prefix: &str) -> DslResult {
        let NodeRef::ServiceHttp(id) = self.enter(Keyword::Path)? else {
            return self.misplaced(Keyword::Path);
        };
        if let Some(http) = self.graph.service_mut(id).http.as_mut() {
            http.path = Some(prefix.to_string());
        }
        Ok(())
    }

    pub fn get(&mut self, path: &str) -> DslResult {
        self.route(Keyword::Get, HttpMethod::Get, path)
    }

    pub fn post(&mut self, path: &str) -> DslResult {
        self.route(Keyword::Post, HttpMethod::Post, path)
    }

    pub fn put(&mut self, path: &str) -> DslResult {
        self.route(Keyword::Put, HttpMethod::Put, path)
    }

    pub fn patch(&mut self, path: &str) -> DslResult {
        self.route(Keyword::Patch, HttpMethod::Patch, path)
    }

    pub fn delete(&mut self, path: &str) -> DslResult {
        self.route(Keyword::Delete, HttpMethod::Delete, path)
    }

    pub fn head(&mut self, path: &str) -> DslResult {
        self.route(Keyword::Head, HttpMethod::Head, path)
    }

    pub fn options(&mut self, path: &str) -> DslResult {
        self.route(Keyword::Options, HttpMethod::Options, path)
    }

    fn route(&mut self, keyword: Keyword, method: HttpMethod, path: &str) -> DslResult {
        let id = self.method_http(keyword)?;
        if !path.starts_with('/') {
            return self.fail(format!("route path \"{path}\" must start with '/'"));
        }
        if let Some(http) = self.graph.method_mut(id).http.as_mut() {
            http.routes.push(Route {
                method,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    /// Reads a payload attribute from the query string.
    pub fn param(&mut self, name: &str) -> DslResult {
        let id = self.method_http(Keyword::Param)?;
        if let Some(http) = self.graph.method_mut(id).http.as_mut() {
            if !http.params.iter().any(|p| p == name) {
                http.params.push(name.to_string());
            }
        }
        Ok(())
    }

    /// Uses one payload attribute as the whole request body.
    pub fn body(&mut self, name: &str) -> DslResult {
        let id = self.method_http(Keyword::Body)?;
        if let Some(http) = self.graph.method_mut(id).http.as_mut() {
            http.body = Some(name.to_string());
        }
        Ok(())
    }

    /// Success status code of the endpoint.
    pub fn response(&mut self, status: u16) -> DslResult {
        let id = self.method_http(Keyword::Response)?;
        if !(100..=599).contains(&status) {
            return self.fail(format!("{status} is not an HTTP status code"));
        }
        if let Some(http) = self.graph.method_mut(id).http.as_mut() {
            http.responses.push(status);
        }
        Ok(())
    }

    fn method_http(&mut self, keyword: Keyword) -> DslResult<MethodId> {
        match self.enter(keyword)? {
            NodeRef::MethodHttp(id) => Ok(id),
            _ => self.misplaced(keyword),
        }
    }

    /// HTTP status code of the error being configured.
    pub fn status_code(&mut self, status: u16) -> DslResult {
        let NodeRef::Error(id) = self.enter(Keyword::StatusCode)? else {
            return self.misplaced(Keyword::StatusCode);
        };
        if !(100..=599).contains(&status) {
            return self.fail(format!("{status} is not an HTTP status code"));
        }
        self.graph.error_mut(id).status = Some(status);
        Ok(())
    }

    pub fn package(&mut self, name: &str) -> DslResult {
        let NodeRef::ServiceGrpc(id) = self.enter(Keyword::Package)? else {
            return self.misplaced(Keyword::Package);
        };
        if let Some(grpc) = self.graph.service_mut(id).grpc.as_mut() {
            grpc.package = Some(name.to_string());
        }
        Ok(())
    }

    /// gRPC status name reported on success.
    pub fn status(&mut self, code: &str) -> DslResult {
        let NodeRef::MethodGrpc(id) = self.enter(Keyword::Status)? else {
            return self.misplaced(Keyword::Status);
        };
        if let Some(grpc) = self.graph.method_mut(id).grpc.as_mut() {
            grpc.status = code.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::Design;
    use crate::expr::{HttpMethod, Route};

    #[test]
    fn routes_collect_on_the_method() {
        let mut design = Design::new();
        design.service("Catalog", |d| {
            d.http(|d| d.path("/v1"))?;
            d.method("Get", |d| {
                d.http(|d| {
                    d.get("/items/{id}")?;
                    d.head("/items/{id}")?;
                    d.response(200)
                })
            })
        });
        let evaluated = design.evaluate();
        assert!(evaluated.diagnostics.is_empty());
        let graph = &evaluated.graph;
        let service = graph.service(graph.find_service("Catalog").unwrap());
        assert_eq!(service.http.as_ref().unwrap().path.as_deref(), Some("/v1"));
        let http = graph.method(service.methods[0]).http.clone().unwrap();
        assert_eq!(
            http.routes[0],
            Route {
                method: HttpMethod::Get,
                path: "/items/{id}".into()
            }
        );
        assert_eq!(http.routes.len(), 2);
        assert_eq!(http.responses, [200]);
    }

    #[test]
    fn service_http_does_not_take_routes() {
        let mut design = Design::new();
        design.service("Catalog", |d| d.http(|d| d.get("/items")));
        let evaluated = design.evaluate();
        let diagnostic = evaluated.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.path, "Catalog.HTTP");
        assert_eq!(diagnostic.message, "invalid use of GET in HTTP (service)");
    }

    #[test]
    fn malformed_literals_are_rejected() {
        let mut design = Design::new();
        design.service("Catalog", |d| {
            d.method("Get", |d| d.http(|d| d.get("items")))?;
            d.error_with("NotFound", |d| d.status_code(1000))
        });
        let evaluated = design.evaluate();
        let messages: Vec<_> = evaluated.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "route path \"items\" must start with '/'",
                "1000 is not an HTTP status code"
            ]
        );
    }
}
