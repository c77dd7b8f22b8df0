//! `openapi`: an OpenAPI document of the HTTP bindings, built with the
//! utoipa builders and written as pretty JSON.

use std::collections::BTreeMap;

use serde_json::json;
use utoipa::openapi::path::{Operation, OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::security::{
    ApiKey, ApiKeyValue, AuthorizationCode, ClientCredentials, Flow, HttpAuthScheme, HttpBuilder,
    Implicit, OAuth2, Password, Scopes, SecurityRequirement, SecurityScheme,
};
use utoipa::openapi::schema::{
    ArrayBuilder, Object, ObjectBuilder, OneOfBuilder, Schema, SchemaFormat, SchemaType, Type,
};
use utoipa::openapi::{
    self, ComponentsBuilder, ContentBuilder, Ref, RefOr, Required, ResponseBuilder,
    ResponsesBuilder, Server,
};

use super::{view_type_name, GENERATED};
use crate::codegen::{File, Section};
use crate::error::Result;
use crate::expr::{
    AttrId, DataType, ErrorDef, FlowKind, HttpEndpoint, HttpMethod, KeyLocation, Meta, MethodDef,
    MethodId, Primitive, Requirement, Route, SchemeDef, SchemeKind, ServiceDef,
};
use crate::validate::{wildcards, ResolvedField, ResolvedView, ValidatedDesign};

pub const NAME: &str = "openapi";

const DOCUMENT: &str = include_str!("templates/openapi.hbs");

pub fn generate(design: &ValidatedDesign) -> Result<Vec<File>> {
    let document = serde_json::to_value(build_document(design))?;
    Ok(vec![File::new("openapi.json").with(Section::new(
        "document",
        DOCUMENT,
        json!({"document": document}),
    ))])
}

/// Meta key that hides a service or method from the document when set to `false`.
pub const META_GENERATE: &str = "openapi:generate";
/// Meta key overriding the summary of an operation.
pub const META_SUMMARY: &str = "openapi:summary";
/// Meta key adding tags to the operations of a service or method.
pub const META_TAG: &str = "openapi:tag";

/// Builds the OpenAPI document: one component schema per user type and
/// explicit view, one operation per HTTP route, one security scheme per
/// declared scheme.
pub fn build_document(design: &ValidatedDesign) -> openapi::OpenApi {
    let api = design.api();
    let title = api
        .map(|a| a.title.clone().unwrap_or_else(|| a.name.clone()))
        .unwrap_or_else(|| "API".to_string());
    let version = api
        .and_then(|a| a.version.clone())
        .unwrap_or_else(|| "1.0".to_string());
    let description = api
        .and_then(|a| a.description.clone())
        .unwrap_or_else(|| GENERATED.to_string());

    let mut document = openapi::OpenApiBuilder::new()
        .info(
            openapi::InfoBuilder::new()
                .title(title)
                .version(version)
                .description(Some(description))
                .build(),
        )
        .paths(openapi::Paths::new())
        .build();
    if let Some(api) = api.filter(|a| !a.servers.is_empty()) {
        document.servers = Some(api.servers.iter().map(Server::new).collect());
    }

    // 1) 汇总类型 schemas
    let mut schemas: BTreeMap<String, RefOr<Schema>> = BTreeMap::new();
    for id in design.type_order() {
        let def = design.user_type(*id);
        let description = design.attribute(def.attr).description.clone();
        schemas.insert(
            view_type_name(design, *id, None),
            RefOr::T(Schema::Object(object(design, def.attr, description))),
        );
        for view in design.views(*id) {
            if def.view(&view.name).is_some() {
                schemas.insert(
                    view_type_name(design, *id, Some(&view.name)),
                    RefOr::T(Schema::Object(view_object(design, *id, view))),
                );
            }
        }
    }

    // 2) 根据 HTTP 绑定生成 paths/operations
    for (sid, service) in design.services() {
        if hidden(&service.meta) {
            continue;
        }
        for (mid, method) in design.methods(sid) {
            let Some(http) = method.http.as_ref().filter(|_| !hidden(&method.meta)) else {
                continue;
            };
            for (index, route) in design.routes(mid).into_iter().enumerate() {
                let operation = operation(design, service, mid, method, http, &route, index);
                let path_item = document.paths.paths.entry(route.path.clone()).or_default();
                match route.method {
                    HttpMethod::Get => path_item.get = Some(operation),
                    HttpMethod::Post => path_item.post = Some(operation),
                    HttpMethod::Put => path_item.put = Some(operation),
                    HttpMethod::Patch => path_item.patch = Some(operation),
                    HttpMethod::Delete => path_item.delete = Some(operation),
                    HttpMethod::Head => path_item.head = Some(operation),
                    HttpMethod::Options => path_item.options = Some(operation),
                }
            }
        }
    }

    let mut components = ComponentsBuilder::new().schemas_from_iter(schemas);
    for scheme in design.schemes() {
        components = components.security_scheme(scheme.name.clone(), security_scheme(scheme));
    }
    let components = components.build();
    document.components = Some(components);
    document
}

fn hidden(meta: &Meta) -> bool {
    meta.get(META_GENERATE)
        .is_some_and(|values| values.iter().any(|v| v == "false"))
}

fn security_scheme(scheme: &SchemeDef) -> SecurityScheme {
    let description = scheme.description.clone();
    match scheme.kind {
        SchemeKind::BasicAuth => SecurityScheme::Http(
            HttpBuilder::new()
                .scheme(HttpAuthScheme::Basic)
                .description(description)
                .build(),
        ),
        SchemeKind::Jwt => SecurityScheme::Http(
            HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .description(description)
                .build(),
        ),
        SchemeKind::ApiKey => {
            let (location, name) = scheme
                .location
                .clone()
                .unwrap_or((KeyLocation::Header, "Authorization".to_string()));
            let value = match description {
                Some(description) => ApiKeyValue::with_description(name, description),
                None => ApiKeyValue::new(name),
            };
            SecurityScheme::ApiKey(match location {
                KeyLocation::Header => ApiKey::Header(value),
                KeyLocation::Query => ApiKey::Query(value),
            })
        }
        SchemeKind::OAuth2 => {
            let flows: Vec<Flow> = scheme.flows.iter().map(|f| flow(scheme, f)).collect();
            SecurityScheme::OAuth2(match description {
                Some(description) => OAuth2::with_description(flows, description),
                None => OAuth2::new(flows),
            })
        }
    }
}

fn flow(scheme: &SchemeDef, def: &crate::expr::FlowDef) -> Flow {
    let scopes: Scopes = scheme
        .scopes
        .iter()
        .map(|s| (s.name.as_str(), s.description.as_str()))
        .collect();
    let authorization_url = def.authorization_url.clone().unwrap_or_default();
    let token_url = def.token_url.clone().unwrap_or_default();
    let refresh_url = def.refresh_url.clone();
    match def.kind {
        FlowKind::AuthorizationCode => {
            let mut flow = AuthorizationCode::new(authorization_url, token_url, scopes);
            flow.refresh_url = refresh_url;
            Flow::AuthorizationCode(flow)
        }
        FlowKind::Implicit => {
            let mut flow = Implicit::new(authorization_url, scopes);
            flow.refresh_url = refresh_url;
            Flow::Implicit(flow)
        }
        FlowKind::Password => {
            let mut flow = Password::new(token_url, scopes);
            flow.refresh_url = refresh_url;
            Flow::Password(flow)
        }
        FlowKind::ClientCredentials => {
            let mut flow = ClientCredentials::new(token_url, scopes);
            flow.refresh_url = refresh_url;
            Flow::ClientCredentials(flow)
        }
    }
}

/// One OpenAPI requirement object: scopes go to the schemes that take them.
fn security_requirement(design: &ValidatedDesign, requirement: &Requirement) -> SecurityRequirement {
    let mut object = SecurityRequirement::default();
    for name in &requirement.schemes {
        let takes_scopes = design
            .graph()
            .find_scheme(name)
            .is_some_and(|s| s.kind.has_scopes());
        let scopes = if takes_scopes {
            requirement.scopes.clone()
        } else {
            Vec::new()
        };
        object = object.add(name.clone(), scopes);
    }
    object
}

fn required(flag: bool) -> Required {
    if flag {
        Required::True
    } else {
        Required::False
    }
}

fn schema(design: &ValidatedDesign, attr: AttrId, view: Option<&str>) -> RefOr<Schema> {
    let def = design.attribute(attr);
    match &def.ty {
        DataType::Primitive(p) => RefOr::T(Schema::Object(primitive(design, attr, *p))),
        DataType::Array(elem) => RefOr::T(Schema::Array(
            ArrayBuilder::new()
                .items(schema(design, *elem, view))
                .description(def.description.clone())
                .build(),
        )),
        DataType::Map { elem, .. } => RefOr::T(Schema::Object(
            ObjectBuilder::new()
                .schema_type(Type::Object)
                .description(def.description.clone())
                .additional_properties(Some(schema(design, *elem, view)))
                .build(),
        )),
        DataType::Object(_) => RefOr::T(Schema::Object(object(design, attr, def.description.clone()))),
        DataType::User(id) => RefOr::Ref(Ref::from_schema_name(view_type_name(design, *id, view))),
        DataType::Pending(_) | DataType::Dangling(_) => RefOr::T(Schema::default()),
    }
}

fn primitive(design: &ValidatedDesign, attr: AttrId, p: Primitive) -> Object {
    let def = design.attribute(attr);
    let (schema_type, format) = match p {
        Primitive::Boolean => (SchemaType::Type(Type::Boolean), None),
        Primitive::Int | Primitive::Int64 => (SchemaType::Type(Type::Integer), Some("int64")),
        Primitive::Int32 => (SchemaType::Type(Type::Integer), Some("int32")),
        Primitive::UInt | Primitive::UInt64 => (SchemaType::Type(Type::Integer), Some("uint64")),
        Primitive::UInt32 => (SchemaType::Type(Type::Integer), Some("uint32")),
        Primitive::Float32 => (SchemaType::Type(Type::Number), Some("float")),
        Primitive::Float64 => (SchemaType::Type(Type::Number), Some("double")),
        Primitive::String => (SchemaType::Type(Type::String), None),
        Primitive::Bytes => (SchemaType::Type(Type::String), Some("byte")),
        Primitive::Any => (SchemaType::AnyValue, None),
    };
    let rules = &def.validation;
    let format = rules.format.map(|f| f.as_str()).or(format);
    ObjectBuilder::new()
        .schema_type(schema_type)
        .format(format.map(|f| SchemaFormat::Custom(f.to_string())))
        .description(def.description.clone())
        .enum_values(rules.enum_values.clone())
        .pattern(rules.pattern.clone())
        .min_length(rules.min_length)
        .max_length(rules.max_length)
        .minimum(rules.minimum)
        .maximum(rules.maximum)
        .default(def.default.clone())
        .examples(def.example.clone())
        .build()
}

fn object(design: &ValidatedDesign, attr: AttrId, description: Option<String>) -> Object {
    fields_object(design, design.fields(attr), description)
}

fn fields_object(design: &ValidatedDesign, fields: &[ResolvedField], description: Option<String>) -> Object {
    let mut builder = ObjectBuilder::new()
        .schema_type(Type::Object)
        .description(description);
    for field in fields {
        let view = design.attribute(field.attr).view.as_deref();
        builder = builder.property(field.name.clone(), schema(design, field.attr, view));
        if field.required {
            builder = builder.required(field.name.clone());
        }
    }
    builder.build()
}

fn view_object(design: &ValidatedDesign, id: crate::expr::TypeId, view: &ResolvedView) -> Object {
    let fields = design.type_fields(id);
    let mut builder = ObjectBuilder::new().schema_type(Type::Object);
    for listed in &view.fields {
        let Some(field) = fields.iter().find(|f| f.name == listed.name) else {
            continue;
        };
        let selected = listed
            .view
            .as_deref()
            .or(design.attribute(field.attr).view.as_deref());
        builder = builder.property(field.name.clone(), schema(design, field.attr, selected));
        if view.required.contains(&field.name) {
            builder = builder.required(field.name.clone());
        }
    }
    builder.build()
}

fn reason(status: u16) -> String {
    match status {
        200 => "OK".to_string(),
        201 => "Created".to_string(),
        202 => "Accepted".to_string(),
        204 => "No Content".to_string(),
        _ => format!("{status} response"),
    }
}

fn operation(
    design: &ValidatedDesign,
    service: &ServiceDef,
    id: MethodId,
    method: &MethodDef,
    http: &HttpEndpoint,
    route: &Route,
    index: usize,
) -> Operation {
    let operation_id = if index == 0 {
        format!("{}#{}", service.name, method.name)
    } else {
        format!("{}#{}#{}", service.name, method.name, index)
    };
    let summary = method
        .meta
        .get(META_SUMMARY)
        .and_then(|values| values.first())
        .cloned()
        .unwrap_or_else(|| method.name.clone());
    let mut operation_builder = OperationBuilder::new()
        .operation_id(Some(operation_id))
        .summary(Some(summary))
        .description(method.description.clone())
        .tag(service.name.clone());
    let extra_tags = [&service.meta, &method.meta]
        .into_iter()
        .filter_map(|meta| meta.get(META_TAG))
        .flatten();
    for tag in extra_tags {
        if tag != &service.name {
            operation_builder = operation_builder.tag(tag.clone());
        }
    }
    if method.no_security {
        operation_builder = operation_builder.securities(Some(Vec::<SecurityRequirement>::new()));
    }
    for requirement in design.requirements(id) {
        operation_builder = operation_builder.security(security_requirement(design, requirement));
    }

    let takes_fields = method.payload.is_some_and(|p| {
        matches!(design.attribute(p).ty, DataType::Object(_) | DataType::User(_))
    });
    let fields: &[ResolvedField] = match method.payload {
        Some(payload) if takes_fields => design.fields(payload),
        _ => &[],
    };
    let names = wildcards(&route.path);
    let body_method = route.method.has_body();

    for name in &names {
        let schema_ref = fields
            .iter()
            .find(|f| &f.name == name)
            .map(|f| schema(design, f.attr, None))
            .unwrap_or_else(|| RefOr::T(Schema::Object(ObjectBuilder::new().schema_type(Type::String).build())));
        let built_parameter = ParameterBuilder::new()
            .name(name)
            .required(Required::True)
            .parameter_in(ParameterIn::Path)
            .schema(Some(schema_ref))
            .build();
        operation_builder = operation_builder.parameter(built_parameter);
    }

    let mut rest = Vec::new();
    for field in fields {
        if names.contains(&field.name) || http.body.as_deref() == Some(field.name.as_str()) {
            continue;
        }
        if http.params.contains(&field.name) || !body_method {
            let built_parameter = ParameterBuilder::new()
                .name(field.name.clone())
                .required(required(field.required))
                .description(design.attribute(field.attr).description.clone())
                .parameter_in(ParameterIn::Query)
                .schema(Some(schema(design, field.attr, None)))
                .build();
            operation_builder = operation_builder.parameter(built_parameter);
        } else {
            rest.push(field.clone());
        }
    }

    let body_schema = match method.payload {
        None => None,
        Some(_) if http.body.is_some() => fields
            .iter()
            .find(|f| http.body.as_deref() == Some(f.name.as_str()))
            .map(|f| schema(design, f.attr, None)),
        Some(payload) if !takes_fields => body_method.then(|| schema(design, payload, None)),
        Some(payload) if rest.len() == fields.len() && body_method => Some(schema(design, payload, None)),
        Some(_) if !rest.is_empty() => Some(RefOr::T(Schema::Object(fields_object(design, &rest, None)))),
        Some(_) => None,
    };
    if let Some(schema_ref) = body_schema {
        let request_body = RequestBodyBuilder::new()
            .required(Some(Required::True))
            .content(
                "application/json",
                ContentBuilder::new().schema(Some(schema_ref)).build(),
            )
            .build();
        operation_builder = operation_builder.request_body(Some(request_body));
    }

    let mut responses_builder = ResponsesBuilder::new();
    let statuses = if http.responses.is_empty() {
        vec![if method.result.is_some() { 200 } else { 204 }]
    } else {
        http.responses.clone()
    };
    for status in statuses {
        let mut response_builder = ResponseBuilder::new().description(reason(status));
        if let Some(result) = method.result.filter(|_| (200..300).contains(&status) && status != 204) {
            let view = design.attribute(result).view.as_deref();
            response_builder = response_builder.content(
                "application/json",
                ContentBuilder::new().schema(Some(schema(design, result, view))).build(),
            );
        }
        responses_builder = responses_builder.response(status.to_string(), response_builder.build());
    }

    let mut errors: BTreeMap<u16, Vec<&ErrorDef>> = BTreeMap::new();
    for error in design.method_errors(id) {
        errors.entry(error.status.unwrap_or(500)).or_default().push(error);
    }
    for (status, errors) in errors {
        let names: Vec<&str> = errors.iter().map(|e| e.name.as_str()).collect();
        let mut bodies: Vec<RefOr<Schema>> = errors
            .iter()
            .map(|e| RefOr::T(Schema::Object(object(design, e.attr, e.description.clone()))))
            .collect();
        let body = if bodies.len() == 1 {
            bodies.remove(0)
        } else {
            let mut one_of = OneOfBuilder::new();
            for body in bodies {
                one_of = one_of.item(body);
            }
            RefOr::T(Schema::OneOf(one_of.build()))
        };
        let response = ResponseBuilder::new()
            .description(names.join(", "))
            .content("application/json", ContentBuilder::new().schema(Some(body)).build())
            .build();
        responses_builder = responses_builder.response(status.to_string(), response);
    }
    operation_builder.responses(responses_builder.build()).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{INT32, STRING};
    use crate::eval::Design;
    use crate::expr::object;
    use serde_json::Value;

    fn document() -> Value {
        let mut design = Design::new();
        design.api("shop", |d| {
            d.title("Shop")?;
            d.version("2.0")?;
            d.server("https://shop.example.com")
        });
        design.service("Catalog", |d| {
            d.error_with("NotFound", |d| d.status_code(404))?;
            d.method("Get", |d| {
                d.payload_with(object(), |d| {
                    d.attribute("id", STRING)?;
                    d.require(["id"])
                })?;
                d.result("Item")?;
                d.error("NotFound")?;
                d.http(|d| d.get("/items/{id}"))
            })?;
            d.method("Create", |d| {
                d.payload("Item")?;
                d.result("Item")?;
                d.http(|d| {
                    d.post("/items")?;
                    d.response(201)
                })
            })
        });
        design.result_type("Item", |d| {
            d.attribute("id", STRING)?;
            d.attribute_with("stock", INT32, |d| d.minimum(0.0))?;
            d.view("tiny", |d| d.include("id"))
        });
        serde_json::to_value(build_document(&design.compile().unwrap())).unwrap()
    }

    #[test]
    fn info_and_servers_come_from_the_api() {
        let doc = document();
        assert_eq!(doc["info"]["title"], "Shop");
        assert_eq!(doc["info"]["version"], "2.0");
        assert_eq!(doc["servers"][0]["url"], "https://shop.example.com");
    }

    #[test]
    fn routes_become_operations() {
        let doc = document();
        let get = &doc["paths"]["/items/{id}"]["get"];
        assert_eq!(get["operationId"], "Catalog#Get");
        assert_eq!(get["tags"][0], "Catalog");
        assert_eq!(get["parameters"][0]["name"], "id");
        assert_eq!(get["parameters"][0]["in"], "path");
        assert_eq!(get["responses"]["200"]["content"]["application/json"]["schema"]["$ref"], "#/components/schemas/Item");
        assert_eq!(get["responses"]["404"]["description"], "NotFound");
    }

    #[test]
    fn whole_user_type_payloads_are_referenced_from_the_body() {
        let doc = document();
        let create = &doc["paths"]["/items"]["post"];
        assert_eq!(
            create["requestBody"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/Item"
        );
        assert!(create["responses"]["201"].is_object());
    }

    #[test]
    fn explicit_views_get_their_own_schema() {
        let doc = document();
        let schemas = &doc["components"]["schemas"];
        assert!(schemas["Item"]["properties"]["stock"].is_object());
        let tiny = schemas["ItemTinyView"]["properties"].as_object().unwrap();
        assert_eq!(tiny.keys().collect::<Vec<_>>(), ["id"]);
    }

    fn secured() -> Value {
        let mut design = Design::new();
        design.top(|d| {
            d.oauth2_security("oauth", |d| {
                d.description("Delegated access")?;
                d.scope_described("items:read", "Read items")?;
                d.authorization_code_flow("https://auth/authorize", "https://auth/token", "https://auth/refresh")
            })
        });
        design.top(|d| d.api_key_security("key", |d| d.key(KeyLocation::Query, "api_key")));
        design.top(|d| d.jwt_security("jwt", |_| Ok(())));
        design.service("Catalog", |d| {
            d.security_with(["oauth", "key"], |d| d.scope("items:read"))?;
            d.meta(META_TAG, ["items"])?;
            d.method("List", |d| {
                d.meta(META_SUMMARY, ["List every item"])?;
                d.http(|d| d.get("/items"))
            })?;
            d.method("Health", |d| {
                d.no_security()?;
                d.http(|d| d.get("/health"))
            })?;
            d.method("Debug", |d| {
                d.meta(META_GENERATE, ["false"])?;
                d.security(["jwt"])?;
                d.http(|d| d.get("/debug"))
            })
        });
        serde_json::to_value(build_document(&design.compile().unwrap())).unwrap()
    }

    #[test]
    fn security_schemes_become_components() {
        let doc = secured();
        let schemes = &doc["components"]["securitySchemes"];
        assert_eq!(schemes["oauth"]["type"], "oauth2");
        let code = &schemes["oauth"]["flows"]["authorizationCode"];
        assert_eq!(code["tokenUrl"], "https://auth/token");
        assert_eq!(code["refreshUrl"], "https://auth/refresh");
        assert_eq!(code["scopes"]["items:read"], "Read items");
        assert_eq!(schemes["key"]["type"], "apiKey");
        assert_eq!(schemes["key"]["in"], "query");
        assert_eq!(schemes["key"]["name"], "api_key");
        assert_eq!(schemes["jwt"]["scheme"], "bearer");
        assert_eq!(schemes["jwt"]["bearerFormat"], "JWT");
    }

    #[test]
    fn operations_list_inherited_requirements() {
        let doc = secured();
        let list = &doc["paths"]["/items"]["get"];
        assert_eq!(list["security"][0]["oauth"][0], "items:read");
        assert_eq!(list["security"][0]["key"], serde_json::json!([]));
        let health = &doc["paths"]["/health"]["get"];
        assert_eq!(health["security"], serde_json::json!([]));
    }

    #[test]
    fn meta_sets_summary_tags_and_visibility() {
        let doc = secured();
        let list = &doc["paths"]["/items"]["get"];
        assert_eq!(list["summary"], "List every item");
        assert_eq!(list["tags"], serde_json::json!(["Catalog", "items"]));
        assert_eq!(doc["paths"]["/health"]["get"]["summary"], "Health");
        assert!(doc["paths"].get("/debug").is_none());
    }

    #[test]
    fn generated_file_is_pretty_json() {
        let mut design = Design::new();
        design.service("Empty", |_| Ok(()));
        let files = generate(&design.compile().unwrap()).unwrap();
        let text = files[0].render(&crate::codegen::Renderer::new()).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert!(parsed["openapi"].as_str().unwrap().starts_with("3."));
        assert!(text.contains("\n  \"info\""));
    }
}
