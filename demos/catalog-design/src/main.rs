//! Design of a small catalog service, compiled by `design_kit`.
//!
//! ```text
//! cargo run -p catalog-design -- check
//! cargo run -p catalog-design -- gen
//! cargo run -p catalog-design -- gen openapi -o /tmp/catalog
//! ```

use design_kit::prelude::*;
use serde_json::json;

fn api(design: &mut Design) {
    design.api("catalog", |d| {
        d.title("Catalog API")?;
        d.version("0.1.0")?;
        d.description("Items for sale and the orders placed for them.")?;
        d.server("http://localhost:3000/api")
    });
}

fn security(design: &mut Design) {
    design.security_scheme(SchemeKind::Jwt, "jwt", |d| {
        d.description("Signed session token.")?;
        d.scope_described("catalog:read", "Browse items")?;
        d.scope_described("catalog:write", "Create and delete items")
    });
    design.security_scheme(SchemeKind::ApiKey, "partner_key", |d| {
        d.description("Key issued to order partners.")?;
        d.key(KeyLocation::Header, "X-Partner-Key")
    });
}

fn types(design: &mut Design) {
    design.user_type("Audit", |d| {
        d.attribute_with("created_at", STRING, |d| d.format(Format::DateTime))?;
        d.attribute_with("updated_at", STRING, |d| d.format(Format::DateTime))?;
        d.require(["created_at"])
    });

    design.result_type("Item", |d| {
        d.description("An item of the catalog.")?;
        d.extend("Audit")?;
        d.attribute_with("id", STRING, |d| {
            d.format(Format::Uuid)?;
            d.example("3f1c2a5e-8d1b-4c8e-9a44-2b9f1b0e7c11")
        })?;
        d.attribute_with("name", STRING, |d| {
            d.min_length(1)?;
            d.max_length(120)
        })?;
        d.attribute_with("price", FLOAT64, |d| d.minimum(0.0))?;
        d.attribute_with("status", STRING, |d| {
            d.enum_values(["draft", "listed", "retired"])?;
            d.default("draft")
        })?;
        d.attribute("tags", array_of(STRING))?;
        d.attribute("labels", map_of(STRING, STRING))?;
        d.require(["id", "name", "price"])?;
        d.view("tiny", |d| {
            d.include("id")?;
            d.include("name")
        })
    });

    design.user_type("NewItem", |d| {
        d.reference("Item")?;
        d.attribute("name", STRING)?;
        d.attribute("price", FLOAT64)?;
        d.attribute("tags", array_of(STRING))?;
        d.require(["name", "price"])
    });

    design.result_type("Order", |d| {
        d.attribute("id", STRING)?;
        d.attribute_with("item", "Item", |d| d.use_view("tiny"))?;
        d.attribute_with("quantity", INT32, |d| {
            d.minimum(1.0)?;
            d.maximum(99.0)
        })?;
        d.attribute_with("lines", array_of(object()), |d| {
            d.attribute("sku", STRING)?;
            d.attribute("count", INT32)?;
            d.require(["sku", "count"])
        })?;
        d.require(["id", "item", "quantity"])
    });
}

fn catalog(design: &mut Design) {
    design.service("Catalog", |d| {
        d.description("Browse and edit the items of the catalog.")?;
        d.http(|d| d.path("/catalog"))?;
        d.grpc(|d| d.package("catalog.v1"))?;
        d.security_with(["jwt"], |d| d.scope("catalog:read"))?;
        d.meta("openapi:tag", ["items"])?;
        d.error_with("NotFound", |d| {
            d.description("The item does not exist.")?;
            d.status_code(404)
        })?;

        d.method("Get", |d| {
            d.description("Fetches one item.")?;
            d.payload_with(object(), |d| {
                d.attribute("id", STRING)?;
                d.require(["id"])
            })?;
            d.result("Item")?;
            d.error("NotFound")?;
            d.http(|d| d.get("/items/{id}"))?;
            d.grpc(|_| Ok(()))
        })?;

        d.method("List", |d| {
            d.description("Lists items, newest first.")?;
            d.meta("openapi:summary", ["List the catalog"])?;
            d.no_security()?;
            d.payload_with(object(), |d| {
                d.attribute_with("limit", INT32, |d| {
                    d.default(20)?;
                    d.maximum(100.0)
                })?;
                d.attribute("tag", STRING)
            })?;
            d.result(array_of("Item"))?;
            d.http(|d| {
                d.get("/items")?;
                d.param("limit")?;
                d.param("tag")
            })?;
            d.grpc(|_| Ok(()))
        })?;

        d.method("Create", |d| {
            d.security_with(["jwt"], |d| d.scope("catalog:write"))?;
            d.payload("NewItem")?;
            d.result("Item")?;
            d.error_with("Conflict", |d| {
                d.description("An item with this name already exists.")?;
                d.status_code(409)
            })?;
            d.http(|d| {
                d.post("/items")?;
                d.response(201)
            })?;
            d.grpc(|d| d.status("OK"))
        })?;

        d.method("Delete", |d| {
            d.security_with(["jwt"], |d| d.scope("catalog:write"))?;
            d.payload_with(object(), |d| {
                d.attribute("id", STRING)?;
                d.require(["id"])
            })?;
            d.error("NotFound")?;
            d.http(|d| d.delete("/items/{id}"))
        })
    });
}

fn orders(design: &mut Design) {
    design.service("Orders", |d| {
        d.description("Orders placed against the catalog.")?;
        d.http(|d| d.path("/orders"))?;
        d.security(["partner_key"])?;
        d.method("Place", |d| {
            d.payload_with(object(), |d| {
                d.attribute("item_id", STRING)?;
                d.attribute("quantity", INT32)?;
                d.require(["item_id", "quantity"])
            })?;
            d.result("Order")?;
            d.http(|d| {
                d.post("/")?;
                d.response(201)
            })
        })
    });
}

const DOCS: &str = "# {{title}}

{{#each services}}## {{name}}

{{#if description}}{{description}}

{{/if}}| Method | Route | Description |
| --- | --- | --- |
{{#each methods}}| {{name}} | {{#each routes}}`{{this}}` {{/each}}| {{description}} |
{{/each}}
{{/each}}";

/// Markdown overview of every service and its routes.
#[design_kit::target("markdown-docs")]
fn markdown_docs(design: &ValidatedDesign) -> design_kit::Result<Vec<File>> {
    let title = design
        .api()
        .and_then(|api| api.title.clone())
        .unwrap_or_else(|| "API".to_string());
    let services: Vec<_> = design
        .services()
        .into_iter()
        .map(|(sid, service)| {
            let methods: Vec<_> = design
                .methods(sid)
                .into_iter()
                .map(|(mid, method)| {
                    let routes: Vec<_> = design
                        .routes(mid)
                        .iter()
                        .map(|r| format!("{} {}", r.method.as_str(), r.path))
                        .collect();
                    json!({
                        "name": method.name,
                        "description": method.description.as_deref().unwrap_or(""),
                        "routes": routes,
                    })
                })
                .collect();
            json!({
                "name": service.name,
                "description": service.description,
                "methods": methods,
            })
        })
        .collect();
    tracing::debug!(services = services.len(), "rendering markdown docs");

    Ok(vec![File::new("docs/API.md").with(Section::new(
        "services",
        DOCS,
        json!({"title": title, "services": services}),
    ))])
}

fn design() -> Design {
    let mut design = Design::new();
    api(&mut design);
    security(&mut design);
    catalog(&mut design);
    orders(&mut design);
    types(&mut design);
    design
}

fn main() -> anyhow::Result<()> {
    design_kit::cli::run(design())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_design_is_valid() {
        let validated = design().compile().unwrap();
        assert_eq!(validated.services().len(), 2);
        let order = validated.find_type("Order").unwrap();
        let item = validated.find_type("Item").unwrap();
        let position = |id| validated.type_order().iter().position(|t| *t == id);
        assert!(position(item) < position(order));
    }

    #[test]
    fn writes_need_the_write_scope() {
        let validated = design().compile().unwrap();
        let catalog = validated.graph().find_service("Catalog").unwrap();
        let scopes: Vec<_> = validated
            .methods(catalog)
            .into_iter()
            .map(|(mid, m)| {
                let scopes: Vec<_> = validated
                    .requirements(mid)
                    .iter()
                    .flat_map(|r| r.scopes.clone())
                    .collect();
                (m.name.clone(), scopes.join(" "))
            })
            .collect();
        assert_eq!(
            scopes,
            [
                ("Create".to_string(), "catalog:write".to_string()),
                ("Delete".to_string(), "catalog:write".to_string()),
                ("Get".to_string(), "catalog:read".to_string()),
                ("List".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn markdown_docs_list_the_routes() {
        let validated = design().compile().unwrap();
        let registry = TargetRegistry::discover().unwrap();
        let out = std::env::temp_dir().join("catalog-design-docs");
        let written = design_kit::generate(&validated, &registry, "markdown-docs", &out).unwrap();
        let docs = std::fs::read_to_string(&written[0]).unwrap();
        assert!(docs.starts_with("# Catalog API"));
        assert!(docs.contains("| Get | `GET /catalog/items/{id}` | Fetches one item. |"));
    }
}
