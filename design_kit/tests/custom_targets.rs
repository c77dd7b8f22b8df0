use std::fs;

use design_kit::prelude::*;
use design_kit::{generate, Error};
use serde_json::json;

/// One line per service and method.
#[design_kit::target("service-index")]
fn service_index(design: &ValidatedDesign) -> design_kit::Result<Vec<File>> {
    let mut lines = Vec::new();
    for (sid, service) in design.services() {
        for (_, method) in design.methods(sid) {
            lines.push(format!("{}.{}", service.name, method.name));
        }
    }
    Ok(vec![File::new("index.txt").with(Section::new(
        "lines",
        "{{#each lines}}{{this}}\n{{/each}}",
        json!({ "lines": lines }),
    ))])
}

#[design_kit::target]
fn escape_attempt(_: &ValidatedDesign) -> design_kit::Result<Vec<File>> {
    Ok(vec![File::new("../outside.txt").with(Section::new("body", "x", json!({})))])
}

fn design() -> ValidatedDesign {
    let mut design = Design::new();
    design.service("Orders", |d| {
        d.method("Place", |d| d.result(STRING))?;
        d.method("Cancel", |_| Ok(()))
    });
    design.service("Billing", |d| d.method("Charge", |_| Ok(())));
    design.compile().unwrap()
}

#[test]
fn discover_picks_up_attribute_targets() {
    let registry = TargetRegistry::discover().unwrap();
    assert!(registry.names().contains(&"service-index"));
    assert!(registry.names().contains(&"escape-attempt"));
    assert!(registry.names().contains(&"openapi"));
    assert_eq!(
        registry.get("service-index").unwrap().description(),
        "One line per service and method."
    );
    assert_eq!(registry.get("escape-attempt").unwrap().description(), "");
}

#[test]
fn custom_target_output_is_sorted() {
    let registry = TargetRegistry::discover().unwrap();
    let out = tempfile::tempdir().unwrap();
    generate(&design(), &registry, "service-index", out.path()).unwrap();
    let index = fs::read_to_string(out.path().join("index.txt")).unwrap();
    assert_eq!(index, "Billing.Charge\nOrders.Cancel\nOrders.Place\n");
}

#[test]
fn paths_outside_the_root_are_refused() {
    let registry = TargetRegistry::discover().unwrap();
    let out = tempfile::tempdir().unwrap();
    let err = generate(&design(), &registry, "escape-attempt", out.path()).unwrap_err();
    assert!(matches!(err, Error::Contract { .. }));
    assert!(!out.path().join("../outside.txt").exists());
}

#[test]
fn registering_a_closure_next_to_discovered_targets() {
    let mut registry = TargetRegistry::discover().unwrap();
    registry
        .register("count", "Number of services", |design| {
            let count = design.services().len();
            Ok(vec![File::new("count.txt").with(Section::new(
                "count",
                "{{count}}",
                json!({ "count": count }),
            ))])
        })
        .unwrap();
    let out = tempfile::tempdir().unwrap();
    generate(&design(), &registry, "count", out.path()).unwrap();
    assert_eq!(fs::read_to_string(out.path().join("count.txt")).unwrap(), "2");

    let err = registry
        .register("service-index", "again", |_| Ok(Vec::new()))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateTarget(name) if name == "service-index"));
}
