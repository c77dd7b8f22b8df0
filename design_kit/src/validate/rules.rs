use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use super::Validator;
use crate::expr::{AttributeDef, DataType, Graph, Primitive};

impl Validator {
    /// Service and type names are unique.
    pub(super) fn check_namespaces(&mut self) {
        let mut seen = HashSet::new();
        let duplicates: Vec<String> = self
            .graph
            .services()
            .filter(|(_, s)| !seen.insert(s.name.clone()))
            .map(|(_, s)| s.name.clone())
            .collect();
        for name in duplicates {
            self.report(name.clone(), format!("service \"{name}\" is already defined"));
        }

        let mut seen = HashSet::new();
        let duplicates: Vec<String> = self
            .graph
            .user_types()
            .filter(|(_, t)| !seen.insert(t.name.clone()))
            .map(|(_, t)| t.name.clone())
            .collect();
        for name in duplicates {
            self.report(name.clone(), format!("type \"{name}\" is already defined"));
        }
    }

    /// Names the finalize pass could not resolve.
    pub(super) fn check_references(&mut self) {
        let mut problems = Vec::new();
        for (_, def) in self.graph.attributes() {
            if let DataType::Dangling(name) = &def.ty {
                problems.push((def.path.clone(), format!("unknown type \"{name}\"")));
            }
            for base in &def.bases {
                if let DataType::Dangling(name) = base {
                    problems.push((def.path.clone(), format!("Extend names unknown type \"{name}\"")));
                }
            }
            for reference in &def.references {
                if let DataType::Dangling(name) = reference {
                    problems.push((
                        def.path.clone(),
                        format!("Reference names unknown type \"{name}\""),
                    ));
                }
            }
        }
        for (_, service) in self.graph.services() {
            for id in &service.methods {
                let method = self.graph.method(*id);
                for error in method.errors.iter().filter(|e| e.error.is_none()) {
                    problems.push((
                        method.path.clone(),
                        format!(
                            "unknown error \"{}\": no such error in service \"{}\"",
                            error.name, service.name
                        ),
                    ));
                }
            }
        }
        for (path, message) in problems {
            self.report(path, message);
        }
    }

    /// Sanity of the rules attached to each attribute.
    pub(super) fn check_rules(&mut self) {
        let mut problems = Vec::new();
        for (_, def) in self.graph.attributes() {
            for message in attribute_problems(&self.graph, def) {
                problems.push((def.path.clone(), message));
            }
        }
        for (path, message) in problems {
            self.report(path, message);
        }
    }
}

fn attribute_problems(graph: &Graph, def: &AttributeDef) -> Vec<String> {
    let mut problems = Vec::new();
    let rules = &def.validation;
    let ty = &def.ty;
    if matches!(ty, DataType::Pending(_) | DataType::Dangling(_)) {
        return problems;
    }
    let type_name = graph.type_name(ty);
    let primitive = ty.primitive();

    if let DataType::Map { key, .. } = ty {
        if graph.attribute(*key).ty.primitive().is_none() {
            let key = graph.type_name(&graph.attribute(*key).ty);
            problems.push(format!("map keys must be primitive, found {key}"));
        }
    }

    let has_length = matches!(primitive, Some(Primitive::String | Primitive::Bytes))
        || matches!(ty, DataType::Array(_) | DataType::Map { .. });
    if (rules.min_length.is_some() || rules.max_length.is_some()) && !has_length {
        problems.push(format!(
            "MinLength and MaxLength apply to strings and collections, not {type_name}"
        ));
    }
    if let (Some(min), Some(max)) = (rules.min_length, rules.max_length) {
        if min > max {
            problems.push(format!("MinLength ({min}) is greater than MaxLength ({max})"));
        }
    }

    let numeric = primitive.is_some_and(Primitive::is_numeric);
    if (rules.minimum.is_some() || rules.maximum.is_some()) && !numeric {
        problems.push(format!("Minimum and Maximum apply to numbers, not {type_name}"));
    }
    if let (Some(min), Some(max)) = (rules.minimum, rules.maximum) {
        if min > max {
            problems.push(format!("Minimum ({min}) is greater than Maximum ({max})"));
        }
    }

    let string = primitive == Some(Primitive::String);
    if let Some(pattern) = &rules.pattern {
        if !string {
            problems.push(format!("Pattern applies to strings, not {type_name}"));
        } else if let Err(err) = Regex::new(pattern) {
            problems.push(format!("invalid Pattern {pattern:?}: {err}"));
        }
    }
    if rules.format.is_some() && !string {
        problems.push(format!("Format applies to strings, not {type_name}"));
    }

    if let Some(values) = &rules.enum_values {
        match primitive {
            Some(p) => {
                for value in values.iter().filter(|v| !p.accepts(v)) {
                    problems.push(format!("enum value {value} is not a valid {type_name}"));
                }
            }
            None => problems.push(format!("Enum applies to primitive types, not {type_name}")),
        }
    }

    if let Some(default) = &def.default {
        if let Some(p) = primitive {
            if !p.accepts(default) {
                problems.push(format!("default value {default} is not a valid {type_name}"));
            }
        }
        if let Some(values) = &rules.enum_values {
            if !values.contains(default) {
                problems.push(format!("default value {default} is not one of the enum values"));
            }
        }
        if let (Some(min), Value::Number(n)) = (rules.minimum, default) {
            if n.as_f64().is_some_and(|v| v < min) {
                problems.push(format!("default value {default} is lower than Minimum ({min})"));
            }
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use crate::dsl::{INT32, STRING, UINT};
    use crate::eval::Design;
    use crate::expr::{map_of, Format};

    fn messages(design: Design) -> Vec<String> {
        design
            .compile()
            .unwrap_err()
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    #[test]
    fn bounds_must_be_ordered() {
        let mut design = Design::new();
        design.user_type("Page", |d| {
            d.attribute_with("size", INT32, |d| {
                d.minimum(10.0)?;
                d.maximum(1.0)
            })?;
            d.attribute_with("token", STRING, |d| {
                d.min_length(8)?;
                d.max_length(4)
            })
        });
        assert_eq!(
            messages(design),
            [
                "Minimum (10) is greater than Maximum (1)",
                "MinLength (8) is greater than MaxLength (4)"
            ]
        );
    }

    #[test]
    fn rules_must_fit_the_type() {
        let mut design = Design::new();
        design.user_type("Item", |d| {
            d.attribute_with("count", UINT, |d| {
                d.pattern("^[0-9]+$")?;
                d.format(Format::Uuid)
            })?;
            d.attribute_with("name", STRING, |d| d.minimum(1.0))
        });
        assert_eq!(
            messages(design),
            [
                "Pattern applies to strings, not UInt",
                "Format applies to strings, not UInt",
                "Minimum and Maximum apply to numbers, not String",
            ]
        );
    }

    #[test]
    fn invalid_patterns_are_reported() {
        let mut design = Design::new();
        design.user_type("Item", |d| d.attribute_with("sku", STRING, |d| d.pattern("([a-z")));
        let found = messages(design);
        assert_eq!(found.len(), 1);
        assert!(found[0].starts_with("invalid Pattern \"([a-z\""), "{}", found[0]);
    }

    #[test]
    fn defaults_must_match_type_and_enum() {
        let mut design = Design::new();
        design.user_type("Item", |d| {
            d.attribute_with("state", STRING, |d| {
                d.enum_values(["draft", "published"])?;
                d.default("archived")
            })?;
            d.attribute_with("rank", INT32, |d| d.default("high"))
        });
        assert_eq!(
            messages(design),
            [
                "default value \"archived\" is not one of the enum values",
                "default value \"high\" is not a valid Int32",
            ]
        );
    }

    #[test]
    fn map_keys_are_primitive() {
        let mut design = Design::new();
        design.user_type("Key", |d| d.attribute("id", STRING));
        design.user_type("Index", |d| d.attribute("entries", map_of("Key", STRING)));
        assert_eq!(messages(design), ["map keys must be primitive, found Key"]);
    }

    #[test]
    fn three_independent_mistakes_are_three_diagnostics() {
        let mut design = Design::new();
        design.service("Catalog", |_| Ok(()));
        design.service("Catalog", |_| Ok(()));
        design.user_type("Item", |d| d.attribute("owner", "Missing"));
        design.user_type("A", |d| d.extend("B"));
        design.user_type("B", |d| d.extend("A"));

        let diagnostics = design.compile().unwrap_err();
        let found: Vec<_> = diagnostics.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(found, ["Catalog", "Item.owner", "B"]);
    }
}
