use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::{ResolvedField, Validator};
use crate::expr::{AttrId, DataType};

impl Validator {
    /// Resolves the attribute set of every object, memoized by node, bases
    /// before the objects extending them.
    pub(super) fn resolve_extensions(&mut self) {
        let objects: Vec<AttrId> = self
            .graph
            .attributes()
            .filter(|(_, a)| a.ty.is_object())
            .map(|(id, _)| id)
            .collect();
        debug!(objects = objects.len(), "resolving extensions");
        let mut reported = HashSet::new();
        for id in objects {
            let mut stack = Vec::new();
            self.resolve_object(id, &mut stack, &mut reported);
        }
    }

    fn resolve_object(
        &mut self,
        id: AttrId,
        stack: &mut Vec<AttrId>,
        reported: &mut HashSet<BTreeSet<AttrId>>,
    ) -> Vec<ResolvedField> {
        if let Some(done) = self.resolved.get(&id) {
            return done.clone();
        }
        if let Some(start) = stack.iter().position(|a| *a == id) {
            let members: BTreeSet<AttrId> = stack[start..].iter().copied().collect();
            if reported.insert(members) {
                let mut chain: Vec<&str> = stack[start..]
                    .iter()
                    .map(|a| self.graph.attribute(*a).path.as_str())
                    .collect();
                chain.push(self.graph.attribute(id).path.as_str());
                let message = format!("extension cycle: {}", chain.join(" -> "));
                let path = self.graph.attribute(stack[stack.len() - 1]).path.clone();
                self.report(path, message);
            }
            return Vec::new();
        }

        stack.push(id);
        let def = self.graph.attribute(id).clone();
        let mut fields: Vec<ResolvedField> = Vec::new();
        for base in &def.bases {
            let DataType::User(t) = base else { continue };
            let base_attr = self.graph.user_type(*t).attr;
            for field in self.resolve_object(base_attr, stack, reported) {
                merge(&mut fields, field);
            }
        }
        if let DataType::Object(object) = &def.ty {
            for field in object.iter() {
                let required = self.graph.attribute(field.attr).required;
                merge(
                    &mut fields,
                    ResolvedField {
                        name: field.name.clone(),
                        attr: field.attr,
                        required,
                    },
                );
            }
        }
        for field in &mut fields {
            if def.required_names.contains(&field.name) {
                field.required = true;
            }
        }
        stack.pop();

        self.resolved.insert(id, fields.clone());
        fields
    }

    /// `Reference`: own attributes inherit documentation, rules and default
    /// from the same-named attribute of the referenced type. Inherited base
    /// attributes are left untouched.
    pub(super) fn apply_references(&mut self) {
        let holders: Vec<(AttrId, Vec<DataType>)> = self
            .graph
            .attributes()
            .filter(|(_, a)| !a.references.is_empty())
            .map(|(id, a)| (id, a.references.clone()))
            .collect();
        for (id, references) in holders {
            let own: Vec<(String, AttrId)> = match &self.graph.attribute(id).ty {
                DataType::Object(object) => object.iter().map(|f| (f.name.clone(), f.attr)).collect(),
                _ => continue,
            };
            for reference in references {
                let DataType::User(t) = reference else { continue };
                let source = self.fields_of(self.graph.user_type(t).attr).to_vec();
                for (name, attr) in &own {
                    if let Some(from) = source.iter().find(|f| &f.name == name) {
                        let from = self.graph.attribute(from.attr).clone();
                        self.graph.attribute_mut(*attr).inherit_from(&from);
                    }
                }
            }
        }
    }

    pub(super) fn check_required_names(&mut self) {
        let mut missing = Vec::new();
        for (id, def) in self.graph.attributes() {
            if def.required_names.is_empty() || !def.ty.is_object() {
                continue;
            }
            let fields = self.resolved.get(&id).map(Vec::as_slice).unwrap_or(&[]);
            for name in &def.required_names {
                if !fields.iter().any(|f| &f.name == name) {
                    missing.push((def.path.clone(), name.clone()));
                }
            }
        }
        for (path, name) in missing {
            self.report(path, format!("required attribute \"{name}\" is not defined"));
        }
    }
}

fn merge(fields: &mut Vec<ResolvedField>, field: ResolvedField) {
    match fields.iter_mut().find(|f| f.name == field.name) {
        Some(slot) => *slot = field,
        None => fields.push(field),
    }
}

#[cfg(test)]
mod tests {
    use crate::dsl::{INT64, STRING};
    use crate::eval::Design;

    #[test]
    fn chained_extension_resolves_in_base_order() {
        let mut design = Design::new();
        design.user_type("C", |d| {
            d.extend("B")?;
            d.attribute("c", STRING)
        });
        design.user_type("B", |d| {
            d.extend("A")?;
            d.attribute("b", STRING)
        });
        design.user_type("A", |d| d.attribute("a", STRING));
        let validated = design.compile().unwrap();
        let c = validated.find_type("C").unwrap();
        let names: Vec<_> = validated.type_fields(c).iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn extension_does_not_touch_the_base() {
        let mut design = Design::new();
        design.user_type("Base", |d| {
            d.attribute("a", STRING)?;
            d.attribute("b", STRING)
        });
        design.user_type("Child", |d| {
            d.extend("Base")?;
            d.attribute("b", INT64)?;
            d.require(["a"])
        });
        let validated = design.compile().unwrap();
        let base = validated.find_type("Base").unwrap();
        assert!(validated.type_fields(base).iter().all(|f| !f.required));
        let b = &validated.type_fields(base)[1];
        assert_eq!(validated.attribute(b.attr).ty.primitive(), Some(crate::expr::Primitive::String));
    }

    #[test]
    fn extension_cycle_is_reported_once() {
        let mut design = Design::new();
        design.user_type("A", |d| d.extend("B"));
        design.user_type("B", |d| d.extend("A"));
        let diagnostics = design.compile().unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.path, "B");
        assert_eq!(diagnostic.message, "extension cycle: A -> B -> A");
    }

    #[test]
    fn reference_inherits_rules_without_adding_attributes() {
        let mut design = Design::new();
        design.user_type("Named", |d| {
            d.attribute_with("name", STRING, |d| {
                d.description("Display name")?;
                d.max_length(64)
            })?;
            d.attribute("slug", STRING)
        });
        design.user_type("Item", |d| {
            d.reference("Named")?;
            d.attribute("name", STRING)
        });
        let validated = design.compile().unwrap();
        let item = validated.find_type("Item").unwrap();
        let fields = validated.type_fields(item);
        assert_eq!(fields.len(), 1);
        let name = validated.attribute(fields[0].attr);
        assert_eq!(name.description.as_deref(), Some("Display name"));
        assert_eq!(name.validation.max_length, Some(64));
    }

    #[test]
    fn required_names_must_exist() {
        let mut design = Design::new();
        design.user_type("Item", |d| {
            d.attribute("id", STRING)?;
            d.require(["id", "sku"])
        });
        let diagnostics = design.compile().unwrap_err();
        let messages: Vec<_> = diagnostics.iter().map(|d| (d.path.as_str(), d.message.as_str())).collect();
        assert_eq!(messages, [("Item", "required attribute \"sku\" is not defined")]);
    }
}
