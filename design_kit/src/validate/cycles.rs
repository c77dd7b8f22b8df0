use std::collections::{BTreeSet, HashSet};

use super::Validator;
use crate::expr::{AttrId, DataType, TypeId};

/// State of one walk from a root type.
struct Walk {
    path: Vec<String>,
    on_path: Vec<TypeId>,
    /// For each entry of `on_path`, the length of `path` when it was entered.
    entered: Vec<usize>,
    done: HashSet<TypeId>,
}

impl Validator {
    /// Rejects type cycles that do not pass through an array or a map.
    /// Map values and map keys break cycles exactly like array elements.
    /// A cycle is reported once, at the path from the type through which
    /// the first walk (in type name order) entered it.
    pub(super) fn check_cycles(&mut self) {
        let mut roots: Vec<TypeId> = self.graph.user_types().map(|(id, _)| id).collect();
        roots.sort_by(|a, b| self.graph.user_type(*a).name.cmp(&self.graph.user_type(*b).name));
        let mut seen: HashSet<BTreeSet<TypeId>> = HashSet::new();
        let mut found = Vec::new();
        for root in roots {
            let mut walk = Walk {
                path: Vec::new(),
                on_path: vec![root],
                entered: vec![0],
                done: HashSet::new(),
            };
            self.walk_direct(self.graph.user_type(root).attr, &mut walk, &mut found);
        }
        for (path, members) in found {
            let key: BTreeSet<TypeId> = members.iter().copied().collect();
            if !seen.insert(key) {
                continue;
            }
            let mut chain: Vec<&str> = members
                .iter()
                .map(|t| self.graph.user_type(*t).name.as_str())
                .collect();
            chain.push(self.graph.user_type(members[0]).name.as_str());
            let message = format!(
                "type cycle without array or map indirection: {}",
                chain.join(" -> ")
            );
            self.report(path, message);
        }
    }

    fn walk_direct(&self, object: AttrId, walk: &mut Walk, found: &mut Vec<(String, Vec<TypeId>)>) {
        for field in self.fields_of(object) {
            walk.path.push(field.name.clone());
            match &self.graph.attribute(field.attr).ty {
                DataType::User(next) => {
                    if let Some(start) = walk.on_path.iter().position(|t| t == next) {
                        // 从进入环的类型开始命名路径
                        let mut path = vec![self.graph.user_type(*next).name.as_str()];
                        path.extend(walk.path[walk.entered[start]..].iter().map(String::as_str));
                        found.push((path.join("."), walk.on_path[start..].to_vec()));
                    } else if !walk.done.contains(next) {
                        walk.on_path.push(*next);
                        walk.entered.push(walk.path.len());
                        self.walk_direct(self.graph.user_type(*next).attr, walk, found);
                        walk.entered.pop();
                        walk.on_path.pop();
                        walk.done.insert(*next);
                    }
                }
                DataType::Object(_) => self.walk_direct(field.attr, walk, found),
                _ => {}
            }
            walk.path.pop();
        }
    }

    /// Dependency order of user types: every type after the types it
    /// references through attributes, arrays and maps. Roots are taken in
    /// name order so the result does not depend on declaration order.
    pub(super) fn order_types(&mut self) {
        let mut roots: Vec<TypeId> = self.graph.user_types().map(|(id, _)| id).collect();
        roots.sort_by(|a, b| {
            let (a, b) = (self.graph.user_type(*a), self.graph.user_type(*b));
            a.name.cmp(&b.name)
        });
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        for root in roots {
            self.visit_type(root, &mut visited, &mut order);
        }
        self.type_order = order;
    }

    fn visit_type(&self, id: TypeId, visited: &mut HashSet<TypeId>, order: &mut Vec<TypeId>) {
        if !visited.insert(id) {
            return;
        }
        let mut deps = Vec::new();
        self.collect_dependencies(self.graph.user_type(id).attr, &mut deps);
        for dep in deps {
            self.visit_type(dep, visited, order);
        }
        order.push(id);
    }

    fn collect_dependencies(&self, attr: AttrId, deps: &mut Vec<TypeId>) {
        match &self.graph.attribute(attr).ty {
            DataType::User(t) => {
                if !deps.contains(t) {
                    deps.push(*t);
                }
            }
            DataType::Array(elem) => self.collect_dependencies(*elem, deps),
            DataType::Map { key, elem } => {
                self.collect_dependencies(*key, deps);
                self.collect_dependencies(*elem, deps);
            }
            DataType::Object(_) => {
                for field in self.fields_of(attr) {
                    self.collect_dependencies(field.attr, deps);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dsl::STRING;
    use crate::eval::Design;
    use crate::expr::{array_of, map_of, object};

    #[test]
    fn mutual_cycle_is_reported_once_with_its_path() {
        let mut design = Design::new();
        design.user_type("A", |d| d.attribute("b", "B"));
        design.user_type("B", |d| d.attribute("a", "A"));
        let diagnostics = design.compile().unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.path, "A.b.a");
        assert_eq!(
            diagnostic.message,
            "type cycle without array or map indirection: A -> B -> A"
        );
    }

    #[test]
    fn cycle_path_starts_at_the_cycling_type() {
        let mut design = Design::new();
        design.user_type("B", |d| d.attribute("a", "A"));
        design.user_type("A", |d| d.attribute("field", "A"));
        let diagnostics = design.compile().unwrap_err();
        let paths: Vec<_> = diagnostics.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["A.field"]);

        let mut design = Design::new();
        design.user_type("Z", |d| d.attribute("loop", "Z"));
        design.user_type("Holder", |d| d.attribute("z", "Z"));
        let diagnostics = design.compile().unwrap_err();
        let paths: Vec<_> = diagnostics.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["Z.loop"]);
    }

    #[test]
    fn mutual_cycle_path_does_not_follow_declaration_order() {
        let mut design = Design::new();
        design.user_type("B", |d| d.attribute("a", "A"));
        design.user_type("A", |d| d.attribute("b", "B"));
        let diagnostics = design.compile().unwrap_err();
        let paths: Vec<_> = diagnostics.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["A.b.a"]);
    }

    #[test]
    fn cycles_through_inline_objects_are_direct() {
        let mut design = Design::new();
        design.user_type("Node", |d| {
            d.attribute_with("meta", object(), |d| d.attribute("parent", "Node"))
        });
        let diagnostics = design.compile().unwrap_err();
        assert_eq!(diagnostics.iter().next().unwrap().path, "Node.meta.parent");
    }

    // Map values break cycles the same way array elements do.
    #[test]
    fn map_indirection_breaks_a_cycle() {
        let mut design = Design::new();
        design.user_type("Tree", |d| {
            d.attribute("name", STRING)?;
            d.attribute("children", map_of(STRING, "Tree"))
        });
        assert!(design.compile().is_ok());
    }

    #[test]
    fn dependencies_come_first_whatever_the_declaration_order() {
        let build = |reversed: bool| {
            let mut design = Design::new();
            let declare_order = |design: &mut Design| {
                design.user_type("Order", |d| {
                    d.attribute("lines", array_of("Line"))?;
                    d.attribute("buyer", "Account")
                });
            };
            let declare_rest = |design: &mut Design| {
                design.user_type("Line", |d| d.attribute("item", "Item"));
                design.user_type("Item", |d| d.attribute("id", STRING));
                design.user_type("Account", |d| d.attribute("id", STRING));
            };
            if reversed {
                declare_rest(&mut design);
                declare_order(&mut design);
            } else {
                declare_order(&mut design);
                declare_rest(&mut design);
            }
            let validated = design.compile().unwrap();
            validated
                .type_order()
                .iter()
                .map(|t| validated.user_type(*t).name.clone())
                .collect::<Vec<_>>()
        };
        let expected = ["Account", "Item", "Line", "Order"];
        assert_eq!(build(false), expected);
        assert_eq!(build(true), expected);
    }
}
