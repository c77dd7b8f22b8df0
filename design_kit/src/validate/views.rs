use super::{ResolvedView, Validator};
use crate::expr::{DataType, TypeId, ViewField};

/// Name of the view every result type has, declared or not.
pub const DEFAULT_VIEW: &str = "default";

impl Validator {
    /// Checks every view against the resolved attributes of its type, adds
    /// the implicit `default` view and computes required sets.
    pub(super) fn resolve_views(&mut self) {
        let result_types: Vec<TypeId> = self
            .graph
            .user_types()
            .filter(|(_, t)| t.is_result())
            .map(|(id, _)| id)
            .collect();

        for id in result_types {
            let def = self.graph.user_type(id).clone();
            let fields = self.fields_of(def.attr).to_vec();
            let mut resolved = Vec::new();
            let mut problems = Vec::new();

            for view in def.views.iter().flatten() {
                let mut kept = Vec::new();
                for listed in &view.fields {
                    let path = format!("{}.{}.{}", def.name, view.name, listed.name);
                    let Some(field) = fields.iter().find(|f| f.name == listed.name) else {
                        problems.push((
                            path,
                            format!(
                                "view \"{}\" of \"{}\" lists unknown attribute \"{}\"",
                                view.name, def.name, listed.name
                            ),
                        ));
                        continue;
                    };
                    if let Some(sub) = &listed.view {
                        if let Some(message) = self.check_sub_view(field.attr, sub) {
                            problems.push((path, message));
                            continue;
                        }
                    }
                    kept.push(listed.clone());
                }
                resolved.push(ResolvedView {
                    name: view.name.clone(),
                    required: required_in(&fields, &kept),
                    fields: kept,
                });
            }

            if !resolved.iter().any(|v| v.name == DEFAULT_VIEW) {
                let all: Vec<ViewField> = fields
                    .iter()
                    .map(|f| ViewField {
                        name: f.name.clone(),
                        view: None,
                    })
                    .collect();
                resolved.push(ResolvedView {
                    name: DEFAULT_VIEW.to_string(),
                    required: required_in(&fields, &all),
                    fields: all,
                });
            }

            for (path, message) in problems {
                self.report(path, message);
            }
            self.views.insert(id, resolved);
        }

        let selections: Vec<(String, crate::expr::AttrId, String)> = self
            .graph
            .attributes()
            .filter_map(|(id, a)| a.view.clone().map(|v| (a.path.clone(), id, v)))
            .collect();
        for (path, attr, view) in selections {
            if let Some(message) = self.check_sub_view(attr, &view) {
                self.report(path, message);
            }
        }
    }

    /// `None` when `attr` is a result type (or an array or map of one) that
    /// has a view named `view`.
    fn check_sub_view(&self, attr: crate::expr::AttrId, view: &str) -> Option<String> {
        let target = match &self.graph.attribute(attr).ty {
            DataType::User(t) => Some(*t),
            DataType::Array(elem) | DataType::Map { elem, .. } => {
                match self.graph.attribute(*elem).ty {
                    DataType::User(t) => Some(t),
                    _ => None,
                }
            }
            _ => None,
        };
        let Some(target) = target.filter(|t| self.graph.user_type(*t).is_result()) else {
            let ty = self.graph.type_name(&self.graph.attribute(attr).ty);
            return Some(format!("view \"{view}\" selected on {ty}, which is not a result type"));
        };
        let def = self.graph.user_type(target);
        if view == DEFAULT_VIEW || def.view(view).is_some() {
            None
        } else {
            Some(format!("result type \"{}\" has no view \"{view}\"", def.name))
        }
    }
}

fn required_in(fields: &[super::ResolvedField], listed: &[ViewField]) -> Vec<String> {
    fields
        .iter()
        .filter(|f| f.required && listed.iter().any(|l| l.name == f.name))
        .map(|f| f.name.clone())
        .collect()
}
