use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ResolvedField, Validator};
use crate::expr::{DataType, MethodId};

static WILDCARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\*?([a-zA-Z0-9_]+)\}").expect("wildcard pattern is valid"));

/// Names of the `{wildcards}` of a route path, in order of appearance.
pub fn wildcards(path: &str) -> Vec<String> {
    WILDCARD
        .captures_iter(path)
        .map(|c| c[1].to_string())
        .collect()
}

pub(crate) fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        path.to_string()
    } else if path == "/" {
        prefix.to_string()
    } else {
        format!("{prefix}{path}")
    }
}

/// What a method's payload looks like to route binding.
enum Payload {
    None,
    Primitive,
    Fields(Vec<ResolvedField>),
    Other(String),
}

impl Validator {
    pub(super) fn check_http(&mut self) {
        let mut problems = Vec::new();
        let mut bound: HashMap<(String, String), String> = HashMap::new();

        // 按名称遍历，诊断与声明顺序无关
        let mut services: Vec<_> = self.graph.services().map(|(_, s)| s).collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        for service in services {
            let mut methods = service.methods.clone();
            methods.sort_by(|a, b| self.graph.method(*a).name.cmp(&self.graph.method(*b).name));
            let prefix = service
                .http
                .as_ref()
                .and_then(|h| h.path.clone())
                .unwrap_or_default();
            for id in &methods {
                let method = self.graph.method(*id);
                let location = format!("{}.HTTP", method.path);
                let Some(http) = &method.http else {
                    if service.http.is_some() {
                        problems.push((
                            method.path.clone(),
                            "method of an HTTP service has no HTTP binding".to_string(),
                        ));
                    }
                    continue;
                };
                if http.routes.is_empty() {
                    problems.push((location.clone(), "no HTTP route defined".to_string()));
                }
                let payload = self.payload_shape(*id);

                for route in &http.routes {
                    let full = join_path(&prefix, &route.path);
                    let label = format!("{} {}", route.method, full);
                    let key = (route.method.to_string(), full.clone());
                    if let Some(owner) = bound.get(&key) {
                        problems.push((
                            location.clone(),
                            format!("route {label} is already bound to {owner}"),
                        ));
                    } else {
                        bound.insert(key, method.path.clone());
                    }

                    let names = wildcards(&full);
                    for (i, name) in names.iter().enumerate() {
                        if names[..i].contains(name) {
                            problems.push((
                                location.clone(),
                                format!("wildcard \"{name}\" appears multiple times in route {label}"),
                            ));
                            continue;
                        }
                        let problem = self.check_wildcard(&payload, name, names.len(), &label);
                        if let Some(message) = problem {
                            problems.push((location.clone(), message));
                        }
                    }
                }

                let mut named: Vec<(&str, &String)> =
                    http.params.iter().map(|p| ("Param", p)).collect();
                named.extend(http.body.iter().map(|b| ("Body", b)));
                for (keyword, name) in named {
                    let known = match &payload {
                        Payload::Fields(fields) => fields.iter().any(|f| &f.name == name),
                        _ => false,
                    };
                    if !known {
                        problems.push((
                            location.clone(),
                            format!("{keyword} \"{name}\" is not an attribute of the payload"),
                        ));
                    }
                }

                let mut statuses: Vec<u16> = http.responses.clone();
                for error in method.errors.iter().filter_map(|e| e.error) {
                    statuses.extend(self.graph.error(error).status);
                }
                let mut seen = Vec::new();
                let mut reported = Vec::new();
                for status in statuses {
                    if !seen.contains(&status) {
                        seen.push(status);
                    } else if !reported.contains(&status) {
                        reported.push(status);
                        problems.push((
                            location.clone(),
                            format!("status {status} is used by more than one response"),
                        ));
                    }
                }
            }
        }
        for (path, message) in problems {
            self.report(path, message);
        }
    }

    fn payload_shape(&self, id: MethodId) -> Payload {
        let Some(payload) = self.graph.method(id).payload else {
            return Payload::None;
        };
        match &self.graph.attribute(payload).ty {
            DataType::Primitive(_) => Payload::Primitive,
            DataType::Object(_) | DataType::User(_) => {
                Payload::Fields(self.fields_of(payload).to_vec())
            }
            other => Payload::Other(self.graph.type_name(other)),
        }
    }

    fn check_wildcard(
        &self,
        payload: &Payload,
        name: &str,
        count: usize,
        label: &str,
    ) -> Option<String> {
        match payload {
            Payload::None => Some(format!(
                "route {label} has wildcard \"{name}\" but the method has no payload"
            )),
            Payload::Primitive if count == 1 => None,
            Payload::Primitive => Some(format!(
                "route {label} has several wildcards but the payload is a single primitive"
            )),
            Payload::Other(ty) => Some(format!(
                "route {label} has wildcard \"{name}\" but the payload is {ty}"
            )),
            Payload::Fields(fields) => {
                let Some(field) = fields.iter().find(|f| f.name == name) else {
                    return Some(format!(
                        "wildcard \"{name}\" of route {label} is not an attribute of the payload"
                    ));
                };
                let ty = &self.graph.attribute(field.attr).ty;
                let scalar = match ty {
                    DataType::Primitive(_) => true,
                    DataType::Array(elem) => self.graph.attribute(*elem).ty.primitive().is_some(),
                    _ => false,
                };
                (!scalar).then(|| {
                    format!(
                        "wildcard \"{name}\" of route {label} must be a primitive, found {}",
                        self.graph.type_name(ty)
                    )
                })
            }
        }
    }
}
