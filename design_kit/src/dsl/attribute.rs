use serde_json::Value;

use crate::eval::{Dsl, DslResult, Keyword, ATTRIBUTE};
use crate::expr::{AttrId, AttributeDef, DataType, Format, Graph, NodeRef, Object, TypeSpec};

type NoBuilder = fn(&mut Dsl) -> DslResult;

impl Dsl {
    /// Creates the attribute node(s) for a type argument. Named types are
    /// left pending and resolved in the finalize pass.
    pub(crate) fn build_attribute(&mut self, spec: TypeSpec, path: String) -> AttrId {
        let ty = match spec {
            TypeSpec::Primitive(p) => DataType::Primitive(p),
            TypeSpec::Object => DataType::Object(Object::default()),
            TypeSpec::Array(elem) => DataType::Array(self.build_attribute(*elem, format!("{path}[]"))),
            TypeSpec::Map(key, elem) => DataType::Map {
                key: self.build_attribute(*key, format!("{path}[key]")),
                elem: self.build_attribute(*elem, format!("{path}[]")),
            },
            TypeSpec::Named(name) => {
                let id = self
                    .graph
                    .add_attribute(AttributeDef::new(DataType::Pending(name.clone()), path));
                self.defer(move |graph| {
                    let ty = resolve_named(graph, name);
                    graph.attribute_mut(id).ty = ty;
                });
                return id;
            }
        };
        self.graph.add_attribute(AttributeDef::new(ty, path))
    }

    /// The object attribute the current node declares attributes on. An
    /// array of inline objects exposes its element.
    fn object_holder(&mut self, keyword: Keyword, node: NodeRef) -> DslResult<AttrId> {
        let attr = match node {
            NodeRef::Type(id) => self.graph.user_type(id).attr,
            NodeRef::Error(id) => self.graph.error(id).attr,
            NodeRef::Attribute(id) => id,
            _ => return self.misplaced(keyword),
        };
        let attr = match &self.graph.attribute(attr).ty {
            DataType::Array(elem) if self.graph.attribute(*elem).ty.is_object() => *elem,
            _ => attr,
        };
        let ty = &self.graph.attribute(attr).ty;
        if ty.is_object() {
            Ok(attr)
        } else {
            let name = self.graph.type_name(ty);
            self.fail(format!("{keyword} requires an object, found {name}"))
        }
    }

    fn attribute_node(&mut self, keyword: Keyword) -> DslResult<AttrId> {
        match self.enter(keyword)? {
            NodeRef::Attribute(id) => Ok(id),
            _ => self.misplaced(keyword),
        }
    }

    pub fn attribute(&mut self, name: &str, spec: impl Into<TypeSpec>) -> DslResult {
        self.add_attribute::<NoBuilder>(name, spec.into(), None)
    }

    pub fn attribute_with<F>(&mut self, name: &str, spec: impl Into<TypeSpec>, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        self.add_attribute(name, spec.into(), Some(f))
    }

    fn add_attribute<F>(&mut self, name: &str, spec: TypeSpec, f: Option<F>) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        let node = self.enter(Keyword::Attribute)?;
        let owner = self.object_holder(Keyword::Attribute, node)?;
        let exists = self
            .graph
            .attribute(owner)
            .ty
            .as_object()
            .is_some_and(|o| o.contains(name));
        if exists {
            return self.fail(format!("attribute \"{name}\" is already defined"));
        }
        let path = format!("{}.{}", self.graph.attribute(owner).path, name);
        let attr = self.build_attribute(spec, path);
        if let DataType::Object(object) = &mut self.graph.attribute_mut(owner).ty {
            object.push(name, attr);
        }
        match f {
            Some(f) => self.nest(&ATTRIBUTE, NodeRef::Attribute(attr), name, f),
            None => Ok(()),
        }
    }

    /// Flags the attribute being configured as required.
    pub fn required(&mut self) -> DslResult {
        let attr = self.attribute_node(Keyword::Required)?;
        self.graph.attribute_mut(attr).required = true;
        Ok(())
    }

    /// Flags attributes of the object being configured as required.
    pub fn require<I, S>(&mut self, names: I) -> DslResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let node = self.enter(Keyword::Required)?;
        let owner = self.object_holder(Keyword::Required, node)?;
        let required = &mut self.graph.attribute_mut(owner).required_names;
        for name in names {
            let name = name.into();
            if !required.contains(&name) {
                required.push(name);
            }
        }
        Ok(())
    }

    /// Copies the attributes of a named type into the object being
    /// configured. Own attributes win on a name collision.
    pub fn extend(&mut self, name: &str) -> DslResult {
        self.compose(Keyword::Extend, name)
    }

    /// Inherits description, rules and default of same-named attributes
    /// from a named type, without adding attributes.
    pub fn reference(&mut self, name: &str) -> DslResult {
        self.compose(Keyword::Reference, name)
    }

    fn compose(&mut self, keyword: Keyword, name: &str) -> DslResult {
        let node = self.enter(keyword)?;
        let owner = self.object_holder(keyword, node)?;
        let extend = keyword == Keyword::Extend;
        let def = self.graph.attribute_mut(owner);
        let list = if extend { &mut def.bases } else { &mut def.references };
        list.push(DataType::Pending(name.to_string()));
        let slot = list.len() - 1;
        let name = name.to_string();
        self.defer(move |graph| {
            let resolved = resolve_named(graph, name);
            let def = graph.attribute_mut(owner);
            let list = if extend { &mut def.bases } else { &mut def.references };
            list[slot] = resolved;
        });
        Ok(())
    }

    pub fn default(&mut self, value: impl Into<Value>) -> DslResult {
        let attr = self.attribute_node(Keyword::Default)?;
        self.graph.attribute_mut(attr).default = Some(value.into());
        Ok(())
    }

    pub fn example(&mut self, value: impl Into<Value>) -> DslResult {
        let attr = self.attribute_node(Keyword::Example)?;
        self.graph.attribute_mut(attr).example = Some(value.into());
        Ok(())
    }

    pub fn enum_values<I, V>(&mut self, values: I) -> DslResult
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let attr = self.attribute_node(Keyword::Enum)?;
        let values = values.into_iter().map(Into::into).collect::<Vec<_>>();
        if values.is_empty() {
            return self.fail("Enum requires at least one value");
        }
        self.graph.attribute_mut(attr).validation.enum_values = Some(values);
        Ok(())
    }

    pub fn format(&mut self, format: Format) -> DslResult {
        let attr = self.attribute_node(Keyword::Format)?;
        self.graph.attribute_mut(attr).validation.format = Some(format);
        Ok(())
    }

    /// Regular expression the value must match; compiled by the validator.
    pub fn pattern(&mut self, pattern: &str) -> DslResult {
        let attr = self.attribute_node(Keyword::Pattern)?;
        self.graph.attribute_mut(attr).validation.pattern = Some(pattern.to_string());
        Ok(())
    }

    pub fn min_length(&mut self, min: usize) -> DslResult {
        let attr = self.attribute_node(Keyword::MinLength)?;
        self.graph.attribute_mut(attr).validation.min_length = Some(min);
        Ok(())
    }

    pub fn max_length(&mut self, max: usize) -> DslResult {
        let attr = self.attribute_node(Keyword::MaxLength)?;
        self.graph.attribute_mut(attr).validation.max_length = Some(max);
        Ok(())
    }

    pub fn minimum(&mut self, min: f64) -> DslResult {
        let attr = self.attribute_node(Keyword::Minimum)?;
        self.graph.attribute_mut(attr).validation.minimum = Some(min);
        Ok(())
    }

    pub fn maximum(&mut self, max: f64) -> DslResult {
        let attr = self.attribute_node(Keyword::Maximum)?;
        self.graph.attribute_mut(attr).validation.maximum = Some(max);
        Ok(())
    }

    /// Selects the view used to render a result-type attribute.
    pub fn use_view(&mut self, view: &str) -> DslResult {
        let attr = self.attribute_node(Keyword::UseView)?;
        self.graph.attribute_mut(attr).view = Some(view.to_string());
        Ok(())
    }
}

fn resolve_named(graph: &Graph, name: String) -> DataType {
    match graph.find_type(&name) {
        Some(id) => DataType::User(id),
        None => DataType::Dangling(name),
    }
}
