use crate::eval::{Dsl, DslResult, Keyword, VIEW};
use crate::expr::{NodeRef, ViewDef, ViewField};

impl Dsl {
    /// Declares a named view of the result type being configured.
    pub fn view<F>(&mut self, name: &str, f: F) -> DslResult
    where
        F: FnOnce(&mut Dsl) -> DslResult,
    {
        let NodeRef::Type(id) = self.enter(Keyword::View)? else {
            return self.misplaced(Keyword::View);
        };
        let Some(views) = self.graph.user_type_mut(id).views.as_mut() else {
            return self.misplaced(Keyword::View);
        };
        if views.iter().any(|v| v.name == name) {
            return self.fail(format!("view \"{name}\" is already defined"));
        }
        views.push(ViewDef {
            name: name.to_string(),
            fields: Vec::new(),
        });
        let index = views.len() - 1;
        self.nest(&VIEW, NodeRef::View(id, index), name, f)
    }

    /// Lists an attribute of the result type in the view being configured.
    pub fn include(&mut self, attribute: &str) -> DslResult {
        self.include_field(attribute, None)
    }

    /// Lists a result-type attribute rendered with one of its own views.
    pub fn include_view(&mut self, attribute: &str, view: &str) -> DslResult {
        self.include_field(attribute, Some(view.to_string()))
    }

    fn include_field(&mut self, name: &str, view: Option<String>) -> DslResult {
        let NodeRef::View(id, index) = self.enter(Keyword::Include)? else {
            return self.misplaced(Keyword::Include);
        };
        let Some(def) = self
            .graph
            .user_type_mut(id)
            .views
            .as_mut()
            .and_then(|views| views.get_mut(index))
        else {
            return self.misplaced(Keyword::Include);
        };
        if def.fields.iter().any(|f| f.name == name) {
            return self.fail(format!("attribute \"{name}\" is already listed"));
        }
        def.fields.push(ViewField {
            name: name.to_string(),
            view,
        });
        Ok(())
    }
}
