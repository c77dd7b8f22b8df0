use handlebars::Handlebars;
use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use serde_json::Value;

use crate::error::{Error, Result};

/// Handlebars registry shared by every section of one generation run.
///
/// Escaping is disabled: sections produce source code, not HTML.
pub struct Renderer {
    handlebars: Handlebars<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);

        // 命名风格转换
        handlebars.register_helper("snake", Box::new(snake_helper));
        handlebars.register_helper("pascal", Box::new(pascal_helper));
        handlebars.register_helper("camel", Box::new(camel_helper));
        handlebars.register_helper("kebab", Box::new(kebab_helper));
        handlebars.register_helper("shouty", Box::new(shouty_helper));
        handlebars.register_helper("json", Box::new(json_helper));
        handlebars.register_helper("pretty", Box::new(pretty_helper));
        handlebars.register_helper("literal", Box::new(literal_helper));

        Self { handlebars }
    }

    pub fn render(&self, section: &str, template: &str, data: &Value) -> Result<String> {
        self.handlebars
            .render_template(template, data)
            .map_err(|e| Error::Template {
                section: section.to_string(),
                message: e.to_string(),
            })
    }
}

fn write_converted(
    h: &handlebars::Helper,
    out: &mut dyn handlebars::Output,
    convert: fn(&str) -> String,
) -> handlebars::HelperResult {
    let param = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&convert(param))?;
    Ok(())
}

fn snake_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    write_converted(h, out, |s| s.to_snake_case())
}

fn pascal_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    write_converted(h, out, |s| s.to_upper_camel_case())
}

fn camel_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    write_converted(h, out, |s| s.to_lower_camel_case())
}

fn kebab_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    write_converted(h, out, |s| s.to_kebab_case())
}

fn shouty_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    write_converted(h, out, |s| s.to_shouty_snake_case())
}

fn json_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    if let Some(v) = h.param(0) {
        out.write(&serde_json::to_string(v.value()).unwrap_or_default())?;
    }
    Ok(())
}

fn pretty_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    if let Some(v) = h.param(0) {
        out.write(&serde_json::to_string_pretty(v.value()).unwrap_or_default())?;
    }
    Ok(())
}

/// A Rust string literal, quotes included.
fn literal_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    write_converted(h, out, |s| format!("{s:?}"))
}
