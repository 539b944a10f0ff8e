//! Template engine for rendering pages and layouts.

use std::collections::BTreeMap;
use std::path::Path;

use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior, Value};

use crate::error::SiteError;
use crate::filters;

/// Variables handed to a template render.
pub type Variables = BTreeMap<String, Value>;

/// Renders named templates.
///
/// Rendering is two-phase: [`extract_exports`](Self::extract_exports)
/// evaluates a template only for the top-level bindings it declares
/// (`{% set layout = "..." %}`, `{% set paginate = true %}`), and
/// [`render`](Self::render) produces the final text.
pub trait TemplateRenderer {
    /// Render a template to a string.
    fn render(&self, name: &str, vars: &Variables) -> Result<String, SiteError>;

    /// Evaluate a template and return the bindings it exports.
    fn extract_exports(&self, name: &str, vars: &Variables) -> Result<Variables, SiteError>;
}

/// Template renderer using minijinja.
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Create a renderer that loads templates from a directory.
    pub fn new(template_dir: impl AsRef<Path>) -> Self {
        let mut env = environment();
        env.set_loader(minijinja::path_loader(template_dir.as_ref().to_path_buf()));

        Self { env }
    }

    /// Create a renderer over in-memory templates.
    pub fn from_templates<I, N, S>(templates: I) -> Result<Self, SiteError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut env = environment();

        for (name, source) in templates {
            let name = name.into();
            env.add_template_owned(name.clone(), source.into())
                .map_err(|e| render_error(&name, e))?;
        }

        Ok(Self { env })
    }

    fn template(&self, name: &str) -> Result<minijinja::Template<'_, '_>, SiteError> {
        self.env.get_template(name).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => SiteError::TemplateNotFound(name.to_string()),
            _ => render_error(name, e),
        })
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, name: &str, vars: &Variables) -> Result<String, SiteError> {
        self.template(name)?
            .render(vars)
            .map_err(|e| render_error(name, e))
    }

    fn extract_exports(&self, name: &str, vars: &Variables) -> Result<Variables, SiteError> {
        let tmpl = self.template(name)?;
        let state = tmpl.eval_to_state(vars).map_err(|e| render_error(name, e))?;

        let exports = state
            .exports()
            .into_iter()
            .filter_map(|key| state.lookup(key).map(|value| (key.to_string(), value)))
            .collect();

        Ok(exports)
    }
}

/// Environment shared by both loading modes.
///
/// Auto-escaping is off; XML templates escape explicitly with `xml_escape`.
/// Undefined lookups chain so a listing template can be evaluated before its
/// `paginator` exists.
fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    filters::register(&mut env);
    env
}

fn render_error(template: &str, err: minijinja::Error) -> SiteError {
    SiteError::Render {
        template: template.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, Value)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn renders_with_variables() {
        let renderer =
            MiniJinjaRenderer::from_templates([("hello.html", "Hello {{ name }}!")]).unwrap();

        let html = renderer
            .render("hello.html", &vars(&[("name", Value::from("World"))]))
            .unwrap();

        assert_eq!(html, "Hello World!");
    }

    #[test]
    fn does_not_autoescape_html() {
        let renderer =
            MiniJinjaRenderer::from_templates([("page.html", "<div>{{ content }}</div>")])
                .unwrap();

        let html = renderer
            .render("page.html", &vars(&[("content", Value::from("<p>x</p>"))]))
            .unwrap();

        assert_eq!(html, "<div><p>x</p></div>");
    }

    #[test]
    fn extracts_exported_bindings() {
        let renderer = MiniJinjaRenderer::from_templates([(
            "news.html",
            "{% set paginate = true %}{% set layout = 'base.html' %}body",
        )])
        .unwrap();

        let exports = renderer.extract_exports("news.html", &Variables::new()).unwrap();

        assert!(exports["paginate"].is_true());
        assert_eq!(exports["layout"].as_str(), Some("base.html"));
    }

    #[test]
    fn undefined_lookups_chain() {
        let renderer = MiniJinjaRenderer::from_templates([(
            "news.html",
            "[{{ paginator.page }}]{% for p in paginator.posts %}x{% endfor %}",
        )])
        .unwrap();

        let html = renderer.render("news.html", &Variables::new()).unwrap();

        assert_eq!(html, "[]");
    }

    #[test]
    fn missing_template_is_not_found() {
        let renderer = MiniJinjaRenderer::from_templates([("a.html", "a")]).unwrap();

        let result = renderer.render("layout/missing.html", &Variables::new());

        assert!(matches!(result, Err(SiteError::TemplateNotFound(name)) if name == "layout/missing.html"));
    }

    #[test]
    fn syntax_errors_are_render_errors() {
        let result = MiniJinjaRenderer::from_templates([("bad.html", "{% if %}")]);

        assert!(matches!(result, Err(SiteError::Render { .. })));
    }

    #[test]
    fn loads_templates_from_directory() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("layout")).unwrap();
        std::fs::write(temp.path().join("layout/base.html"), "[{{ content }}]").unwrap();

        let renderer = MiniJinjaRenderer::new(temp.path());
        let html = renderer
            .render("layout/base.html", &vars(&[("content", Value::from("x"))]))
            .unwrap();

        assert_eq!(html, "[x]");
    }
}
