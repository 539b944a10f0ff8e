//! Pages: one output document per template.
//!
//! A page knows three things about itself that templates rely on:
//!
//! - its `date` and `slug`, parsed from an optional `YYYY-MM-DD-` prefix on
//!   the file name,
//! - its permalink, derived from the template name unless a `permalink`
//!   variable overrides it,
//! - the file it is written to under the output directory.
//!
//! The permalink and the output filename are resolved once and then stay
//! fixed for the lifetime of the page.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use gazette_markdown::MarkdownConverter;
use minijinja::Value;
use regex::Regex;

use crate::assets;
use crate::error::SiteError;
use crate::templates::{TemplateRenderer, Variables};

/// Format of `page.date` as seen by templates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static DATE_SLUG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d{4}-\d{2}-\d{2})-)?(.+)$").expect("valid regex")
});

/// Collaborators and shared variables a page renders with.
pub struct RenderContext<'a> {
    /// Template engine
    pub renderer: &'a dyn TemplateRenderer,

    /// Markdown converter for `.md` templates
    pub markdown: &'a dyn MarkdownConverter,

    /// The `site` variable
    pub site: Value,

    /// Root of the generated site
    pub output_dir: &'a Path,
}

/// A rendered output document.
#[derive(Debug)]
pub struct Page {
    name: String,
    date: NaiveDate,
    slug: String,
    output_dir: PathBuf,
    vars: Variables,
    /// Variables set by the caller; these win over template exports and metadata
    explicit: Variables,
    output: String,
    url: OnceCell<String>,
    filename: OnceCell<PathBuf>,
}

impl Page {
    /// Create an unrendered page for a template.
    pub fn new(name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let (date, slug) = parse_date_slug(basename(&name));

        Self {
            name,
            date,
            slug,
            output_dir: output_dir.into(),
            vars: Variables::new(),
            explicit: Variables::new(),
            output: String::new(),
            url: OnceCell::new(),
            filename: OnceCell::new(),
        }
    }

    /// Create and render a page.
    pub fn load(name: impl Into<String>, ctx: &RenderContext<'_>) -> Result<Self, SiteError> {
        let mut page = Self::new(name, ctx.output_dir);
        page.render(ctx, Variables::new())?;
        Ok(page)
    }

    /// Override the permalink.
    ///
    /// Must be called before the permalink is first resolved.
    pub fn with_permalink(mut self, permalink: impl Into<String>) -> Self {
        let value = Value::from(permalink.into());
        self.explicit.insert("permalink".to_string(), value.clone());
        self.vars.insert("permalink".to_string(), value);
        self
    }

    /// Render the page, merging `more` into its variables.
    ///
    /// Variables passed here persist across renders and take precedence over
    /// whatever the template exports or the Markdown metadata declares.
    pub fn render(&mut self, ctx: &RenderContext<'_>, more: Variables) -> Result<(), SiteError> {
        self.explicit.extend(more);
        self.vars.insert("site".to_string(), ctx.site.clone());
        self.apply_explicit();
        self.refresh_view();

        let exports = ctx.renderer.extract_exports(&self.name, &self.vars)?;
        self.vars.extend(exports);
        self.apply_explicit();

        if is_markdown(&self.name) {
            return self.render_markdown(ctx);
        }

        self.publish_url();
        let output = ctx.renderer.render(&self.name, &self.vars)?;
        self.set_output(output);

        Ok(())
    }

    fn render_markdown(&mut self, ctx: &RenderContext<'_>) -> Result<(), SiteError> {
        let body = ctx.renderer.render(&self.name, &self.vars)?;
        let doc = ctx
            .markdown
            .convert(&body)
            .map_err(|e| SiteError::Markdown {
                name: self.name.clone(),
                message: e.to_string(),
            })?;

        let defines_content = doc.metadata.contains_key("content");
        for (key, values) in doc.metadata {
            self.vars.insert(key, collapse(values));
        }
        self.apply_explicit();
        self.vars
            .insert("content".to_string(), Value::from(doc.html.clone()));

        let layout = self
            .vars
            .get("layout")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        self.publish_url();

        if layout.is_empty() {
            self.set_output(doc.html);
            return Ok(());
        }

        if defines_content {
            tracing::warn!(
                "{}: variable \"content\" is not allowed with \"layout\", using the rendered body",
                self.name
            );
        }

        let output = ctx.renderer.render(&layout, &self.vars)?;
        self.set_output(output);

        Ok(())
    }

    /// Template identifier relative to the template root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Date from the file name prefix, `1970-01-01` when absent.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// File name stem without the date prefix.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Rendered content.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// The permalink override, if any.
    pub fn permalink(&self) -> Option<&str> {
        self.vars
            .get("permalink")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Look up a page variable.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Look up a page variable, falling back to `default`.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.vars.get(key).cloned().unwrap_or(default)
    }

    /// Whether the template asked to be expanded into listing pages.
    pub fn is_paginated(&self) -> bool {
        self.vars.get("paginate").is_some_and(Value::is_true)
    }

    /// Resolved permalink, always starting with `/`.
    pub fn url(&self) -> &str {
        self.url
            .get_or_init(|| resolve_permalink(&self.name, self.permalink().unwrap_or_default()))
    }

    /// Path of the generated file under the output directory.
    pub fn output_filename(&self) -> &Path {
        self.filename
            .get_or_init(|| resolve_filename(&self.output_dir, &self.name, self.url()))
    }

    /// Write the rendered output to [`output_filename`](Self::output_filename).
    pub fn save(&self) -> Result<(), SiteError> {
        assets::write_file(self.output_filename(), self.output.as_bytes())
    }

    /// The page as seen by templates.
    ///
    /// Contains every page variable except `site`, `page` and `paginator`,
    /// plus `name`, `date`, `slug` and, once resolved, `url`.
    pub fn to_value(&self) -> Value {
        let mut view: Variables = self
            .vars
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "site" | "page" | "paginator"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        view.insert("name".to_string(), Value::from(self.name.clone()));
        view.insert(
            "date".to_string(),
            Value::from(self.date.format(DATE_FORMAT).to_string()),
        );
        view.insert("slug".to_string(), Value::from(self.slug.clone()));
        if let Some(url) = self.url.get() {
            view.insert("url".to_string(), Value::from(url.clone()));
        }

        Value::from_serialize(&view)
    }

    fn apply_explicit(&mut self) {
        for (key, value) in &self.explicit {
            self.vars.insert(key.clone(), value.clone());
        }
    }

    fn refresh_view(&mut self) {
        let view = self.to_value();
        self.vars.insert("page".to_string(), view);
    }

    fn publish_url(&mut self) {
        let url = self.url().to_string();
        self.vars.insert("url".to_string(), Value::from(url));
        self.refresh_view();
    }

    fn set_output(&mut self, output: String) {
        self.vars
            .insert("output".to_string(), Value::from(output.clone()));
        self.output = output;
    }
}

/// Split a file name into its date prefix and slug.
///
/// `2019-01-01-hello.md` yields `(2019-01-01, "hello")`; names without a
/// valid date prefix yield the epoch and the whole stem.
pub fn parse_date_slug(basename: &str) -> (NaiveDate, String) {
    // NaiveDate's default is the epoch
    let epoch = NaiveDate::default();
    let stem = basename.split('.').next().unwrap_or_default();

    let Some(caps) = DATE_SLUG.captures(stem) else {
        return (epoch, stem.to_string());
    };
    let slug = caps.get(2).map_or(stem, |m| m.as_str());

    match caps.get(1) {
        None => (epoch, slug.to_string()),
        Some(prefix) => match NaiveDate::parse_from_str(prefix.as_str(), DATE_FORMAT) {
            Ok(date) => (date, slug.to_string()),
            Err(_) => {
                tracing::debug!("ignoring invalid date prefix in {}", basename);
                (epoch, stem.to_string())
            }
        },
    }
}

/// Resolve the permalink for a template name and an optional override.
pub fn resolve_permalink(name: &str, permalink: &str) -> String {
    if name == "index.html" {
        return "/".to_string();
    }

    // XML keeps its file name, the override is ignored
    if is_xml(name) {
        return format!("/{name}");
    }

    if permalink.is_empty() {
        return format!("/{}", strip_extension(name));
    }

    if permalink.starts_with('/') {
        return permalink.to_string();
    }

    // Relative to the template's directory
    let mut joined = dirname(name)
        .split('/')
        .chain(permalink.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if permalink.ends_with('/') && !joined.is_empty() {
        joined.push('/');
    }

    format!("/{joined}")
}

/// Resolve the output file for a template name and its permalink.
pub fn resolve_filename(output_dir: &Path, name: &str, url: &str) -> PathBuf {
    if is_xml(name) {
        return output_dir.join(name);
    }

    output_dir.join(url.trim_start_matches('/')).join("index.html")
}

/// Collapse a metadata value: one item becomes a string, anything else stays a list.
fn collapse(mut values: Vec<String>) -> Value {
    if values.len() == 1 {
        Value::from(values.remove(0))
    } else {
        Value::from(values)
    }
}

fn is_markdown(name: &str) -> bool {
    name.ends_with(".md")
}

fn is_xml(name: &str) -> bool {
    name.ends_with(".xml")
}

fn basename(name: &str) -> &str {
    name.rsplit_once('/').map_or(name, |(_, base)| base)
}

/// Directory part of a template name, empty at the root.
pub(crate) fn dirname(name: &str) -> &str {
    name.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn strip_extension(name: &str) -> &str {
    let base = basename(name);
    match base.rfind('.') {
        Some(pos) => &name[..name.len() - base.len() + pos],
        None => name,
    }
}
