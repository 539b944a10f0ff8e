//! Static site builder.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use gazette_markdown::{CommonMark, MarkdownConverter};
use minijinja::Value;
use walkdir::WalkDir;

use crate::assets;
use crate::error::SiteError;
use crate::page::{dirname, Page, RenderContext};
use crate::paginator::{sort_by_date, Paginator, PaginatorSettings};
use crate::templates::{MiniJinjaRenderer, TemplateRenderer, Variables};

/// Extensions of files treated as templates.
pub const TEMPLATE_EXTENSIONS: &[&str] = &["html", "xml", "md"];

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Template root
    pub template_dir: PathBuf,

    /// Output directory, purged on every build
    pub output_dir: PathBuf,

    /// Static assets copied verbatim into the output directory
    pub static_dir: PathBuf,

    /// Post discovery and pagination settings
    pub paginator: PaginatorSettings,

    /// Free-form site variables, exposed to templates as `site`
    pub site: Variables,

    /// Exposed to templates as `site.debug`
    pub debug: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("app"),
            output_dir: PathBuf::from("html"),
            static_dir: PathBuf::from("static"),
            paginator: PaginatorSettings::default(),
            site: default_site(),
            debug: false,
        }
    }
}

/// Default `site` variables.
pub fn default_site() -> Variables {
    Variables::from([
        ("domain".to_string(), Value::from("http://site.com")),
        ("base_url".to_string(), Value::from("")),
    ])
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of posts generated
    pub posts: usize,

    /// Number of other pages generated, listing pages included
    pub pages: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// The `site` variable.
///
/// Built once from configuration; the only later change is publishing the
/// post collection, which must happen before any listing page is built.
#[derive(Debug, Clone)]
pub struct SiteVariables {
    vars: Variables,
}

impl SiteVariables {
    pub fn new(mut vars: Variables, debug: bool) -> Self {
        vars.insert("debug".to_string(), Value::from(debug));
        vars.insert("posts".to_string(), Value::from(Vec::<Value>::new()));
        Self { vars }
    }

    /// Expose `posts` to templates as `site.posts`, in the given order.
    pub fn publish_posts(&mut self, posts: &[Page]) {
        let views: Vec<Value> = posts.iter().map(Page::to_value).collect();
        self.vars.insert("posts".to_string(), Value::from(views));
    }

    pub fn to_value(&self) -> Value {
        Value::from_serialize(&self.vars)
    }
}

/// Static site builder.
pub struct SiteBuilder {
    config: BuildConfig,
    renderer: Box<dyn TemplateRenderer>,
    markdown: Box<dyn MarkdownConverter>,
}

impl SiteBuilder {
    /// Create a builder loading templates from `config.template_dir`.
    pub fn new(config: BuildConfig) -> Self {
        let renderer = MiniJinjaRenderer::new(&config.template_dir);

        Self {
            config,
            renderer: Box::new(renderer),
            markdown: Box::new(CommonMark::new()),
        }
    }

    /// Replace the template renderer.
    pub fn with_renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Replace the Markdown converter.
    pub fn with_markdown(mut self, markdown: impl MarkdownConverter + 'static) -> Self {
        self.markdown = Box::new(markdown);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the site.
    pub fn build(&self) -> Result<BuildResult, SiteError> {
        let start = Instant::now();
        let settings = &self.config.paginator;

        settings.validate()?;

        assets::purge_and_recreate(&self.config.output_dir, &self.config.static_dir)?;

        let (post_names, page_names): (Vec<String>, Vec<String>) =
            discover_templates(&self.config.template_dir)?
                .into_iter()
                .partition(|name| dirname(name) == settings.posts_path);

        tracing::debug!(
            "Found {} posts and {} pages",
            post_names.len(),
            page_names.len()
        );

        let mut site = SiteVariables::new(self.config.site.clone(), self.config.debug);

        let mut posts = {
            let ctx = self.context(&site);
            post_names
                .iter()
                .map(|name| Page::load(name.as_str(), &ctx))
                .collect::<Result<Vec<_>, _>>()?
        };
        sort_by_date(&mut posts);
        site.publish_posts(&posts);

        let ctx = self.context(&site);
        let mut pages = Vec::new();

        for name in &page_names {
            let page = Page::load(name.as_str(), &ctx)?;

            if page.is_paginated() {
                let paginator = Paginator::new(&page, &posts, settings, &ctx)?;
                tracing::info!(
                    "Paginated {} into {} pages",
                    paginator.template(),
                    paginator.page_count()
                );
                pages.extend(paginator.into_pages());
            } else {
                pages.push(page);
            }
        }

        check_collisions(posts.iter().chain(&pages))?;

        for page in posts.iter().chain(&pages) {
            tracing::info!(
                "{} -> {} ({})",
                page.name(),
                page.url(),
                page.output_filename().display()
            );
            page.save()?;
        }

        Ok(BuildResult {
            posts: posts.len(),
            pages: pages.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    fn context(&self, site: &SiteVariables) -> RenderContext<'_> {
        RenderContext {
            renderer: self.renderer.as_ref(),
            markdown: self.markdown.as_ref(),
            site: site.to_value(),
            output_dir: &self.config.output_dir,
        }
    }
}

/// List template names under `root`, relative and `/`-separated, sorted.
pub fn discover_templates(root: &Path) -> Result<Vec<String>, SiteError> {
    if !root.is_dir() {
        return Err(SiteError::io(
            root,
            io::Error::new(io::ErrorKind::NotFound, "template directory not found"),
        ));
    }

    let mut names = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            SiteError::io(path, e.into())
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !TEMPLATE_EXTENSIONS.contains(&ext) {
            continue;
        }

        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };

        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        names.push(name);
    }

    names.sort();

    Ok(names)
}

/// Fail if two pages would be written to the same file.
fn check_collisions<'a>(pages: impl IntoIterator<Item = &'a Page>) -> Result<(), SiteError> {
    let mut seen: HashMap<&Path, &str> = HashMap::new();

    for page in pages {
        if let Some(first) = seen.insert(page.output_filename(), page.name()) {
            return Err(SiteError::PermalinkCollision {
                path: page.output_filename().to_path_buf(),
                first: first.to_string(),
                second: page.name().to_string(),
            });
        }
    }

    Ok(())
}
