//! Template-driven static site generation.
//!
//! Every template under the template directory becomes one page of the
//! generated site. Templates in the posts directory become blog posts,
//! collected newest first into `site.posts`; a template that exports
//! `paginate = true` is expanded into numbered listing pages over them.

pub mod assets;
pub mod builder;
pub mod error;
pub mod filters;
pub mod page;
pub mod paginator;
pub mod templates;

pub use builder::{default_site, BuildConfig, BuildResult, SiteBuilder, SiteVariables};
pub use error::SiteError;
pub use page::{Page, RenderContext};
pub use paginator::{Pager, Paginator, PaginatorSettings};
pub use templates::{MiniJinjaRenderer, TemplateRenderer, Variables};

pub use minijinja::Value;
