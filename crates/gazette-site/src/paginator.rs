//! Pagination of listing pages over the post collection.
//!
//! A listing template (one that exports `paginate = true`) is expanded into
//! one page per `items_per_page` posts. The first page keeps the template's
//! natural permalink (`/news`), later pages use the configured pattern with
//! `:num` replaced by the page number (`/news/2/`).

use std::borrow::Borrow;

use minijinja::Value;
use serde::{Deserialize, Serialize};

use crate::error::SiteError;
use crate::page::{Page, RenderContext};
use crate::templates::Variables;

/// Placeholder in the permalink pattern replaced by the page number.
pub const NUM_PLACEHOLDER: &str = ":num";

/// Settings controlling post discovery and pagination.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PaginatorSettings {
    /// Template directory holding posts
    pub posts_path: String,

    /// Permalink pattern for listing pages after the first
    pub permalink: String,

    /// Posts per listing page
    pub items_per_page: usize,
}

impl Default for PaginatorSettings {
    fn default() -> Self {
        Self {
            posts_path: "posts".to_string(),
            permalink: "/news/:num/".to_string(),
            items_per_page: 10,
        }
    }
}

impl PaginatorSettings {
    /// Reject settings that would produce duplicate or undefined pages.
    pub fn validate(&self) -> Result<(), SiteError> {
        if !self.permalink.contains(NUM_PLACEHOLDER) {
            return Err(SiteError::InvalidPermalinkPattern(self.permalink.clone()));
        }

        if self.items_per_page == 0 {
            return Err(SiteError::InvalidItemsPerPage);
        }

        Ok(())
    }

    /// Permalink of listing page `number`.
    pub fn permalink_for(&self, number: usize) -> String {
        self.permalink
            .replace(NUM_PLACEHOLDER, &number.to_string())
    }
}

/// Navigation state of one listing page, exposed to templates as `paginator`.
#[derive(Debug, Clone, Serialize)]
pub struct Pager {
    /// 1-based page number
    pub page: usize,

    /// Total number of listing pages
    pub page_count: usize,

    /// Posts shown on this page
    pub posts: Vec<Value>,

    /// Permalink of the previous page, empty on the first
    pub prev_permalink: String,

    /// Permalink of the next page, empty on the last
    pub next_permalink: String,
}

impl Pager {
    pub fn to_value(&self) -> Value {
        Value::from_serialize(self)
    }
}

/// Listing pages generated from one template.
#[derive(Debug)]
pub struct Paginator {
    template: String,
    pagers: Vec<Pager>,
    pages: Vec<Page>,
}

impl Paginator {
    /// Expand `listing` over `posts`.
    ///
    /// Posts are ordered newest first; posts sharing a date keep their
    /// relative order.
    pub fn new(
        listing: &Page,
        posts: &[Page],
        settings: &PaginatorSettings,
        ctx: &RenderContext<'_>,
    ) -> Result<Self, SiteError> {
        settings.validate()?;

        let mut sorted: Vec<&Page> = posts.iter().collect();
        sort_by_date(&mut sorted);
        let views: Vec<Value> = sorted.iter().map(|post| post.to_value()).collect();

        let per_page = settings.items_per_page;
        let count = page_count(views.len(), per_page);
        let first_permalink = listing.url().to_string();

        let mut pagers = Vec::with_capacity(count);
        let mut pages = Vec::with_capacity(count);

        for number in 1..=count {
            tracing::debug!("{}: page {} of {}", listing.name(), number, count);

            let start = ((number - 1) * per_page).min(views.len());
            let end = (number * per_page).min(views.len());

            let mut page = Page::new(listing.name(), ctx.output_dir);
            if number > 1 {
                page = page.with_permalink(settings.permalink_for(number));
            }

            let prev_permalink = match number {
                1 => String::new(),
                2 => first_permalink.clone(),
                n => settings.permalink_for(n - 1),
            };
            let next_permalink = if number < count {
                settings.permalink_for(number + 1)
            } else {
                String::new()
            };

            let pager = Pager {
                page: number,
                page_count: count,
                posts: views[start..end].to_vec(),
                prev_permalink,
                next_permalink,
            };

            let vars = Variables::from([("paginator".to_string(), pager.to_value())]);
            page.render(ctx, vars)?;

            pagers.push(pager);
            pages.push(page);
        }

        Ok(Self {
            template: listing.name().to_string(),
            pagers,
            pages,
        })
    }

    /// Name of the listing template.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn pagers(&self) -> &[Pager] {
        &self.pagers
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }
}

/// Number of listing pages for `total` posts, never less than one.
pub fn page_count(total: usize, per_page: usize) -> usize {
    total.div_ceil(per_page.max(1)).max(1)
}

/// Stable sort, newest first.
pub fn sort_by_date<P: Borrow<Page>>(posts: &mut [P]) {
    posts.sort_by(|a, b| b.borrow().date().cmp(&a.borrow().date()));
}
