//! Markdown conversion with front-matter metadata extraction.
//!
//! This crate converts Markdown documents to HTML and pulls the metadata
//! header off the top of the document, normalizing every value to a sequence
//! of strings.

pub mod frontmatter;
pub mod parser;

pub use frontmatter::{extract_frontmatter, FrontmatterError, Metadata};
pub use parser::{convert, CommonMark, Document, MarkdownConverter, MarkdownError};
