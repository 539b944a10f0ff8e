//! Markdown document conversion.

use pulldown_cmark::{html, Options, Parser};

use crate::frontmatter::{extract_frontmatter, FrontmatterError, Metadata};

/// A converted Markdown document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Rendered HTML body (without the metadata header)
    pub html: String,

    /// Header metadata, every value as a sequence of strings
    pub metadata: Metadata,
}

/// Errors that can occur when converting Markdown.
#[derive(Debug, thiserror::Error)]
pub enum MarkdownError {
    #[error("Front matter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

/// Converts Markdown text to HTML and extracts its metadata header.
pub trait MarkdownConverter {
    fn convert(&self, source: &str) -> Result<Document, MarkdownError>;
}

/// CommonMark converter backed by pulldown-cmark.
#[derive(Debug, Clone)]
pub struct CommonMark {
    options: Options,
}

impl CommonMark {
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS,
        }
    }
}

impl Default for CommonMark {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownConverter for CommonMark {
    fn convert(&self, source: &str) -> Result<Document, MarkdownError> {
        let (metadata, content) = extract_frontmatter(source)?;

        let parser = Parser::new_ext(content, self.options);

        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);

        Ok(Document {
            html: html_output,
            metadata,
        })
    }
}

/// Convert a Markdown document with the default options.
pub fn convert(source: &str) -> Result<Document, MarkdownError> {
    CommonMark::new().convert(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn converts_document_with_metadata() {
        let source = r#"title: Hello World
layout: layout/post.html

# Hello

Some *emphasis*.
"#;

        let doc = convert(source).unwrap();

        assert_eq!(doc.metadata["title"], vec!["Hello World".to_string()]);
        assert_eq!(doc.metadata["layout"], vec!["layout/post.html".to_string()]);
        assert!(doc.html.contains("<h1>Hello</h1>"));
        assert!(doc.html.contains("<em>emphasis</em>"));
        assert!(!doc.html.contains("title:"));
    }

    #[test]
    fn converts_without_metadata() {
        let doc = convert("Plain paragraph.").unwrap();

        assert!(doc.metadata.is_empty());
        assert_eq!(doc.html, "<p>Plain paragraph.</p>\n");
    }

    #[test]
    fn keeps_fenced_code_language() {
        let source = "```rust\nfn main() {}\n```\n";

        let doc = convert(source).unwrap();

        assert!(doc.html.contains(r#"<code class="language-rust">"#));
    }

    #[test]
    fn renders_tables() {
        let source = "| a | b |\n|---|---|\n| 1 | 2 |\n";

        let doc = convert(source).unwrap();

        assert!(doc.html.contains("<table>"));
    }

    #[test]
    fn propagates_frontmatter_errors() {
        let result = convert("---\ntitle: [x\n---\n");

        assert!(matches!(
            result,
            Err(MarkdownError::Frontmatter(FrontmatterError::InvalidYaml(_)))
        ));
    }

    #[test]
    fn leading_rule_is_plain_markdown() {
        let doc = convert("---\n\nText\n").unwrap();

        assert!(doc.metadata.is_empty());
        assert_eq!(doc.html, "<hr />\n<p>Text</p>\n");
    }
}
