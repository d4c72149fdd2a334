//! Built-in extractor for the supported format set.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex_lite::Regex;
use tokio::fs;
use tracing::debug;

use docdex_store::DocumentType;

use crate::error::{ExtractError, Result};
use crate::{ContentExtractor, Extracted};

const EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "html", "htm", "json", "csv"];

/// Extractor dispatching on the closed [`DocumentType`] enum, keyed by file
/// extension.
#[derive(Debug, Default)]
pub struct BasicExtractor;

impl BasicExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    fn type_for_extension(ext: &str) -> Option<DocumentType> {
        match ext {
            "txt" | "text" => Some(DocumentType::Text),
            "md" | "markdown" => Some(DocumentType::Markdown),
            "html" | "htm" => Some(DocumentType::Html),
            "json" => Some(DocumentType::Json),
            "csv" => Some(DocumentType::Csv),
            _ => None,
        }
    }
}

#[async_trait]
impl ContentExtractor for BasicExtractor {
    fn supported_extensions(&self) -> &[&'static str] {
        EXTENSIONS
    }

    async fn extract(&self, path: &Path) -> Result<Extracted> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let doc_type = Self::type_for_extension(&ext)
            .ok_or_else(|| ExtractError::UnsupportedExtension(ext.clone()))?;

        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| ExtractError::Read(format!("{}: {e}", path.display())))?;

        debug!("Extracting {} as {doc_type}", path.display());

        let extracted = match doc_type {
            DocumentType::Text => Extracted {
                content: raw,
                doc_type,
                metadata: HashMap::new(),
            },
            DocumentType::Markdown => extract_markdown(raw),
            DocumentType::Html => extract_html(raw),
            DocumentType::Json => extract_json(raw),
            DocumentType::Csv => extract_csv(raw),
        };

        Ok(extracted)
    }
}

/// Markdown: YAML frontmatter is lifted into metadata and removed from the
/// body; ATX headings are collected into a `headings` list.
fn extract_markdown(raw: String) -> Extracted {
    let mut metadata = HashMap::new();

    let body = match split_frontmatter(&raw) {
        Some((frontmatter, body)) => {
            metadata.insert(
                "frontmatter".to_string(),
                serde_json::Value::String(frontmatter.to_string()),
            );
            body.to_string()
        }
        None => raw,
    };

    let headings: Vec<serde_json::Value> = body
        .lines()
        .filter(|line| line.starts_with('#'))
        .map(|line| serde_json::Value::String(line.trim_start_matches('#').trim().to_string()))
        .collect();
    if !headings.is_empty() {
        metadata.insert("headings".to_string(), serde_json::Value::Array(headings));
    }

    Extracted {
        content: body,
        doc_type: DocumentType::Markdown,
        metadata,
    }
}

fn split_frontmatter(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("---\n")?;
    let end = rest.find("\n---")?;
    let frontmatter = &rest[..end];
    let body = rest[end + 4..].trim_start_matches('\n');
    Some((frontmatter, body))
}

/// HTML: script/style blocks and tags are stripped, whitespace collapsed,
/// and the `<title>` text captured into metadata.
fn extract_html(raw: String) -> Extracted {
    static TITLE: OnceLock<Regex> = OnceLock::new();
    static BLOCKS: OnceLock<Regex> = OnceLock::new();
    static TAGS: OnceLock<Regex> = OnceLock::new();

    let title_re = TITLE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
    let blocks_re = BLOCKS
        .get_or_init(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());
    let tags_re = TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]+>").unwrap());

    let mut metadata = HashMap::new();
    if let Some(captures) = title_re.captures(&raw) {
        if let Some(title) = captures.get(1) {
            metadata.insert(
                "html_title".to_string(),
                serde_json::Value::String(title.as_str().trim().to_string()),
            );
        }
    }

    let without_blocks = blocks_re.replace_all(&raw, " ");
    let without_tags = tags_re.replace_all(&without_blocks, " ");
    let content = without_tags.split_whitespace().collect::<Vec<_>>().join(" ");

    Extracted {
        content,
        doc_type: DocumentType::Html,
        metadata,
    }
}

/// JSON: kept verbatim; parse validity is recorded rather than enforced, so
/// malformed-but-readable input degrades instead of failing.
fn extract_json(raw: String) -> Extracted {
    let valid = serde_json::from_str::<serde_json::Value>(&raw).is_ok();
    let metadata = HashMap::from([("valid_json".to_string(), serde_json::Value::Bool(valid))]);

    Extracted {
        content: raw,
        doc_type: DocumentType::Json,
        metadata,
    }
}

/// CSV: kept verbatim with row and column counts recorded.
fn extract_csv(raw: String) -> Extracted {
    let rows = raw.lines().filter(|l| !l.trim().is_empty()).count();
    let columns = raw
        .lines()
        .next()
        .map(|l| l.split(',').count())
        .unwrap_or(0);

    let metadata = HashMap::from([
        ("rows".to_string(), serde_json::json!(rows)),
        ("columns".to_string(), serde_json::json!(columns)),
    ]);

    Extracted {
        content: raw,
        doc_type: DocumentType::Csv,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn extract_file(name: &str, content: &str) -> Result<Extracted> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        BasicExtractor::new().extract(&path).await
    }

    #[tokio::test]
    async fn test_plain_text() {
        let extracted = extract_file("a.txt", "plain body").await.unwrap();
        assert_eq!(extracted.content, "plain body");
        assert_eq!(extracted.doc_type, DocumentType::Text);
        assert!(extracted.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected() {
        let result = extract_file("a.exe", "binary").await;
        assert!(matches!(result, Err(ExtractError::UnsupportedExtension(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let result = BasicExtractor::new()
            .extract(Path::new("/nonexistent/file.txt"))
            .await;
        assert!(matches!(result, Err(ExtractError::Read(_))));
    }

    #[tokio::test]
    async fn test_markdown_frontmatter_and_headings() {
        let md = "---\ntitle: Test\n---\n# First\n\nbody text\n\n## Second\n";
        let extracted = extract_file("a.md", md).await.unwrap();

        assert_eq!(extracted.doc_type, DocumentType::Markdown);
        assert!(!extracted.content.contains("title: Test"));
        assert!(extracted.content.contains("body text"));
        assert_eq!(
            extracted.metadata["frontmatter"],
            serde_json::json!("title: Test")
        );
        assert_eq!(
            extracted.metadata["headings"],
            serde_json::json!(["First", "Second"])
        );
    }

    #[tokio::test]
    async fn test_markdown_without_frontmatter() {
        let extracted = extract_file("a.md", "just text\n").await.unwrap();
        assert_eq!(extracted.content, "just text\n");
        assert!(!extracted.metadata.contains_key("frontmatter"));
    }

    #[tokio::test]
    async fn test_html_strips_tags_and_captures_title() {
        let html = "<html><head><title>Page Title</title>\
                    <style>body { color: red; }</style></head>\
                    <body><p>Hello <b>world</b></p>\
                    <script>var x = 1;</script></body></html>";
        let extracted = extract_file("a.html", html).await.unwrap();

        assert_eq!(extracted.doc_type, DocumentType::Html);
        assert!(extracted.content.contains("Hello world"));
        assert!(!extracted.content.contains("color: red"));
        assert!(!extracted.content.contains("var x"));
        assert_eq!(
            extracted.metadata["html_title"],
            serde_json::json!("Page Title")
        );
    }

    #[tokio::test]
    async fn test_json_validity_recorded_not_enforced() {
        let good = extract_file("a.json", r#"{"k": 1}"#).await.unwrap();
        assert_eq!(good.metadata["valid_json"], serde_json::json!(true));

        let bad = extract_file("b.json", "{not json").await.unwrap();
        assert_eq!(bad.metadata["valid_json"], serde_json::json!(false));
        assert_eq!(bad.content, "{not json");
    }

    #[tokio::test]
    async fn test_csv_counts() {
        let extracted = extract_file("a.csv", "a,b,c\n1,2,3\n4,5,6\n").await.unwrap();
        assert_eq!(extracted.metadata["rows"], serde_json::json!(3));
        assert_eq!(extracted.metadata["columns"], serde_json::json!(3));
    }

    #[test]
    fn test_supports_checks_extension() {
        let extractor = BasicExtractor::new();
        assert!(extractor.supports(Path::new("/x/a.md")));
        assert!(extractor.supports(Path::new("/x/a.TXT")));
        assert!(!extractor.supports(Path::new("/x/a.rs")));
        assert!(!extractor.supports(Path::new("/x/noext")));
    }
}
