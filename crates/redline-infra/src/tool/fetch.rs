//! `fetch_article`: download a page and keep only its readable text.
//!
//! Extraction is regex based: page chrome (scripts, styles, navigation,
//! headers, footers, asides) is removed, then headings and paragraphs are
//! collected in document order. A paragraph ends at its closing tag or at the
//! next block-level tag, so pages that omit `</p>` still yield text. Named
//! entities are resolved against the HTML5 table.

use std::time::Duration;

use quick_xml::escape::resolve_html5_entity;
use redline_core::tool::{Tool, required_str};
use redline_types::config::FetchConfig;
use redline_types::error::ToolError;
use regex::{Captures, Regex};
use serde_json::{Map, Value, json};

pub const FETCH_ARTICLE: &str = "fetch_article";

const CHROME_TAGS: [&str; 6] = ["script", "style", "nav", "footer", "aside", "header"];

/// Tags that open or close a block. Any of them ends an open paragraph.
const BLOCK_TAGS: &str = "h[1-6]|p|div|article|section|main|body|html|li|ul|ol|dl|dt|dd|\
                          blockquote|table|tr|td|th|figure|figcaption|pre|form|hr|\
                          address|details|fieldset|hgroup|menu";

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Compiled patterns for turning HTML into article text.
pub struct ArticleExtractor {
    comments: Regex,
    chrome: Vec<Regex>,
    boundaries: Regex,
    tags: Regex,
    entity: Regex,
    whitespace: Regex,
}

impl ArticleExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        let chrome = CHROME_TAGS
            .iter()
            .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            comments: Regex::new(r"(?s)<!--.*?-->")?,
            chrome,
            boundaries: Regex::new(&format!(r"(?i)<(/?)({BLOCK_TAGS})\b[^>]*>"))?,
            tags: Regex::new(r"(?s)<[^>]*>")?,
            entity: Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[A-Za-z][A-Za-z0-9]*);")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Headings become `## text` lines; paragraphs are kept as-is. Empty
    /// blocks are dropped.
    pub fn extract(&self, html: &str) -> String {
        let mut cleaned = self.comments.replace_all(html, "").into_owned();
        for pattern in &self.chrome {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }

        let mut lines = Vec::new();
        // (is_heading, offset where the block's content starts)
        let mut open: Option<(bool, usize)> = None;
        for tag in self.boundaries.captures_iter(&cleaned) {
            let Some(whole) = tag.get(0) else { continue };
            if let Some((heading, start)) = open.take() {
                self.push_block(&mut lines, heading, &cleaned[start..whole.start()]);
            }

            let closing = !tag[1].is_empty();
            let name = tag[2].to_ascii_lowercase();
            let heading = matches!(name.as_bytes(), [b'h', b'1'..=b'6']);
            if !closing && (heading || name == "p") {
                open = Some((heading, whole.end()));
            }
        }
        if let Some((heading, start)) = open {
            self.push_block(&mut lines, heading, &cleaned[start..]);
        }
        lines.join("\n")
    }

    fn push_block(&self, lines: &mut Vec<String>, heading: bool, fragment: &str) {
        let text = self.inner_text(fragment);
        if text.is_empty() {
            return;
        }
        if heading {
            lines.push(format!("## {text}"));
        } else {
            lines.push(text);
        }
    }

    fn inner_text(&self, fragment: &str) -> String {
        let stripped = self.tags.replace_all(fragment, " ");
        let decoded = self.decode_entities(&stripped);
        self.whitespace.replace_all(&decoded, " ").trim().to_string()
    }

    /// Unknown or invalid entities are left as written.
    fn decode_entities(&self, text: &str) -> String {
        self.entity
            .replace_all(text, |caps: &Captures| {
                let name = &caps[1];
                let decoded = match name.strip_prefix('#') {
                    Some(code) => {
                        let value = match code.strip_prefix(['x', 'X']) {
                            Some(hex) => u32::from_str_radix(hex, 16).ok(),
                            None => code.parse::<u32>().ok(),
                        };
                        value.and_then(char::from_u32).map(String::from)
                    }
                    None => resolve_html5_entity(name).map(str::to_string),
                };
                decoded.unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Cut `text` to at most `max_chars` characters.
fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Tool
// ---------------------------------------------------------------------------

pub struct FetchArticleTool {
    client: reqwest::Client,
    extractor: ArticleExtractor,
    max_chars: usize,
}

impl FetchArticleTool {
    pub fn new(config: &FetchConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("redline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::Execution(format!("failed to create HTTP client: {e}")))?;
        let extractor = ArticleExtractor::new()
            .map_err(|e| ToolError::Execution(format!("invalid extraction pattern: {e}")))?;

        Ok(Self {
            client,
            extractor,
            max_chars: config.max_chars,
        })
    }

    /// Build the tool's JSON result for an already downloaded page.
    fn render(&self, url: &str, html: &str) -> String {
        let text = truncate_chars(self.extractor.extract(html), self.max_chars);
        json!({ "article_text": text, "url": url }).to_string()
    }
}

impl Tool for FetchArticleTool {
    fn name(&self) -> &str {
        FETCH_ARTICLE
    }

    fn description(&self) -> &str {
        "Download a web article and return its readable text (headings and paragraphs) as JSON with the source URL."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Absolute http(s) URL of the article"
                }
            },
            "required": ["url"],
            "additionalProperties": false
        })
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<String, ToolError> {
        let url = required_str(arguments, "url")?.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ToolError::InvalidArguments(format!(
                "'url' must start with http:// or https://, got '{url}'"
            )));
        }

        tracing::debug!(url, "fetching article");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Execution(format!("{url} returned HTTP {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ToolError::Execution(format!("failed to read body of {url}: {e}")))?;

        Ok(self.render(url, &html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html>
<head><title>ignored</title><style>p { color: red; }</style></head>
<body>
  <header><p>Site banner</p></header>
  <nav><a href="/">Home</a><p>Menu</p></nav>
  <!-- <p>commented out</p> -->
  <article>
    <h1 class="title">Council &amp; mayor agree budget</h1>
    <p>The council voted <strong>7&ndash;2</strong> on Tuesday.</p>
    <p>   </p>
    <h2>What&#39;s next</h2>
    <p>Spending rises by &#x32;0%.</p>
  </article>
  <aside><p>Related stories</p></aside>
  <script>var p = "<p>not text</p>";</script>
  <footer><p>Copyright</p></footer>
</body>
</html>"#;

    fn tool(max_chars: usize) -> FetchArticleTool {
        FetchArticleTool::new(&FetchConfig {
            timeout_secs: 1,
            max_chars,
        })
        .unwrap()
    }

    #[test]
    fn test_extract_keeps_headings_and_paragraphs_in_order() {
        let text = ArticleExtractor::new().unwrap().extract(PAGE);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "## Council & mayor agree budget");
        assert_eq!(lines[1], "The council voted 7\u{2013}2 on Tuesday.");
        assert_eq!(lines[2], "## What's next");
        assert_eq!(lines[3], "Spending rises by 20%.");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_extract_handles_unclosed_paragraphs() {
        let extractor = ArticleExtractor::new().unwrap();
        let text = extractor.extract("<body><p>First paragraph<p>Second paragraph<p>Third</body>");
        assert_eq!(text, "First paragraph\nSecond paragraph\nThird");

        let text = extractor.extract("<h2>Heading<p>Body text<div>sidebar</div><p>Last");
        assert_eq!(text, "## Heading\nBody text\nLast");
    }

    #[test]
    fn test_extract_decodes_named_entities() {
        let text = ArticleExtractor::new()
            .unwrap()
            .extract("<p>The council voted 7&ndash;2 &mdash; a &ldquo;win&rdquo;&hellip; caf&eacute;&nbsp;&amp; &bogus; &#38;lt;</p>");
        assert_eq!(
            text,
            "The council voted 7\u{2013}2 \u{2014} a \u{201c}win\u{201d}\u{2026} caf\u{e9} & &bogus; &lt;"
        );
    }

    #[test]
    fn test_extract_keeps_preformatted_blocks_apart() {
        let text = ArticleExtractor::new()
            .unwrap()
            .extract("<p>Intro<pre>code</pre><p>Outro</p>");
        assert_eq!(text, "Intro\nOutro");
    }

    #[test]
    fn test_extract_drops_page_chrome() {
        let text = ArticleExtractor::new().unwrap().extract(PAGE);
        for noise in ["Site banner", "Menu", "Related stories", "not text", "Copyright", "commented out"] {
            assert!(!text.contains(noise), "{noise} leaked into {text}");
        }
    }

    #[test]
    fn test_render_truncates_and_keeps_url() {
        let rendered = tool(10).render("https://news.example/budget", PAGE);
        let value: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["url"], "https://news.example/budget");
        assert_eq!(value["article_text"].as_str().unwrap().chars().count(), 10);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld".to_string(), 4), "héll");
        assert_eq!(truncate_chars("short".to_string(), 100), "short");
    }

    #[tokio::test]
    async fn test_call_validates_url() {
        let tool = tool(100);
        let args = json!({"url": "ftp://example.com/file"});
        assert!(matches!(
            tool.call(args.as_object().unwrap()).await,
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            tool.call(&Map::new()).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }
}
