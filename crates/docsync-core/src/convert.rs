//! Raw fetched content → normalized Markdown.

use crate::error::ConversionError;
use crate::frontmatter::{split_frontmatter, FrontmatterExtractor, MetadataExtractor};
use crate::types::SourceFormat;
use regex::Regex;
use std::sync::OnceLock;

/// Line width handed to the HTML renderer.
const RENDER_WIDTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    pub markdown: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

pub trait Converter {
    fn convert(&self, raw: &[u8], identifier: &str) -> Result<Converted, ConversionError>;
}

pub fn converter_for(format: SourceFormat) -> &'static dyn Converter {
    match format {
        SourceFormat::Html => &HtmlConverter,
        SourceFormat::Markdown => &MarkdownConverter,
    }
}

fn decode_text<'a>(raw: &'a [u8], identifier: &str) -> Result<&'a str, ConversionError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| ConversionError::new(identifier, format!("content is not UTF-8: {e}")))?;
    if text.trim().is_empty() {
        return Err(ConversionError::new(identifier, "content is empty"));
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// HtmlConverter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlConverter;

impl Converter for HtmlConverter {
    fn convert(&self, raw: &[u8], identifier: &str) -> Result<Converted, ConversionError> {
        let html = decode_text(raw, identifier)?;
        let rendered = html2text::from_read(html.as_bytes(), RENDER_WIDTH)
            .map_err(|e| ConversionError::new(identifier, format!("html rendering failed: {e}")))?;
        let markdown = normalize_blank_lines(&rendered);
        if markdown.trim().is_empty() {
            return Err(ConversionError::new(identifier, "document has no text content"));
        }
        Ok(Converted {
            markdown,
            title: html_title(html),
            description: html_description(html),
        })
    }
}

static TITLE_RE: OnceLock<Regex> = OnceLock::new();
static H1_RE: OnceLock<Regex> = OnceLock::new();
static META_RE: OnceLock<Regex> = OnceLock::new();
static META_NAME_RE: OnceLock<Regex> = OnceLock::new();
static META_CONTENT_RE: OnceLock<Regex> = OnceLock::new();
static TAG_RE: OnceLock<Regex> = OnceLock::new();

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex is valid"))
}

fn html_title(html: &str) -> Option<String> {
    let from = |r: &Regex| {
        r.captures(html)
            .and_then(|c| c.get(1))
            .map(|m| clean_inline(m.as_str()))
            .filter(|s| !s.is_empty())
    };
    from(re(&TITLE_RE, r"(?is)<title[^>]*>(.*?)</title>"))
        .or_else(|| from(re(&H1_RE, r"(?is)<h1[^>]*>(.*?)</h1>")))
}

fn html_description(html: &str) -> Option<String> {
    let name_re = re(&META_NAME_RE, r#"(?i)\bname\s*=\s*["']description["']"#);
    let content_re = re(&META_CONTENT_RE, r#"(?is)\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)')"#);
    re(&META_RE, r"(?is)<meta\s[^>]*>")
        .find_iter(html)
        .map(|m| m.as_str())
        .filter(|tag| name_re.is_match(tag))
        .find_map(|tag| {
            let caps = content_re.captures(tag)?;
            let value = caps.get(1).or_else(|| caps.get(2))?;
            Some(clean_inline(value.as_str())).filter(|s| !s.is_empty())
        })
}

/// Strip tags, decode the common entities and collapse whitespace.
fn clean_inline(fragment: &str) -> String {
    let no_tags = re(&TAG_RE, r"<[^>]+>").replace_all(fragment, " ");
    let decoded = no_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim trailing spaces and collapse runs of blank lines to one.
fn normalize_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

// ---------------------------------------------------------------------------
// MarkdownConverter
// ---------------------------------------------------------------------------

/// Passthrough for sources that already serve Markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownConverter;

impl Converter for MarkdownConverter {
    fn convert(&self, raw: &[u8], identifier: &str) -> Result<Converted, ConversionError> {
        let text = decode_text(raw, identifier)?;
        let meta = FrontmatterExtractor::new(["title", "description"]).extract(text);
        let (_, body) = split_frontmatter(text);
        let heading = body
            .lines()
            .find_map(|l| l.strip_prefix("# "))
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        let mut markdown = text.to_string();
        if !markdown.ends_with('\n') {
            markdown.push('\n');
        }
        Ok(Converted {
            markdown,
            title: meta.get("title").cloned().or(heading),
            description: meta.get("description").cloned(),
        })
    }
}
