//! Web-article extractor (§4.3): prioritised CSS-selector extraction from a full HTML
//! page. Built on the same `scraper` DOM as the HTML cleaner, but where the page's
//! own `article_scraper`/`html-to-markdown-rs` do single-shot readability extraction,
//! this component needs an explicit selector *priority list* — so it is grounded in
//! `dropbox-dTOOL/dashflow`'s selector-priority scraping pattern instead.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::html_cleaner::{clean_html, CleanOptions};

const CONTENT_SELECTORS: &[&str] = &[
    "article .entry-content",
    "article .post-content",
    ".article-body",
    ".article-content",
    ".story-body",
    ".post-body",
    "[itemprop=\"articleBody\"]",
    "article",
    ".entry-content",
    ".post-content",
    "main",
    ".content",
    "#content",
];

const MIN_SELECTOR_CONTENT_LEN: usize = 100;
const MAX_CONTENT_CHARS: usize = 50_000;
const FALLBACK_PARAGRAPH_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct ExtractedArticle {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub word_count: usize,
    pub reading_time_minutes: u32,
}

/// §4.3. `url` anchors relative image resolution.
pub fn extract_article(html: &str, url: &str) -> ExtractedArticle {
    let document = Html::parse_document(html);
    let origin = Url::parse(url).ok();

    let title = extract_title(&document);
    let content = extract_content(html, &document);
    let image_url = extract_image(&document, origin.as_ref());
    let author = extract_author(&document);

    let word_count = content.split_whitespace().count();
    let reading_time_minutes = ((word_count as f64 / 200.0).round() as u32).max(1);

    ExtractedArticle {
        title,
        content,
        image_url,
        author,
        word_count,
        reading_time_minutes,
    }
}

fn extract_title(document: &Html) -> String {
    if let Some(og) = meta_content(document, r#"meta[property="og:title"]"#) {
        return og;
    }
    if let Ok(selector) = Selector::parse("title") {
        if let Some(el) = document.select(&selector).next() {
            let raw = el.text().collect::<String>();
            return strip_title_suffix(raw.trim());
        }
    }
    if let Ok(selector) = Selector::parse("h1") {
        if let Some(el) = document.select(&selector).next() {
            return el.text().collect::<String>().trim().to_string();
        }
    }
    String::new()
}

fn strip_title_suffix(title: &str) -> String {
    for sep in [" | ", " - ", " – ", " — ", " :: "] {
        if let Some(idx) = title.rfind(sep) {
            return title[..idx].trim().to_string();
        }
    }
    title.trim().to_string()
}

fn extract_content(raw_html: &str, document: &Html) -> String {
    for selector_str in CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(el) = document.select(&selector).next() {
                let cleaned = clean_html(
                    &el.html(),
                    &CleanOptions {
                        minimum_input_length: 0,
                        ..CleanOptions::default()
                    },
                );
                if cleaned.cleaned_content.len() > MIN_SELECTOR_CONTENT_LEN {
                    return truncate(&cleaned.cleaned_content);
                }
            }
        }
    }

    // Fallback: concatenate the first 50 <p> elements across the whole document.
    if let Ok(selector) = Selector::parse("p") {
        let text = document
            .select(&selector)
            .take(FALLBACK_PARAGRAPH_LIMIT)
            .map(|el| el.text().collect::<String>())
            .collect::<Vec<_>>()
            .join(" ");
        if !text.trim().is_empty() {
            return truncate(text.trim());
        }
    }

    let cleaned = clean_html(raw_html, &CleanOptions { minimum_input_length: 0, ..CleanOptions::default() });
    truncate(&cleaned.cleaned_content)
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_CONTENT_CHARS).collect()
}

fn extract_image(document: &Html, origin: Option<&Url>) -> Option<String> {
    if let Some(url) = meta_content(document, r#"meta[property="og:image"]"#) {
        return resolve(&url, origin);
    }
    if let Some(url) = meta_content(document, r#"meta[name="twitter:image"]"#) {
        return resolve(&url, origin);
    }
    if let Ok(selector) = Selector::parse(".featured-image img") {
        if let Some(el) = document.select(&selector).next() {
            if let Some(src) = el.value().attr("src") {
                if let Some(resolved) = resolve(src, origin) {
                    return Some(resolved);
                }
            }
        }
    }
    for selector_str in ["article img", ".wp-post-image", ".post-thumbnail img"] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(el) = document.select(&selector).next() {
                if let Some(src) = el.value().attr("src") {
                    if let Some(resolved) = resolve(src, origin) {
                        return Some(resolved);
                    }
                }
            }
        }
    }
    None
}

fn resolve(candidate: &str, origin: Option<&Url>) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.to_lowercase().starts_with("data:") {
        return None;
    }
    if let Some(rest) = candidate.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return Some(candidate.to_string());
    }
    let origin = origin?;
    origin.join(candidate).ok().map(|u| u.to_string())
}

fn extract_author(document: &Html) -> Option<String> {
    if let Some(name) = meta_content(document, r#"meta[name="author"]"#) {
        return Some(name);
    }
    if let Some(name) = meta_content(document, r#"meta[property="article:author"]"#) {
        return Some(name);
    }
    if let Ok(selector) = Selector::parse(r#"[itemprop="author"]"#) {
        if let Some(el) = document.select(&selector).next() {
            let text = el.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    for selector_str in [".byline", ".author", ".article-author"] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(el) = document.select(&selector).next() {
                let text = el.text().collect::<String>();
                let stripped = strip_byline_prefix(text.trim());
                if !stripped.is_empty() {
                    return Some(stripped);
                }
            }
        }
    }
    None
}

fn strip_byline_prefix(text: &str) -> String {
    for prefix in ["By ", "by ", "Written by ", "written by ", "Author: ", "Author:", "author:"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }
    text.to_string()
}

fn meta_content(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    let el: ElementRef = document.select(&selector).next()?;
    el.value()
        .attr("content")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_og_title_and_image() {
        let html = r#"<html><head>
            <title>Fallback Title</title>
            <meta property="og:title" content="Real Title | MySite">
            <meta property="og:image" content="/img/a.jpg">
        </head><body><article><div class="entry-content">
            <p>A sufficiently long paragraph of article body content that exceeds one hundred characters easily in total length here.</p>
        </div></article></body></html>"#;
        let extracted = extract_article(html, "https://example.com/news/story");
        assert_eq!(extracted.title, "Real Title | MySite");
        assert_eq!(extracted.image_url.as_deref(), Some("https://example.com/img/a.jpg"));
        assert!(extracted.word_count > 0);
    }

    #[test]
    fn falls_back_to_paragraphs_when_no_selector_matches() {
        let mut html = String::from("<html><body>");
        for i in 0..5 {
            html.push_str(&format!("<p>Paragraph number {i} with some words in it.</p>"));
        }
        html.push_str("</body></html>");
        let extracted = extract_article(&html, "https://example.com/a");
        assert!(extracted.content.contains("Paragraph number 0"));
    }

    #[test]
    fn strips_title_separator_suffix() {
        assert_eq!(strip_title_suffix("Headline Here | The Herald"), "Headline Here");
        assert_eq!(strip_title_suffix("Headline Here - The Herald"), "Headline Here");
    }

    #[test]
    fn reading_time_is_at_least_one_minute() {
        let html = r#"<html><body><article><div class="entry-content"><p>Short but valid content block that passes the one hundred character minimum threshold easily now.</p></div></article></body></html>"#;
        let extracted = extract_article(html, "https://example.com/a");
        assert!(extracted.reading_time_minutes >= 1);
    }
}
