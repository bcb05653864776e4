//! HTML cleaner (§4.2): DOM-aware sanitation + image extraction. Uses `scraper`'s
//! CSS-selector DOM, the same crate-level choice as the web-article extractor, rather
//! than regex stripping — grounded in `dropbox-dTOOL/dashflow`'s `scraper`-based page
//! processing, which is the one example in the retrieval pack that walks a DOM tree
//! instead of pattern-matching raw markup.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

const MIN_INPUT_LENGTH: usize = 100;

static AD_CLASS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ad[-_]?|sponsor|promo|sidebar|social[-_]?share|newsletter|popup").unwrap()
});
static REPEATED_CHAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(.)\1{3,}").unwrap());
static WHITESPACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static BACKGROUND_IMAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"background-image\s*:\s*url\((['"]?)([^'")]+)\1\)"#).unwrap());

#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub remove_images: bool,
    pub extract_image_urls: bool,
    pub minimum_input_length: usize,
    pub remove_ad_elements: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        CleanOptions {
            remove_images: false,
            extract_image_urls: true,
            minimum_input_length: MIN_INPUT_LENGTH,
            remove_ad_elements: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CleanResult {
    pub cleaned_content: String,
    pub extracted_images: Vec<String>,
    pub removed_char_count: usize,
}

const STRUCTURAL_TAGS: &[&str] = &["script", "style", "iframe", "nav", "footer", "header", "aside", "noscript"];

/// §4.2. Order: extract images → strip structural/ad nodes → (optional) strip
/// image-bearing nodes → text-extract → collapse whitespace → compress repeats.
pub fn clean_html(html: &str, options: &CleanOptions) -> CleanResult {
    if html.len() < options.minimum_input_length {
        return CleanResult {
            cleaned_content: html.to_string(),
            extracted_images: Vec::new(),
            removed_char_count: 0,
        };
    }

    let document = Html::parse_document(html);
    let extracted_images = if options.extract_image_urls {
        extract_images(&document)
    } else {
        Vec::new()
    };

    let removable = structural_and_ad_selector(options);
    let text = extract_text_excluding(&document, &removable);

    let collapsed = WHITESPACE_PATTERN.replace_all(text.trim(), " ").to_string();
    let compressed = REPEATED_CHAR_PATTERN.replace_all(&collapsed, "$1$1").to_string();

    CleanResult {
        removed_char_count: html.len().saturating_sub(compressed.len()),
        cleaned_content: compressed,
        extracted_images,
    }
}

fn structural_and_ad_selector(options: &CleanOptions) -> Selector {
    let mut parts: Vec<String> = STRUCTURAL_TAGS.iter().map(|t| t.to_string()).collect();
    if options.remove_images {
        parts.extend(["img".to_string(), "figure".to_string(), "picture".to_string(), "figcaption".to_string()]);
    }
    Selector::parse(&parts.join(", ")).unwrap_or_else(|_| Selector::parse("script").unwrap())
}

fn is_ad_element(el: ElementRef) -> bool {
    let value = el.value();
    let class = value.attr("class").unwrap_or("");
    let id = value.attr("id").unwrap_or("");
    AD_CLASS_PATTERN.is_match(class) || AD_CLASS_PATTERN.is_match(id)
}

fn extract_text_excluding(document: &Html, removable: &Selector) -> String {
    let removed_ids: std::collections::HashSet<_> = document
        .select(removable)
        .map(|el| el.id())
        .collect();

    let ad_ids: std::collections::HashSet<_> = document
        .select(&Selector::parse("*").unwrap())
        .filter(|el| is_ad_element(*el))
        .map(|el| el.id())
        .collect();

    let root = document.root_element();
    let mut parts = Vec::new();
    collect_text(root, &removed_ids, &ad_ids, &mut parts);
    parts.join(" ")
}

fn collect_text(
    el: ElementRef,
    removed_ids: &std::collections::HashSet<ego_tree::NodeId>,
    ad_ids: &std::collections::HashSet<ego_tree::NodeId>,
    out: &mut Vec<String>,
) {
    if removed_ids.contains(&el.id()) || ad_ids.contains(&el.id()) {
        return;
    }
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, removed_ids, ad_ids, out);
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
    }
}

/// img[src] → source[srcset] first candidate → inline `background-image: url(...)`.
/// Rejects `data:`, `javascript:`, `blob:`, `vbscript:` schemes.
fn extract_images(document: &Html) -> Vec<String> {
    let mut images = Vec::new();

    if let Ok(selector) = Selector::parse("img[src]") {
        for el in document.select(&selector) {
            if let Some(src) = el.value().attr("src") {
                push_if_safe(&mut images, src);
            }
        }
    }

    if let Ok(selector) = Selector::parse("source[srcset]") {
        for el in document.select(&selector) {
            if let Some(srcset) = el.value().attr("srcset") {
                if let Some(first) = srcset.split(',').next() {
                    let candidate = first.trim().split_whitespace().next().unwrap_or("");
                    push_if_safe(&mut images, candidate);
                }
            }
        }
    }

    if let Ok(selector) = Selector::parse("*[style]") {
        for el in document.select(&selector) {
            if let Some(style) = el.value().attr("style") {
                if let Some(caps) = BACKGROUND_IMAGE_PATTERN.captures(style) {
                    push_if_safe(&mut images, &caps[2]);
                }
            }
        }
    }

    images
}

fn push_if_safe(images: &mut Vec<String>, url: &str) {
    let url = url.trim();
    if url.is_empty() {
        return;
    }
    let lower = url.to_lowercase();
    let blocked = ["data:", "javascript:", "blob:", "vbscript:"];
    if blocked.iter().any(|scheme| lower.starts_with(scheme)) {
        return;
    }
    images.push(url.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_script_and_ads_scenario_2() {
        let html = r#"<p>Hello</p><script>alert(1)</script><div class="ad-container">Buy</div><p>World</p>"#;
        let options = CleanOptions {
            minimum_input_length: 0,
            ..CleanOptions::default()
        };
        let result = clean_html(html, &options);
        assert_eq!(result.cleaned_content, "Hello World");
        assert!(result.extracted_images.is_empty());
    }

    #[test]
    fn idempotent_cleanup_scenario_p1() {
        let html = r#"<div><p>Some   article   text</p><script>bad()</script></div>"#;
        let options = CleanOptions {
            minimum_input_length: 0,
            ..CleanOptions::default()
        };
        let once = clean_html(html, &options);
        let twice = clean_html(&format!("<div>{}</div>", once.cleaned_content), &options);
        assert_eq!(once.cleaned_content, twice.cleaned_content);
    }

    #[test]
    fn rejects_unsafe_image_schemes() {
        let html = r#"<div><img src="data:image/png;base64,AAA"><img src="https://cdn.example.com/a.jpg"></div>"#;
        let options = CleanOptions {
            minimum_input_length: 0,
            ..CleanOptions::default()
        };
        let result = clean_html(html, &options);
        assert_eq!(result.extracted_images, vec!["https://cdn.example.com/a.jpg".to_string()]);
    }

    #[test]
    fn below_minimum_length_passes_through_unchanged() {
        let html = "<p>short</p>";
        let result = clean_html(html, &CleanOptions::default());
        assert_eq!(result.cleaned_content, html);
        assert_eq!(result.removed_char_count, 0);
    }
}
