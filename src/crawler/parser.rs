//! HTML parser for extracting links and product fields
//!
//! This module handles parsing store pages to extract:
//! - Links to follow (from <a> tags and canonical links)
//! - Product name, price text and category label on product pages
//!
//! Parsing is synchronous and returns owned data, so no parsed document is
//! ever held across an await point.

use crate::config::StoreProfile;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compiled CSS selectors for one store's product pages
#[derive(Debug, Clone)]
pub struct ProductSelectors {
    name: Selector,
    price: Selector,
    category: Option<Selector>,
}

impl ProductSelectors {
    /// Compiles the selector lists of a store profile
    pub fn compile(profile: &StoreProfile) -> Result<Self, ConfigError> {
        Ok(Self {
            name: compile_selector(&profile.name_selector)?,
            price: compile_selector(&profile.price_selector)?,
            category: profile
                .category_selector
                .as_deref()
                .map(compile_selector)
                .transpose()?,
        })
    }
}

fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidPattern(format!("Invalid selector '{}': {}", selector, e)))
}

/// Product fields found on a page; any of them may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
}

/// Extracted information from a store page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// All links found on the page (absolute URLs)
    pub links: Vec<String>,

    /// Product fields, when the page was parsed as a product page
    pub product: Option<ExtractedFields>,
}

/// Parses HTML content and extracts links and, optionally, product fields
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
/// * `selectors` - Product selectors; `None` for listing pages
///
/// # Example
///
/// ```
/// use grocry::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/shop/product/milk">Milk</a></body></html>"#;
/// let base_url = Url::parse("https://www.safeway.com/shop/aisles/dairy.html").unwrap();
/// let parsed = parse_page(html, &base_url, None);
/// assert_eq!(parsed.links, vec!["https://www.safeway.com/shop/product/milk".to_string()]);
/// ```
pub fn parse_page(html: &str, base_url: &Url, selectors: Option<&ProductSelectors>) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        links: extract_links(&document, base_url),
        product: selectors.map(|s| extract_fields(&document, s)),
    }
}

/// Extracts product fields with a store's selectors
///
/// The name is the first matching element with non-empty text. The price
/// is the first matching element whose text (or `content` attribute, for
/// microdata like `<meta itemprop="price">`) contains a digit.
fn extract_fields(document: &Html, selectors: &ProductSelectors) -> ExtractedFields {
    let name = document
        .select(&selectors.name)
        .map(element_text)
        .find(|text| !text.is_empty());

    let price = document
        .select(&selectors.price)
        .filter_map(|element| {
            let text = element_text(element);
            if text.is_empty() {
                element.value().attr("content").map(|c| c.trim().to_string())
            } else {
                Some(text)
            }
        })
        .find(|text| text.bytes().any(|b| b.is_ascii_digit()));

    let category = selectors.category.as_ref().and_then(|selector| {
        document
            .select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    });

    ExtractedFields {
        name,
        price,
        category,
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
