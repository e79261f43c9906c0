//! URL helpers: search entry point, absolutizing scraped links, image URL
//! cleanup, and query-parameter access.

use plpharvest_core::HarvestConfig;
use reqwest::Url;

use crate::error::ScraperError;

/// Builds the keyword search listing URL, e.g.
/// `https://www.example.com/search/?q=men&sort=pricedesc`.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if `site_base` does not parse.
pub fn build_search_url(site_base: &str, keyword: &str, sort: &str) -> Result<String, ScraperError> {
    let mut url = parse(site_base)?
        .join("/search/")
        .map_err(|e| invalid(site_base, &e))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("q", keyword);
        if !sort.trim().is_empty() {
            query.append_pair("sort", sort);
        }
    }
    Ok(url.into())
}

/// The first listing URL of a run: the configured start URL verbatim,
/// otherwise the keyword search URL.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if the resulting URL does not parse.
pub fn entry_url(config: &HarvestConfig) -> Result<String, ScraperError> {
    match config.start_url.as_deref() {
        Some(start) => Ok(parse(start)?.into()),
        None => build_search_url(&config.site_base_url, &config.keyword, &config.sort_by),
    }
}

/// Resolves `href` against `base`. Protocol-relative links become `https:`.
/// Returns `None` for empty, `javascript:` or unparsable links.
#[must_use]
pub fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Url::parse(&format!("https://{rest}")).ok().map(Into::into);
    }
    if let Ok(url) = Url::parse(href) {
        return Some(url.into());
    }
    Url::parse(base).ok()?.join(href).ok().map(Into::into)
}

/// Canonical image URL: protocol-relative → `https:`, relative paths are
/// placed under `media_base`, and the query string and fragment are removed.
#[must_use]
pub fn normalize_image_url(raw: &str, media_base: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }
    let absolute = if let Some(rest) = raw.strip_prefix("//") {
        format!("https://{rest}")
    } else if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_owned()
    } else if is_schemeless_host(raw) {
        format!("https://{raw}")
    } else {
        format!(
            "{}/{}",
            media_base.trim_end_matches('/'),
            raw.trim_start_matches('/')
        )
    };
    let end = absolute.find(['?', '#']).unwrap_or(absolute.len());
    Some(absolute[..end].to_owned())
}

/// `images.example-media.com/products/x`: a leading segment that looks like
/// a host name followed by a path.
fn is_schemeless_host(raw: &str) -> bool {
    raw.split_once('/').is_some_and(|(head, _)| {
        head.contains('.')
            && head
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    })
}

/// Reads a query parameter, ignoring empty values.
#[must_use]
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Returns `url` with its `page` parameter set to `page`, keeping every
/// other parameter in place.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if `url` does not parse.
pub fn with_page(url: &str, page: u32) -> Result<String, ScraperError> {
    let mut parsed = parse(url)?;
    let retained: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut query = parsed.query_pairs_mut();
        query.clear();
        query.extend_pairs(retained);
        query.append_pair("page", &page.to_string());
    }
    Ok(parsed.into())
}

fn parse(url: &str) -> Result<Url, ScraperError> {
    Url::parse(url.trim()).map_err(|e| invalid(url, &e))
}

fn invalid(url: &str, err: &impl std::fmt::Display) -> ScraperError {
    ScraperError::InvalidUrl {
        url: url.to_owned(),
        reason: err.to_string(),
    }
}
