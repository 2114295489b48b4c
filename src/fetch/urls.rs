use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::time::sleep;
use url::Url;

const MAX_RETRIES: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Downloadable spreadsheet formats the statistics portals publish.
static SHEET_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(zip|csv)$").expect("invalid sheet extension regex"));

fn is_sheet_url(url: &Url) -> bool {
    SHEET_EXTENSION.is_match(url.path())
}

/// Pull spreadsheet links out of one index page. Kept synchronous so the
/// non-`Send` parsed document never lives across an await point.
fn extract_sheet_links(html: &str, base: &Url, selector: &Selector) -> Vec<String> {
    Html::parse_document(html)
        .select(selector)
        .filter_map(|e| e.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(is_sheet_url)
        .map(|u| u.to_string())
        .collect()
}

/// Fetch all spreadsheet archive URLs linked from the configured feed pages.
/// Each page gets up to three attempts; the result maps feed URL → links in
/// page order.
pub async fn fetch_sheet_urls(
    client: &Client,
    feeds: &[String],
) -> Result<BTreeMap<String, Vec<String>>> {
    let selector = Selector::parse("a[href]").expect("invalid CSS selector for links");

    let mut map = BTreeMap::new();

    for feed in feeds {
        let mut attempt = 0;

        // retry loop
        let links = loop {
            attempt += 1;

            let resp = client.get(feed).send().await;
            match resp {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(html) => {
                        let base = Url::parse(feed)?;
                        break extract_sheet_links(&html, &base, &selector);
                    }
                    Err(_) if attempt < MAX_RETRIES => {
                        sleep(RETRY_DELAY).await;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(_) if attempt < MAX_RETRIES => {
                    sleep(RETRY_DELAY).await;
                    continue;
                }
                Ok(resp) => return Err(anyhow::anyhow!("HTTP error: {}", resp.status())),
                Err(e) => return Err(e.into()),
            }
        };

        map.insert(feed.clone(), links);
    }

    Ok(map)
}
