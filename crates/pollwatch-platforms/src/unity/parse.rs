//! Issue page scraping.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use pollwatch::error::FetchError;
use scraper::{Html, Selector};

use super::{IssueStatus, KNOWN_STATUSES};

static NAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"h2[itemprop="name"]"#).unwrap());
static STATUS_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.status").unwrap());
static PARAGRAPH_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

/// Read the issue name and its statuses from an issue page.
///
/// Each `div.status` contributes the first known status class of its first
/// paragraph. A page without any known status cannot be classified.
pub fn parse_issue_page(url: &str, html: &str) -> Result<IssueStatus, FetchError> {
    let document = Html::parse_document(html);

    let name = document
        .select(&NAME_SELECTOR)
        .next()
        .map(|h2| h2.text().collect::<String>().trim().to_string())
        .ok_or_else(|| FetchError::classification(format!("no issue name on {}", url)))?;

    let mut statuses = BTreeSet::new();
    for status in document.select(&STATUS_SELECTOR) {
        let Some(paragraph) = status.select(&PARAGRAPH_SELECTOR).next() else {
            continue;
        };
        if let Some(class) = paragraph
            .value()
            .classes()
            .find(|class| KNOWN_STATUSES.contains(class))
        {
            statuses.insert(class.to_string());
        }
    }

    if statuses.is_empty() {
        return Err(FetchError::classification(format!(
            "no status elements found on {}",
            url
        )));
    }

    Ok(IssueStatus {
        url: url.to_string(),
        name,
        statuses,
    })
}
