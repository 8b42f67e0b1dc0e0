//! Unity issue tracker pages.

mod parse;

pub use parse::parse_issue_page;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use pollwatch::auth::Credential;
use pollwatch::error::FetchError;
use pollwatch::notification::{Notification, NotificationKind, NotificationPriority};
use pollwatch::source::{Snapshot, SourceClient};
use regex::Regex;
use reqwest::Client;
use url::Url;

use crate::utils::{capture_group_1, send_for_text};

pub static ISSUE_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://issuetracker\.unity3d\.com/issues/(\S+)$").unwrap());

/// Status classes the tracker renders.
pub const KNOWN_STATUSES: &[&str] = &[
    "active",
    "duplicate",
    "not-reproducible",
    "by-design",
    "third-party-issue",
    "fix-in-review",
    "won-t-fix",
    "fixed",
];

/// Statuses after which an issue no longer moves.
pub const ENDING_STATUSES: &[&str] = &[
    "duplicate",
    "not-reproducible",
    "by-design",
    "won-t-fix",
    "fixed",
];

/// Slug of an issue URL, or `None` if `url` is not an issue page.
pub fn issue_slug(url: &str) -> Option<&str> {
    let parsed = Url::parse(url).ok()?;
    if parsed.host_str() != Some("issuetracker.unity3d.com") {
        return None;
    }
    capture_group_1(&ISSUE_URL_REGEX, url)
}

pub fn is_issue_url(url: &str) -> bool {
    issue_slug(url).is_some()
}

/// Name and statuses of one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueStatus {
    pub url: String,
    pub name: String,
    pub statuses: BTreeSet<String>,
}

impl IssueStatus {
    /// Whether any status is an ending one.
    pub fn is_resolved(&self) -> bool {
        self.statuses
            .iter()
            .any(|status| ENDING_STATUSES.contains(&status.as_str()))
    }

    pub fn status_string(&self) -> String {
        self.statuses
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Snapshot for IssueStatus {
    fn to_notification(&self, entity_id: &str, kind: NotificationKind) -> Notification {
        let notification = Notification::new(kind, entity_id, self.name.clone())
            .with_url(self.url.clone())
            .with_description(format!("Status changed to {}", self.status_string()))
            .with_field("Status", self.status_string());
        if self.is_resolved() {
            notification.with_priority(NotificationPriority::High)
        } else {
            notification
        }
    }

    fn summary(&self) -> String {
        format!("Issue \"{}\" - {}", self.name, self.status_string())
    }
}

/// Fetches issue pages; entity ids are the issue URLs.
pub struct UnityIssueTracker {
    client: Client,
}

impl UnityIssueTracker {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceClient for UnityIssueTracker {
    type Snapshot = IssueStatus;

    fn kind(&self) -> &'static str {
        "unity-issue-tracker"
    }

    async fn fetch(
        &self,
        url: &str,
        _credential: Option<&Credential>,
    ) -> Result<IssueStatus, FetchError> {
        let html = send_for_text(self.client.get(url)).await?;
        parse_issue_page(url, &html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollwatch::utils::http_client::default_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_issue_url_validation() {
        assert_eq!(
            issue_slug("https://issuetracker.unity3d.com/issues/crash-on-import"),
            Some("crash-on-import")
        );
        assert!(!is_issue_url("https://issuetracker.unity3d.com/issues/"));
        assert!(!is_issue_url("http://issuetracker.unity3d.com/issues/crash"));
        assert!(!is_issue_url("https://example.com/issues/crash"));
        assert!(!is_issue_url("not a url"));
    }

    #[test]
    fn test_status_sets() {
        for ending in ENDING_STATUSES {
            assert!(KNOWN_STATUSES.contains(ending));
        }
        let issue = IssueStatus {
            url: "u".to_string(),
            name: "n".to_string(),
            statuses: BTreeSet::from(["active".to_string(), "third-party-issue".to_string()]),
        };
        assert!(!issue.is_resolved());
    }

    #[test]
    fn test_equality_is_structural() {
        let a = IssueStatus {
            url: "u".to_string(),
            name: "n".to_string(),
            statuses: BTreeSet::from(["fixed".to_string(), "active".to_string()]),
        };
        let b = IssueStatus {
            url: "u".to_string(),
            name: "n".to_string(),
            statuses: BTreeSet::from(["active".to_string(), "fixed".to_string()]),
        };
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_fetch_issue_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/issues/crash-on-import"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<h2 itemprop="name">Crash on import</h2>
                <div class="status"><p class="fixed">Fixed</p></div>"#,
            ))
            .mount(&server)
            .await;

        let url = format!("{}/issues/crash-on-import", server.uri());
        let issue = UnityIssueTracker::new(default_client().unwrap())
            .fetch(&url, None)
            .await
            .unwrap();
        assert_eq!(issue.name, "Crash on import");
        assert!(issue.is_resolved());
    }

    #[tokio::test]
    async fn test_fetch_missing_issue() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/issues/gone", server.uri());
        let err = UnityIssueTracker::new(default_client().unwrap())
            .fetch(&url, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { .. }));
    }
}
