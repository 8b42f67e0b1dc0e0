use pollwatch::error::FetchError;
use regex::Regex;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::trace;

#[inline]
pub fn capture_group_1<'a>(re: &Regex, input: &'a str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Send `request` and return the body, failing on a non-success status.
pub async fn send_for_text(request: RequestBuilder) -> Result<String, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    let url = response.url().to_string();
    if !status.is_success() {
        return Err(FetchError::Status { url, status });
    }
    let body = response.text().await?;
    trace!(%url, len = body.len(), "response body");
    Ok(body)
}

/// Send `request` and decode the JSON body.
///
/// Decoding goes through `serde_json` so malformed payloads surface as
/// [`FetchError::Decode`] rather than a transport error.
pub async fn send_for_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, FetchError> {
    let body = send_for_text(request).await?;
    Ok(serde_json::from_str(&body)?)
}

/// `None` for blank strings.
#[inline]
pub fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
