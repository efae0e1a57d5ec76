//! REST request paths.
//!
//! Owner, repository, user and tag names are pushed as single path segments,
//! so `#`, `%`, `?` and `/` inside a name are percent-encoded instead of
//! ending the path early.

use url::Url;

use super::error::{ApiError, Result};

const BASE_URL: &str = "https://api.github.com/";

/// Split `owner/name` into its two halves.
pub(crate) fn split_full_name(full_name: &str) -> Result<(&str, &str)> {
    full_name
        .split_once('/')
        .ok_or_else(|| ApiError::decode(format!("invalid repository name: {full_name}")))
}

/// Join raw segments into an encoded absolute path.
pub(crate) fn path<'a>(segments: impl IntoIterator<Item = &'a str>) -> Result<String> {
    let mut url = Url::parse(BASE_URL).map_err(|e| ApiError::decode(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| ApiError::decode("base URL cannot carry a path"))?
        .clear()
        .extend(segments);
    Ok(url.path().to_string())
}

/// `/repos/{owner}/{name}/...`
pub(crate) fn repo(full_name: &str, rest: &[&str]) -> Result<String> {
    let (owner, name) = split_full_name(full_name)?;
    path(["repos", owner, name].into_iter().chain(rest.iter().copied()))
}

/// `/users/{username}/...`
pub(crate) fn user(username: &str, rest: &[&str]) -> Result<String> {
    path(["users", username].into_iter().chain(rest.iter().copied()))
}
