// Shared reqwest client for the Google REST APIs.

use std::time::Duration;

use crate::version;

pub fn build_client(request_timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(version::user_agent())
        .timeout(Duration::from_secs(request_timeout_secs))
        .build()?;
    Ok(client)
}

/// Joins a base URL (with or without trailing slash) and an absolute API path.
pub(crate) fn join(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
