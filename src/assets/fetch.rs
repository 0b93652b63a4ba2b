use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use base64::{Engine as _, engine::general_purpose};

use crate::foundation::error::{ReelsmithError, ReelsmithResult};

/// Source of raw media bytes by URL.
pub trait AssetFetcher: Send + Sync {
    /// Fetch the full resource behind `url`.
    fn fetch(&self, url: &str) -> ReelsmithResult<Vec<u8>>;
}

/// Normalize a relative asset path: forward slashes, no `.`/empty segments, no `..`.
pub fn normalize_rel_path(source: &str) -> ReelsmithResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(ReelsmithError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(ReelsmithError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(ReelsmithError::validation(
                "asset paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(ReelsmithError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// How a media URL is resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetLocation {
    /// `http(s)://` resource (possibly rewritten through the proxy).
    Remote(String),
    /// Inline `data:` payload.
    Inline(String),
    /// File under the assets root (or an explicit `file://` path).
    Local(PathBuf),
}

/// Fetches local files under an assets root and remote URLs over HTTP.
///
/// Remote URLs are routed through `proxy_url` when configured, as `<proxy>?url=<encoded>`.
/// Site-root paths such as `/memes/cat.png` resolve against the assets root.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    assets_root: PathBuf,
    proxy_url: Option<url::Url>,
    client: reqwest::blocking::Client,
}

impl DefaultFetcher {
    /// Create a fetcher. `timeout` bounds each HTTP request.
    pub fn new(
        assets_root: impl Into<PathBuf>,
        proxy_url: Option<&str>,
        timeout: Duration,
    ) -> ReelsmithResult<Self> {
        let proxy_url = proxy_url
            .map(|p| {
                url::Url::parse(p).map_err(|e| {
                    ReelsmithError::validation(format!("invalid proxy_url '{p}': {e}"))
                })
            })
            .transpose()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            assets_root: assets_root.into(),
            proxy_url,
            client,
        })
    }

    /// Base directory for relative media paths.
    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }

    /// Classify `url` and apply the proxy rewrite for remote resources.
    pub fn locate(&self, url: &str) -> ReelsmithResult<AssetLocation> {
        let trimmed = url.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let target = match &self.proxy_url {
                Some(proxy) => {
                    let mut u = proxy.clone();
                    u.query_pairs_mut().append_pair("url", trimmed);
                    u.to_string()
                }
                None => trimmed.to_owned(),
            };
            return Ok(AssetLocation::Remote(target));
        }
        if lower.starts_with("data:") {
            return Ok(AssetLocation::Inline(trimmed.to_owned()));
        }
        if let Some(path) = trimmed.strip_prefix("file://") {
            return Ok(AssetLocation::Local(PathBuf::from(path)));
        }
        let rel = normalize_rel_path(trimmed.trim_start_matches('/'))?;
        Ok(AssetLocation::Local(self.assets_root.join(rel)))
    }
}

impl AssetFetcher for DefaultFetcher {
    fn fetch(&self, url: &str) -> ReelsmithResult<Vec<u8>> {
        match self.locate(url)? {
            AssetLocation::Remote(target) => {
                let resp = self
                    .client
                    .get(&target)
                    .send()
                    .map_err(|e| ReelsmithError::asset(format!("GET {target}: {e}")))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(ReelsmithError::asset(format!(
                        "GET {target}: HTTP {status}"
                    )));
                }
                let bytes = resp
                    .bytes()
                    .map_err(|e| ReelsmithError::asset(format!("read body of {target}: {e}")))?;
                Ok(bytes.to_vec())
            }
            AssetLocation::Inline(data) => decode_data_url(&data),
            AssetLocation::Local(path) => std::fs::read(&path).map_err(|e| {
                ReelsmithError::asset(format!("failed to read asset '{}': {e}", path.display()))
            }),
        }
    }
}

fn decode_data_url(data: &str) -> ReelsmithResult<Vec<u8>> {
    let (meta, payload) = data
        .split_once(',')
        .ok_or_else(|| ReelsmithError::asset("data URL has no payload"))?;
    if !meta.ends_with(";base64") {
        return Err(ReelsmithError::asset("only base64 data URLs are supported"));
    }
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ReelsmithError::asset(format!("invalid base64 data URL: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fetch.rs"]
mod tests;
