// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::PlayRequest;
use crate::api::ApiClient;
use crate::error::Result;
use crate::models::ContentType;
use serde::Serialize;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrigin {
    Hls,
    Direct,
    Proxy,
    Compat,
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceOrigin::Hls => "hls",
            SourceOrigin::Direct => "direct",
            SourceOrigin::Proxy => "proxy",
            SourceOrigin::Compat => "compat",
        };
        f.write_str(name)
    }
}

/// One playable URL, absolute and ready to hand to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub url: String,
    pub origin: SourceOrigin,
}

impl Candidate {
    fn new(url: String, origin: SourceOrigin) -> Self {
        Self { url, origin }
    }

    /// Whether the URL points at an HLS manifest.
    pub fn is_hls(&self) -> bool {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        path.to_ascii_lowercase().ends_with(".m3u8")
    }
}

/// Builds the ordered list of sources to try for `request`.
///
/// Lookups that fail or come back empty are skipped; only a missing
/// session token is an error.
pub async fn resolve_candidates(
    api: &ApiClient,
    request: &PlayRequest,
    compat_live_first: bool,
) -> Result<Vec<Candidate>> {
    api.session().require_token()?;

    let id = urlencoding::encode(&request.id).into_owned();
    let ext = if request.ext.is_empty() {
        "mp4".to_string()
    } else {
        request.ext.clone()
    };
    let ext_query = urlencoding::encode(&ext).into_owned();

    let mut candidates = Vec::new();
    match request.kind {
        ContentType::Vod | ContentType::Series => {
            if let Some(url) = api.hls_check(&request.id).await {
                debug!("HLS available for {} {}", request.kind, request.id);
                return Ok(vec![Candidate::new(api.absolute_url(&url)?, SourceOrigin::Hls)]);
            }

            let kind = request.kind.as_str();
            if let Some(url) = api.direct_url(kind, &request.id, Some(&ext)).await {
                candidates.push(Candidate::new(api.media_url(&url)?, SourceOrigin::Direct));
            }
            // The backend proxies both movies and episodes under /proxy/vod.
            candidates.push(Candidate::new(
                api.media_url(&format!("/proxy/vod/{}?ext={}", id, ext_query))?,
                SourceOrigin::Proxy,
            ));
            candidates.push(Candidate::new(
                api.media_url(&format!("/compat/{}/{}?ext={}", kind, id, ext_query))?,
                SourceOrigin::Compat,
            ));
        }
        ContentType::Live => {
            let compat = Candidate::new(
                api.media_url(&format!("/compat/live/{}", id))?,
                SourceOrigin::Compat,
            );
            let direct = api
                .direct_url("live", &request.id, None)
                .await
                .map(|url| api.media_url(&url))
                .transpose()?
                .map(|url| Candidate::new(url, SourceOrigin::Direct));

            if compat_live_first {
                candidates.push(compat);
                candidates.extend(direct);
            } else {
                candidates.extend(direct);
                candidates.push(compat);
            }
        }
    }

    debug!(
        "Resolved {} candidate(s) for {} {}",
        candidates.len(),
        request.kind,
        request.id
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_hls_manifests() {
        let hls = Candidate::new(
            "http://tv/hls/vod/1/index.M3U8?token=x".to_string(),
            SourceOrigin::Hls,
        );
        assert!(hls.is_hls());

        let mp4 = Candidate::new(
            "http://tv/proxy/vod/1?ext=mp4&name=a.m3u8".to_string(),
            SourceOrigin::Proxy,
        );
        assert!(!mp4.is_hls());
    }
}
