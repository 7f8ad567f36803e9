// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::cache::{LocalCache, ttl_ms};
use crate::error::{AccountError, ClientError, Result};
use crate::models::{
    Category, ContentType, ErrorBody, HlsCheck, NewFavourite, Profile, ProfileDetail,
    SearchResponse, SeriesInfoResponse, StreamItem, StreamUrl, TokenResponse, VodInfoResponse,
};
use crate::playback::gain::is_same_origin;
use crate::session::SessionStore;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Client for the backend HTTP JSON API. Every authenticated call carries
/// the session token as a bearer header; read-only calls go through the
/// local cache.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    session: SessionStore,
    cache: LocalCache,
}

impl ApiClient {
    pub fn new(
        server_url: &str,
        session: SessionStore,
        cache: LocalCache,
        timeout: Duration,
    ) -> Result<Self> {
        let mut base_url = Url::parse(server_url)?;
        // Keep only scheme://host:port so that absolute paths join cleanly.
        base_url.set_path("/");
        base_url.set_query(None);
        base_url.set_fragment(None);

        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent(concat!("iptv-client/", env!("CARGO_PKG_VERSION")))
                .build()?,
            base_url,
            session,
            cache,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        authenticated: bool,
    ) -> Result<(StatusCode, Value)> {
        let url = self.endpoint(path)?;
        let mut request = self.client.request(method.clone(), url);
        if authenticated {
            let token = self.session.require_token()?;
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!("{} {}", method, path);
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let value: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        debug!("{} {} -> {}", method, path, status);
        Ok((status, value))
    }

    async fn auth_get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, None, true).await
    }

    /// GET that must succeed; non-2xx responses become `ClientError::Status`.
    async fn get_ok<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (status, value) = self.auth_get(path).await?;
        ensure_success(status, &value)?;
        parse_shape(path, value)
    }

    /// Returns the JSON body for `path`, from the cache when a live entry
    /// exists and `bypass_once` is false. Only 2xx bodies are cached; other
    /// bodies are still returned to the caller.
    pub async fn cached_fetch_json(
        &self,
        path: &str,
        ttl_seconds: Option<u64>,
        bypass_once: bool,
    ) -> Result<Value> {
        if !bypass_once && let Some(cached) = self.cache.get(path) {
            debug!("Cache hit: {}", path);
            return Ok(cached);
        }

        let (status, value) = self.auth_get(path).await?;
        if status.is_success() {
            self.cache.set(path, value.clone(), ttl_ms(ttl_seconds));
        } else {
            debug!("Not caching {} (status {})", path, status);
        }
        Ok(value)
    }

    pub async fn cached_fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        ttl_seconds: Option<u64>,
        bypass_once: bool,
    ) -> Result<T> {
        let value = self.cached_fetch_json(path, ttl_seconds, bypass_once).await?;
        parse_shape(path, value)
    }

    // Account

    pub async fn login(&self, email: &str, password: &str) -> Result<String, AccountError> {
        self.obtain_token("/login", email, password, "Login failed").await
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<String, AccountError> {
        self.obtain_token("/register", email, password, "Registration failed")
            .await
    }

    async fn obtain_token(
        &self,
        path: &str,
        email: &str,
        password: &str,
        default_error: &str,
    ) -> Result<String, AccountError> {
        let email = email.trim();
        let password = password.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::MissingCredentials);
        }

        let body = json!({ "email": email, "password": password });
        let (status, value) = self
            .send(Method::POST, path, Some(&body), false)
            .await
            .map_err(AccountError::Network)?;

        if !status.is_success() {
            return Err(rejected(&value, default_error));
        }

        let token: TokenResponse = parse_shape(path, value).map_err(AccountError::Network)?;
        self.session
            .set_token(&token.token)
            .map_err(AccountError::Network)?;
        Ok(token.token)
    }

    pub async fn save_iptv_credentials(
        &self,
        server_url: &str,
        username: &str,
        password: &str,
    ) -> Result<(), AccountError> {
        let (server_url, username, password) = (server_url.trim(), username.trim(), password.trim());
        if server_url.is_empty() || username.is_empty() || password.is_empty() {
            return Err(AccountError::MissingIptvFields);
        }

        let body = json!({ "server_url": server_url, "username": username, "password": password });
        let (status, value) = self
            .send(Method::POST, "/iptv/login", Some(&body), true)
            .await
            .map_err(AccountError::Network)?;
        if !status.is_success() {
            return Err(rejected(&value, "Failed to save IPTV credentials."));
        }
        Ok(())
    }

    pub async fn refresh_iptv(&self) -> Result<bool, AccountError> {
        let (status, value) = self
            .send(Method::POST, "/iptv/refresh", None, true)
            .await
            .map_err(AccountError::Network)?;
        if !status.is_success() {
            return Err(rejected(&value, "Refresh failed"));
        }
        Ok(value.get("ok").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Probes the live category list without the cache; a 2xx answer means
    /// the account has IPTV credentials configured.
    pub async fn has_iptv_credentials(&self) -> bool {
        match self.auth_get("/categories/live").await {
            Ok((status, _)) => status.is_success(),
            Err(e) => {
                debug!("Credential probe failed: {}", e);
                false
            }
        }
    }

    // Profiles

    /// Lists profiles and makes the first one the selected profile when none
    /// is selected yet.
    pub async fn profiles(&self) -> Result<Vec<Profile>> {
        let profiles: Vec<Profile> = self.get_ok("/profiles").await?;
        if self.session.profile_id().is_none()
            && let Some(first) = profiles.first()
        {
            self.session.set_profile_id(&first.id)?;
        }
        Ok(profiles)
    }

    pub async fn create_profile(&self, name: &str) -> Result<Profile, AccountError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AccountError::MissingProfileName);
        }
        let body = json!({ "name": name });
        let (status, value) = self
            .send(Method::POST, "/profiles", Some(&body), true)
            .await
            .map_err(AccountError::Network)?;
        if !status.is_success() {
            return Err(rejected(&value, "Failed to create profile"));
        }
        parse_shape("/profiles", value).map_err(AccountError::Network)
    }

    pub async fn profile_detail(&self, profile_id: &str) -> Result<ProfileDetail> {
        self.get_ok(&format!("/profiles/{}", profile_id)).await
    }

    pub async fn delete_profile(&self, profile_id: &str) -> Result<(), AccountError> {
        let path = format!("/profiles/{}", profile_id);
        let (status, value) = self
            .send(Method::DELETE, &path, None, true)
            .await
            .map_err(AccountError::Network)?;
        if !status.is_success() {
            return Err(rejected(&value, "Failed to delete profile"));
        }
        if self.session.profile_id().as_deref() == Some(profile_id) {
            self.session
                .set_profile_id("")
                .map_err(AccountError::Network)?;
        }
        Ok(())
    }

    /// Adds an item to the selected profile's list and returns the favourite id.
    pub async fn add_favourite(&self, favourite: &NewFavourite) -> Result<String, AccountError> {
        let profile_id = self
            .session
            .profile_id()
            .ok_or(AccountError::NoProfileSelected)?;
        let path = format!("/profiles/{}/favourites", profile_id);
        let body = serde_json::to_value(favourite)
            .map_err(|e| AccountError::Network(ClientError::Json(e)))?;

        let (status, value) = self
            .send(Method::POST, &path, Some(&body), true)
            .await
            .map_err(AccountError::Network)?;
        if !status.is_success() {
            return Err(AccountError::Rejected("Failed to add".to_string()));
        }
        Ok(value
            .get("id")
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default())
    }

    pub async fn remove_favourite(&self, favourite_id: &str) -> Result<(), AccountError> {
        let profile_id = self
            .session
            .profile_id()
            .ok_or(AccountError::NoProfileSelected)?;
        let path = format!("/profiles/{}/favourites/{}", profile_id, favourite_id);
        let (status, value) = self
            .send(Method::DELETE, &path, None, true)
            .await
            .map_err(AccountError::Network)?;
        if !status.is_success() {
            return Err(rejected(&value, "Failed to remove"));
        }
        Ok(())
    }

    // Catalog

    pub async fn categories(
        &self,
        content_type: ContentType,
        ttl_seconds: u64,
        bypass_once: bool,
    ) -> Result<Vec<Category>> {
        let path = format!("/categories/{}", content_type);
        self.cached_fetch(&path, Some(ttl_seconds), bypass_once).await
    }

    pub async fn streams(
        &self,
        content_type: ContentType,
        category_id: &str,
        ttl_seconds: u64,
        bypass_once: bool,
    ) -> Result<Vec<StreamItem>> {
        let path = format!(
            "/streams/{}/{}",
            content_type,
            urlencoding::encode(category_id)
        );
        self.cached_fetch(&path, Some(ttl_seconds), bypass_once).await
    }

    /// `kind` is `all`, `live`, `vod` or `series`.
    pub async fn search(
        &self,
        query: &str,
        kind: &str,
        ttl_seconds: u64,
        bypass_once: bool,
    ) -> Result<SearchResponse> {
        let path = format!(
            "/search?q={}&type={}",
            urlencoding::encode(query),
            urlencoding::encode(kind)
        );
        self.cached_fetch(&path, Some(ttl_seconds), bypass_once).await
    }

    pub async fn vod_info(&self, id: &str, ttl_seconds: u64) -> Result<VodInfoResponse> {
        let path = format!("/info/vod/{}", urlencoding::encode(id));
        self.cached_fetch(&path, Some(ttl_seconds), false).await
    }

    pub async fn series_info(&self, id: &str, ttl_seconds: u64) -> Result<SeriesInfoResponse> {
        let path = format!("/info/series/{}", urlencoding::encode(id));
        self.cached_fetch(&path, Some(ttl_seconds), false).await
    }

    // Playback

    /// Asks the backend for the provider URL of an item. Any failure, or an
    /// answer without a url, yields `None`.
    pub async fn direct_url(&self, kind: &str, id: &str, ext: Option<&str>) -> Option<String> {
        let mut path = format!("/stream_url/{}/{}", kind, urlencoding::encode(id));
        if let Some(ext) = ext {
            path.push_str(&format!("?ext={}", urlencoding::encode(ext)));
        }

        match self.auth_get(&path).await {
            Ok((_, value)) => serde_json::from_value::<StreamUrl>(value)
                .ok()
                .and_then(|s| s.url)
                .filter(|url| !url.is_empty()),
            Err(e) => {
                warn!("Direct URL lookup failed for {}: {}", path, e);
                None
            }
        }
    }

    /// Returns the manifest URL when the backend reports a VOD HLS stream.
    pub async fn hls_check(&self, id: &str) -> Option<String> {
        let path = format!("/hls/check/vod/{}", urlencoding::encode(id));
        match self.auth_get(&path).await {
            Ok((_, value)) => {
                let check: HlsCheck = serde_json::from_value(value).unwrap_or_default();
                check.url.filter(|url| check.ok && !url.is_empty())
            }
            Err(e) => {
                debug!("HLS check failed for {}: {}", id, e);
                None
            }
        }
    }

    fn is_same_origin(&self, url: &str) -> bool {
        is_same_origin(url, &self.base_url)
    }

    /// Resolves `url` against the backend without adding anything to it.
    pub fn absolute_url(&self, url: &str) -> Result<String> {
        Ok(self.endpoint(url)?.to_string())
    }

    /// Resolves a backend media path to an absolute URL carrying the session
    /// token as a query parameter. Foreign URLs are returned untouched.
    pub fn media_url(&self, url: &str) -> Result<String> {
        if !self.is_same_origin(url) {
            return Ok(url.to_string());
        }

        let token = self.session.require_token()?;
        let separator = if url.contains('?') { '&' } else { '?' };
        let with_token = format!("{}{}token={}", url, separator, urlencoding::encode(&token));
        Ok(self.endpoint(&with_token)?.to_string())
    }
}

fn ensure_success(status: StatusCode, body: &Value) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    let message = serde_json::from_value::<ErrorBody>(body.clone())
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

fn rejected(body: &Value, default_message: &str) -> AccountError {
    let message = serde_json::from_value::<ErrorBody>(body.clone())
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default_message.to_string());
    AccountError::Rejected(message)
}

fn parse_shape<T: DeserializeOwned>(path: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        debug!("Unexpected shape for {}: {}", path, e);
        ClientError::UnexpectedShape {
            path: path.to_string(),
        }
    })
}
