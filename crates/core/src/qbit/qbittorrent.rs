//! qBittorrent Web API collaborator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Deserializer};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::classify::UpdatePlan;
use crate::config::QBittorrentConfig;

use super::{
    parse_tags, FileEntry, PlanApplier, QbitError, SnapshotBatch, SnapshotSource, TorrentRecord,
    TorrentSnapshot, TrackerMessage,
};

/// qBittorrent Web API client. Implements both the snapshot source and the
/// plan applier sides of the contract.
///
/// The session cookie lives in the reqwest cookie jar; `logged_in` only
/// tracks whether a login has succeeded since the last 403.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    logged_in: RwLock<bool>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client.
    pub fn new(config: QBittorrentConfig) -> Result<Self, QbitError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| QbitError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            logged_in: RwLock::new(false),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), endpoint)
    }

    /// Authenticate against /auth/login. qBittorrent answers 200 with a
    /// literal "Ok." or "Fails." body, and 403 once the IP is banned for
    /// repeated failures.
    async fn login(&self) -> Result<(), QbitError> {
        let credentials = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];
        let response = self
            .client
            .post(self.url("/api/v2/auth/login"))
            .form(&credentials)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().as_u16() == 403 {
            return Err(QbitError::AuthenticationFailed(
                "IP banned after repeated login failures".to_string(),
            ));
        }

        let body = response.text().await.map_err(transport_error)?;
        match body.trim() {
            "Ok." => {
                debug!("qBittorrent login successful");
                *self.logged_in.write().await = true;
                Ok(())
            }
            "Fails." => Err(QbitError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            )),
            other => Err(QbitError::InvalidResponse(format!(
                "unexpected login reply: {}",
                other.lines().next().unwrap_or_default()
            ))),
        }
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response, QbitError> {
        let mut request = self.client.request(method, self.url(endpoint));
        if let Some(params) = form {
            request = request.form(params);
        }
        request.send().await.map_err(transport_error)
    }

    /// Perform an authenticated request, logging in first when needed.
    ///
    /// A 403 means the session cookie expired; the request is replayed
    /// exactly once behind a fresh login. This is the only retry path in
    /// the client.
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<String, QbitError> {
        if !*self.logged_in.read().await {
            self.login().await?;
        }

        let mut response = self.send(method.clone(), endpoint, form).await?;

        if response.status().as_u16() == 403 {
            warn!("qBittorrent session expired, re-authenticating");
            *self.logged_in.write().await = false;
            self.login().await?;
            response = self.send(method, endpoint, form).await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(QbitError::ApiError(format!("HTTP {}", status)));
        }
        response.text().await.map_err(transport_error)
    }

    async fn get(&self, endpoint: &str) -> Result<String, QbitError> {
        self.request(Method::GET, endpoint, None).await
    }

    async fn post_form(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<(), QbitError> {
        self.request(Method::POST, endpoint, Some(params)).await?;
        Ok(())
    }

    async fn fetch_trackers(&self, hash: &str) -> Result<Vec<TrackerMessage>, QbitError> {
        let body = self
            .get(&format!("/api/v2/torrents/trackers?hash={}", hash))
            .await?;
        let raw: Vec<RawTracker> =
            serde_json::from_str(&body).map_err(|e| QbitError::InvalidResponse(e.to_string()))?;

        Ok(raw
            .into_iter()
            .map(|t| TrackerMessage {
                url: t.url,
                tier: t.tier,
                status: t.status,
                msg: t.msg,
            })
            .collect())
    }

    async fn fetch_files(&self, hash: &str) -> Result<Vec<FileEntry>, QbitError> {
        let body = self
            .get(&format!("/api/v2/torrents/files?hash={}", hash))
            .await?;
        let raw: Vec<RawFile> =
            serde_json::from_str(&body).map_err(|e| QbitError::InvalidResponse(e.to_string()))?;

        Ok(raw
            .into_iter()
            .map(|f| FileEntry {
                name: f.name,
                size: f.size,
            })
            .collect())
    }
}

#[async_trait]
impl SnapshotSource for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn fetch_batch(&self) -> Result<SnapshotBatch, QbitError> {
        let body = self.get("/api/v2/torrents/info").await?;
        let raw: Vec<RawTorrent> =
            serde_json::from_str(&body).map_err(|e| QbitError::InvalidResponse(e.to_string()))?;

        debug!("Fetched {} torrents from qBittorrent", raw.len());

        let mut torrents = Vec::with_capacity(raw.len());
        for t in raw {
            let trackers = self.fetch_trackers(&t.hash).await?;
            let files = self.fetch_files(&t.hash).await?;
            torrents.push(TorrentRecord {
                snapshot: TorrentSnapshot {
                    hash: t.hash,
                    name: t.name,
                    added_on: t.added_on,
                    completion_on: t.completion_on,
                    content_path: t.content_path,
                    save_path: t.save_path,
                    size_bytes: t.size,
                    tags: parse_tags(&t.tags),
                    category: t.category,
                    force_start: t.force_start,
                    amount_left: t.amount_left,
                    downloaded: t.downloaded,
                    dl_speed: t.dlspeed,
                    up_limit: t.up_limit,
                    num_complete: t.num_complete,
                },
                trackers,
                files,
            });
        }

        Ok(SnapshotBatch { torrents })
    }
}

#[async_trait]
impl PlanApplier for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn apply(&self, hash: &str, plan: &UpdatePlan) -> Result<(), QbitError> {
        if !plan.tags_to_add().is_empty() {
            let tags = plan.tags_to_add().join(",");
            self.post_form(
                "/api/v2/torrents/addTags",
                &[("hashes", hash), ("tags", &tags)],
            )
            .await?;
        }

        if !plan.tags_to_remove().is_empty() {
            let tags = plan.tags_to_remove().join(",");
            self.post_form(
                "/api/v2/torrents/removeTags",
                &[("hashes", hash), ("tags", &tags)],
            )
            .await?;
        }

        if let Some(limit) = plan.upload_limit {
            let limit = limit.to_string();
            self.post_form(
                "/api/v2/torrents/setUploadLimit",
                &[("hashes", hash), ("limit", &limit)],
            )
            .await?;
        }

        if plan.clear_category {
            self.post_form(
                "/api/v2/torrents/setCategory",
                &[("hashes", hash), ("category", "")],
            )
            .await?;
        }

        Ok(())
    }

    async fn remove_torrents(
        &self,
        hashes: &[String],
        delete_files: bool,
    ) -> Result<(), QbitError> {
        if hashes.is_empty() {
            return Ok(());
        }

        let hashes = hashes.join("|");
        let delete_files = if delete_files { "true" } else { "false" };
        self.post_form(
            "/api/v2/torrents/delete",
            &[("hashes", &hashes), ("deleteFiles", delete_files)],
        )
        .await
    }
}

fn transport_error(e: reqwest::Error) -> QbitError {
    if e.is_timeout() {
        QbitError::Timeout
    } else if e.is_connect() {
        QbitError::ConnectionFailed(e.to_string())
    } else {
        QbitError::ApiError(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct RawTorrent {
    hash: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    added_on: i64,
    #[serde(default)]
    completion_on: i64,
    #[serde(default)]
    content_path: String,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    force_start: bool,
    #[serde(default)]
    amount_left: u64,
    #[serde(default)]
    downloaded: u64,
    #[serde(default)]
    dlspeed: u64,
    #[serde(default = "default_up_limit")]
    up_limit: i64,
    #[serde(default)]
    num_complete: i64,
}

fn default_up_limit() -> i64 {
    -1
}

#[derive(Debug, Deserialize)]
struct RawTracker {
    #[serde(default)]
    url: String,
    /// qBittorrent reports tier as an empty string for the DHT/PeX/LSD
    /// pseudo-tracker rows.
    #[serde(default = "default_tier", deserialize_with = "tier_or_disabled")]
    tier: i64,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    msg: String,
}

fn default_tier() -> i64 {
    -1
}

fn tier_or_disabled<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_i64().unwrap_or(-1))
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: u64,
}
