// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin `reqwest` wrapper over the daemon's HTTP surface (spec.md §6).

use futures_util::StreamExt;
use sandbox_core::{PortInfo, ProcessRecord, SpawnRequest, UpgradeStatus};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("daemon returned {status}: {message}")]
    Api { status: reqwest::StatusCode, message: String },
}

/// Talks to one daemon instance over HTTP (spec.md §6's full endpoint set).
pub struct DaemonClient {
    base_url: String,
    http: reqwest::Client,
}

impl DaemonClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let message = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        Err(ClientError::Api { status, message })
    }

    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let resp = self.http.get(self.url("/health")).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn spawn(&self, req: &SpawnRequest) -> Result<ProcessRecord, ClientError> {
        let resp = self.http.post(self.url("/process")).json(req).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn list(&self) -> Result<Vec<ProcessRecord>, ClientError> {
        let resp = self.http.get(self.url("/process")).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn get(&self, id: &str) -> Result<ProcessRecord, ClientError> {
        let resp = self.http.get(self.url(&format!("/process/{id}"))).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn stop(&self, id: &str) -> Result<ProcessRecord, ClientError> {
        let resp = self.http.delete(self.url(&format!("/process/{id}"))).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn kill(&self, id: &str) -> Result<ProcessRecord, ClientError> {
        let resp = self
            .http
            .delete(self.url(&format!("/process/{id}/kill")))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn logs(&self, id: &str) -> Result<serde_json::Value, ClientError> {
        let resp = self.http.get(self.url(&format!("/process/{id}/logs"))).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Streams NDJSON frames from a live endpoint, printing one formatted
    /// line per frame as it arrives. Used for `process logs --follow` and
    /// `watch`, which share the same wire shape (spec.md §4.1, §4.5).
    pub async fn stream_ndjson(
        &self,
        path: &str,
        mut on_line: impl FnMut(&str),
    ) -> Result<(), ClientError> {
        let resp = self.http.get(self.url(path)).send().await?;
        let resp = Self::check(resp).await?;
        let mut stream = resp.bytes_stream();
        let mut buf = String::new();
        while let Some(chunk) = stream.next().await {
            buf.push_str(&String::from_utf8_lossy(&chunk?));
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].to_string();
                buf.drain(..=pos);
                if !line.is_empty() {
                    on_line(&line);
                }
            }
        }
        Ok(())
    }

    pub async fn fs_read(&self, path: &str) -> Result<serde_json::Value, ClientError> {
        let resp = self.http.get(self.url(&format!("/filesystem{path}"))).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn fs_read_bytes(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        let resp = self
            .http
            .get(self.url(&format!("/filesystem{path}?download=true")))
            .send()
            .await?;
        Ok(Self::check(resp).await?.bytes().await?.to_vec())
    }

    pub async fn fs_write(&self, path: &str, content: &str) -> Result<serde_json::Value, ClientError> {
        let resp = self
            .http
            .put(self.url(&format!("/filesystem{path}")))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn fs_delete(&self, path: &str, recursive: bool) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(self.url(&format!("/filesystem{path}?recursive={recursive}")))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn fs_tree(&self, path: &str) -> Result<serde_json::Value, ClientError> {
        let resp = self
            .http
            .get(self.url(&format!("/filesystem/tree{path}")))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn fs_find(&self, path: &str, query: &str) -> Result<Vec<String>, ClientError> {
        let resp = self
            .http
            .get(self.url(&format!("/filesystem/find{path}?{query}")))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn network_ports(&self, pid: u32) -> Result<Vec<PortInfo>, ClientError> {
        let resp = self
            .http
            .get(self.url(&format!("/network/process/{pid}/ports")))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn network_monitor_start(&self, pid: u32) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(self.url(&format!("/network/process/{pid}/monitor")))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn network_monitor_stop(&self, pid: u32) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(self.url(&format!("/network/process/{pid}/monitor")))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn upgrade_start(&self, version: &str, base_url: &str) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(self.url("/upgrade"))
            .json(&serde_json::json!({ "version": version, "baseUrl": base_url }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn upgrade_status(&self) -> Result<UpgradeStatus, ClientError> {
        let resp = self.http.get(self.url("/upgrade/status")).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}
