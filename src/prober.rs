// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Readiness probe of managed external regions.
//!
//! Every managed region runs a prober reachable through its ingress at
//! `https://<cluster>-cassandra-prober-<namespace>.<domain>`. Two endpoints are used:
//!
//! - `/region-ready` answers with a plain `true` or `false` body. A region that
//!   cannot be reached is simply not ready.
//! - `/dcs` lists the region's datacenters as `[{"name": ..., "replicas": ...}]`.

use crate::crd::DC;
use crate::errors::ProbeError;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::time::Duration;
use tracing::debug;

/// Path of the readiness endpoint served by every region's prober
pub const REGION_READY_PATH: &str = "/region-ready";

/// Path of the datacenter list served by every region's prober
pub const REGION_DCS_PATH: &str = "/dcs";

/// Queries whether a remote region is ready.
#[async_trait]
pub trait RegionProber: Send + Sync {
    /// Returns `Ok(true)` when the region reports itself ready.
    async fn region_ready(&self, host: &str) -> Result<bool, ProbeError>;

    /// Datacenters the region declares.
    async fn region_dcs(&self, host: &str) -> Result<Vec<DC>, ProbeError>;
}

/// Basic auth credentials presented to remote probers.
#[derive(Clone, Debug, Default)]
pub struct ProberAuth {
    pub user: String,
    pub password: String,
}

/// [`RegionProber`] performing HTTPS requests with `reqwest`.
#[derive(Clone)]
pub struct HttpRegionProber {
    client: HttpClient,
    auth: Option<ProberAuth>,
}

impl HttpRegionProber {
    /// Build a prober whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration, auth: Option<ProberAuth>) -> Result<Self, reqwest::Error> {
        let client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self { client, auth })
    }

    /// GET `url` and return the body of a successful response.
    async fn fetch(&self, host: &str, url: &str) -> Result<String, ProbeError> {
        let mut request = self.client.get(url);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.user, Some(&auth.password));
        }

        let response = request.send().await.map_err(|e| ProbeError::Request {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                host: host.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| ProbeError::Request {
            host: host.to_string(),
            reason: e.to_string(),
        })
    }
}

/// URL of the readiness endpoint of `host`.
#[must_use]
pub fn region_ready_url(host: &str) -> String {
    format!("https://{host}{REGION_READY_PATH}")
}

/// URL of the datacenter list of `host`.
#[must_use]
pub fn region_dcs_url(host: &str) -> String {
    format!("https://{host}{REGION_DCS_PATH}")
}

/// Parse the body returned by the datacenter list endpoint.
///
/// # Errors
///
/// Returns [`ProbeError::Decode`] when the body is not a JSON list of datacenters.
pub fn parse_dcs_body(host: &str, body: &str) -> Result<Vec<DC>, ProbeError> {
    serde_json::from_str(body).map_err(|e| ProbeError::Decode {
        host: host.to_string(),
        reason: e.to_string(),
    })
}

/// Parse the body returned by the readiness endpoint.
///
/// # Errors
///
/// Returns [`ProbeError::Body`] for anything other than `true` or `false`.
pub fn parse_ready_body(host: &str, body: &str) -> Result<bool, ProbeError> {
    match body.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ProbeError::Body {
            host: host.to_string(),
            body: other.to_string(),
        }),
    }
}

#[async_trait]
impl RegionProber for HttpRegionProber {
    async fn region_ready(&self, host: &str) -> Result<bool, ProbeError> {
        let url = region_ready_url(host);
        debug!(url = %url, "Probing region readiness");
        let body = self.fetch(host, &url).await?;
        parse_ready_body(host, &body)
    }

    async fn region_dcs(&self, host: &str) -> Result<Vec<DC>, ProbeError> {
        let url = region_dcs_url(host);
        debug!(url = %url, "Listing region datacenters");
        let body = self.fetch(host, &url).await?;
        parse_dcs_body(host, &body)
    }
}

#[cfg(test)]
#[path = "prober_tests.rs"]
mod prober_tests;
