// Copyright 2022 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::{Channel, Notifier};
use crate::tokio_block_on;
use anyhow::{anyhow, Error, Result};
use hyper::{client::connect::HttpConnector, Body, Client};
use hyper_tls::HttpsConnector;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A [`Notifier`] posting JSON to a webhook with the `hyper` crate.
///
/// A request is attempted once; there is no retry.
pub struct WebhookNotifier {
    channel: Channel,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(channel: Channel) -> Self {
        Self::with_timeout(channel, DEFAULT_TIMEOUT)
    }
    pub fn with_timeout(channel: Channel, timeout: Duration) -> Self {
        WebhookNotifier { channel, timeout }
    }
    async fn post(&self, message: &str) -> Result<()> {
        let body = serde_json::to_vec(&self.channel.backend.payload(message))?;
        let request = http::Request::builder()
            .method(http::Method::POST)
            .uri(self.channel.webhook_url.as_str())
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|e| Error::new(e).context("Failed to build webhook request"))?;
        let client: Client<HttpsConnector<HttpConnector>> =
            Client::builder().build(HttpsConnector::new());
        let response = tokio::time::timeout(self.timeout, client.request(request))
            .await
            .map_err(|_| anyhow!("No response within {:?}", self.timeout))?
            .map_err(|e| Error::new(e).context("Failed to request by Hyper client"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Webhook responded with {}", status));
        }
        Ok(())
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        tracing::debug!(
            "Notifying {:?} webhook {}",
            self.channel.backend,
            self.channel.webhook_url
        );
        tokio_block_on(self.post(message))
            .map_err(|e| Error::new(e).context("Failed to start async runtime"))?
            .map_err(|e| e.context(format!("Failed to notify {}", self.channel.webhook_url)))?;
        tracing::info!("Notification sent successfully");
        Ok(())
    }
}
