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

#[cfg(test)]
pub mod mock_notifier;
pub mod webhook;

use anyhow::{anyhow, Result};
use serde::Serialize;

/// The tag Apprise notifies when none is configured.
pub const DEFAULT_APPRISE_TAG: &str = "all";

/// An interface for delivering a status message to humans.
pub trait Notifier {
    fn notify(&self, message: &str) -> Result<()>;
}

/// The payload format a webhook expects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Apprise API: `{"body": .., "tags": ..}`.
    Apprise { tag: Option<String> },
    /// Discord-style chat webhook: `{"content": ..}`.
    Discord,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Payload<'a> {
    Apprise { body: &'a str, tags: &'a str },
    Discord { content: &'a str },
}

impl Backend {
    /// Case-insensitive lookup; `None` for identifiers this crate does not
    /// know.
    pub fn from_identifier(identifier: &str, apprise_tag: Option<String>) -> Option<Self> {
        match identifier.trim().to_ascii_lowercase().as_str() {
            "apprise" => Some(Backend::Apprise {
                tag: apprise_tag.filter(|tag| !tag.is_empty()),
            }),
            "discord" => Some(Backend::Discord),
            _ => None,
        }
    }
    pub fn payload(&self, message: &str) -> serde_json::Value {
        let payload = match self {
            Backend::Apprise { tag } => Payload::Apprise {
                body: message,
                tags: tag.as_deref().unwrap_or(DEFAULT_APPRISE_TAG),
            },
            Backend::Discord => Payload::Discord { content: message },
        };
        serde_json::json!(payload)
    }
}

/// A backend together with the URL to post to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    pub backend: Backend,
    pub webhook_url: String,
}

impl Channel {
    pub fn new(backend: Backend, webhook_url: impl ToString) -> Self {
        Channel {
            backend,
            webhook_url: webhook_url.to_string(),
        }
    }
}

/// Fans a message out to every configured notifier. With none configured,
/// notifying is a no-op.
#[derive(Default)]
pub struct Notifiers(Vec<Box<dyn Notifier>>);

impl Notifiers {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Notifiers(notifiers)
    }
    pub fn from_channels(channels: &[Channel]) -> Self {
        Notifiers(
            channels
                .iter()
                .map(|channel| {
                    Box::new(webhook::WebhookNotifier::new(channel.clone())) as Box<dyn Notifier>
                })
                .collect(),
        )
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Notifier for Notifiers {
    fn notify(&self, message: &str) -> Result<()> {
        if self.0.is_empty() {
            tracing::info!("Skip notification, no channel configured");
            return Ok(());
        }
        let mut failures = vec![];
        for notifier in &self.0 {
            if let Err(e) = notifier.notify(message) {
                failures.push(format!("{:#}", e));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "{} of {} channels failed: {}",
                failures.len(),
                self.0.len(),
                failures.join("; ")
            ))
        }
    }
}

/// Sends `message` and swallows any delivery failure after logging it.
pub fn notify_best_effort(notifier: &dyn Notifier, message: &str) {
    match notifier.notify(message) {
        Ok(()) => tracing::debug!("Notification delivered"),
        Err(e) => tracing::error!("Failed to send notification: {:#}", e),
    }
}
