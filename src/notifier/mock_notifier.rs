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

//! A [`Notifier`] recording every message, to be used in unit testing.

use super::Notifier;
use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MockNotifier {
    messages: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
}

impl MockNotifier {
    /// Records messages like the default one, but reports every delivery as
    /// failed.
    pub fn failing(details: &str) -> Self {
        MockNotifier {
            failure: Some(details.to_string()),
            ..Default::default()
        }
    }
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
    /// Shared view of the recorded messages, usable after the notifier has
    /// been boxed away.
    pub fn messages_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.messages.clone()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        match &self.failure {
            Some(details) => Err(anyhow!("{}", details)),
            None => Ok(()),
        }
    }
}
