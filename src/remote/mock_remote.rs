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

//! A [`RemoteHost`] serving files from memory, to be used in unit testing.

use super::RemoteHost;
use crate::artifact::ArtifactKind;
use crate::error::SyncError;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockRemote {
    files: BTreeMap<String, Vec<u8>>,
    unreachable: Option<String>,
    fetch_failure: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MockRemote {
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Self {
        MockRemote {
            files: files
                .into_iter()
                .map(|(name, content)| (name.to_string(), content.to_vec()))
                .collect(),
            ..Default::default()
        }
    }
    pub fn unreachable(details: &str) -> Self {
        MockRemote {
            unreachable: Some(details.to_string()),
            ..Default::default()
        }
    }
    pub fn failing_fetch(mut self, details: &str) -> Self {
        self.fetch_failure = Some(details.to_string());
        self
    }
    /// The operations invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RemoteHost for MockRemote {
    fn check_reachable(&self) -> Result<(), SyncError> {
        self.record("check_reachable".to_string());
        match &self.unreachable {
            Some(details) => Err(SyncError::Unreachable(details.clone())),
            None => Ok(()),
        }
    }
    fn list_certificates(&self) -> Result<Vec<String>, SyncError> {
        self.record("list_certificates".to_string());
        Ok(self.files.keys().cloned().collect())
    }
    fn fetch(&self, kind: ArtifactKind, dest: &Path) -> Result<usize, SyncError> {
        self.record(format!("fetch {}", kind.glob()));
        if let Some(details) = &self.fetch_failure {
            return Err(SyncError::Fetch(details.clone()));
        }
        let mut count = 0;
        for (name, content) in &self.files {
            if ArtifactKind::of(name) == Some(kind) {
                std::fs::write(dest.join(name), content)
                    .map_err(|e| SyncError::Fetch(e.to_string()))?;
                count += 1;
            }
        }
        Ok(count)
    }
}
