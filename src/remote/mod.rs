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
pub mod mock_remote;

use crate::artifact::{ArtifactKind, ArtifactName};
use crate::config::RemoteConfig;
use crate::error::SyncError;
use crate::linux_commands::{rsync_fetch, ssh_list_directory, ssh_probe};
use std::path::Path;

/// An interface for reaching the host that holds the certificates.
pub trait RemoteHost {
    /// Fails with [`SyncError::Unreachable`] when the host cannot be reached
    /// without interaction.
    fn check_reachable(&self) -> Result<(), SyncError>;
    /// Names found in the remote certificate directory.
    fn list_certificates(&self) -> Result<Vec<String>, SyncError>;
    /// Copies every remote file of `kind` into `dest` and returns how many
    /// files of that kind `dest` now holds.
    fn fetch(&self, kind: ArtifactKind, dest: &Path) -> Result<usize, SyncError>;
}

/// Number of names in `entries` that are a private key or a full chain.
pub fn count_certificates<S: AsRef<str>>(entries: &[S]) -> usize {
    entries
        .iter()
        .filter(|name| {
            let name: &str = name.as_ref();
            ArtifactName::parse(name).kind.is_some()
        })
        .count()
}

fn count_of_kind(dest: &Path, kind: ArtifactKind) -> Result<usize, SyncError> {
    Ok(crate::rotator::list_directory(dest)?
        .iter()
        .filter(|name| ArtifactKind::of(name) == Some(kind))
        .count())
}

/// A [`RemoteHost`] driven by the `ssh` and `rsync` binaries.
pub struct SshRemote {
    config: RemoteConfig,
}

impl SshRemote {
    pub fn new(config: RemoteConfig) -> Self {
        SshRemote { config }
    }
}

impl RemoteHost for SshRemote {
    fn check_reachable(&self) -> Result<(), SyncError> {
        ssh_probe(&self.config.destination())
            .map_err(|e| SyncError::Unreachable(format!("{:#}", e)))
    }
    fn list_certificates(&self) -> Result<Vec<String>, SyncError> {
        let stdout = ssh_list_directory(&self.config.destination(), &self.config.cert_location)
            .map_err(|e| SyncError::ListFailed(format!("{:#}", e)))?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }
    fn fetch(&self, kind: ArtifactKind, dest: &Path) -> Result<usize, SyncError> {
        tracing::info!(
            "Rsync {} from {}:{}",
            kind.glob(),
            self.config.host,
            self.config.cert_location
        );
        rsync_fetch(
            &self.config.destination(),
            &self.config.cert_location,
            &kind.glob(),
            dest,
        )
        .map_err(|e| SyncError::Fetch(format!("{:#}", e)))?;
        count_of_kind(dest, kind)
    }
}
