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

use std::path::PathBuf;
use thiserror::Error;

/// Every way a synchronization run can end early.
///
/// The `Display` text is what gets delivered to the notification channels,
/// so each variant carries the underlying diagnostic.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote host is not reachable: {0}")]
    Unreachable(String),
    #[error("Failed to list remote certificates: {0}")]
    ListFailed(String),
    #[error("Cert location does not have any certificate, exiting")]
    EmptyRemote,
    #[error("Error while running rsync: {0}")]
    Fetch(String),
    #[error("Failed to select the latest certificate: {0}")]
    Selection(String),
    #[error("Failed to {context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Certificate failed parsing: {0}")]
    Parse(String),
}

impl SyncError {
    pub(crate) fn io(
        context: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        SyncError::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// `EmptyRemote` exits with 0, everything else with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::EmptyRemote => 0,
            _ => 1,
        }
    }
}
