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

//! One synchronization run, from the reachability probe to the final
//! notification.

use crate::artifact::ArtifactKind;
use crate::error::SyncError;
use crate::expiry::{read_expiry, ExpiryInfo};
use crate::notifier::{notify_best_effort, Notifier};
use crate::remote::{count_certificates, RemoteHost};
use crate::rotator;
use crate::selector::{select_pair, CertificatePair};
use std::path::Path;

/// What a finished run reports back to the process.
#[derive(Debug)]
pub struct Outcome {
    pub exit_code: u8,
    pub message: String,
}

/// Everything a successful run produced.
#[derive(Debug)]
pub struct Synchronized {
    pub pair: CertificatePair,
    pub expiry: ExpiryInfo,
}

pub fn success_message(expiry: &ExpiryInfo) -> String {
    format!("Grabbed new Let's Encrypt certificates, expire on {}", expiry)
}

/// Runs the steps in order, stopping at the first failure.
///
/// The local directory is only cleared once the remote host has answered and
/// offered at least one certificate.
pub fn synchronize(
    remote: &dyn RemoteHost,
    local_dir: &Path,
) -> Result<Synchronized, SyncError> {
    remote.check_reachable()?;

    let listed = remote.list_certificates()?;
    let found = count_certificates(&listed);
    // A private key and a full chain make one pair.
    tracing::debug!("Got {} certificates from remote", found / 2);
    if found == 0 {
        return Err(SyncError::EmptyRemote);
    }

    rotator::clear_directory(local_dir)?;
    for kind in ArtifactKind::ALL {
        let count = remote.fetch(kind, local_dir)?;
        tracing::debug!("Fetched {} {} files", count, kind);
    }

    tracing::info!(
        "Sorting by latest certificate and replace existing cert at {}",
        local_dir.display()
    );
    let entries = rotator::list_directory(local_dir)?;
    let pair = select_pair(&entries)?;
    rotator::promote(&pair, local_dir)?;

    let expiry = read_expiry(&local_dir.join(ArtifactKind::FullChain.canonical_name()))?;
    Ok(Synchronized { pair, expiry })
}

/// Runs [`synchronize`] and reports its result exactly once.
///
/// This is the only place that notifies and decides the exit status. A
/// failed notification is logged and does not change the status.
pub fn run(remote: &dyn RemoteHost, notifier: &dyn Notifier, local_dir: &Path) -> Outcome {
    let outcome = match synchronize(remote, local_dir) {
        Ok(synchronized) => Outcome {
            exit_code: 0,
            message: success_message(&synchronized.expiry),
        },
        Err(e) => {
            tracing::error!("{}", e);
            Outcome {
                exit_code: e.exit_code(),
                message: e.to_string(),
            }
        }
    };
    notify_best_effort(notifier, &outcome.message);
    outcome
}
