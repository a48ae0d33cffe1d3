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

use crate::artifact::{parse_version, ArtifactKind, ArtifactName};
use crate::error::SyncError;

/// The versioned files chosen for promotion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificatePair {
    pub private_key: ArtifactName,
    pub full_chain: ArtifactName,
}

impl CertificatePair {
    pub fn get(&self, kind: ArtifactKind) -> &ArtifactName {
        match kind {
            ArtifactKind::PrivateKey => &self.private_key,
            ArtifactKind::FullChain => &self.full_chain,
        }
    }
}

/// Picks the highest-numbered file of `kind` among `entries`.
///
/// Every entry mentioning the kind's prefix takes part, except the
/// canonical name itself. A single entry whose version does not parse fails
/// the whole selection.
pub fn select_latest<S: AsRef<str>>(
    entries: &[S],
    kind: ArtifactKind,
) -> Result<ArtifactName, SyncError> {
    let canonical = kind.canonical_name();
    let mut latest: Option<u64> = None;
    for entry in entries {
        let entry: &str = entry.as_ref();
        if !entry.contains(kind.prefix()) || entry == canonical {
            continue;
        }
        let version = parse_version(entry, kind).map_err(SyncError::Selection)?;
        latest = latest.max(Some(version));
    }
    let version = latest.ok_or_else(|| {
        SyncError::Selection(format!(
            r#"No "{}" file found among {} entries"#,
            kind.glob(),
            entries.len()
        ))
    })?;
    Ok(ArtifactName::versioned(kind, version))
}

/// Runs [`select_latest`] independently for both kinds.
///
/// The two versions are not checked against each other; a mismatch is only
/// logged.
pub fn select_pair<S: AsRef<str>>(entries: &[S]) -> Result<CertificatePair, SyncError> {
    let private_key = select_latest(entries, ArtifactKind::PrivateKey)?;
    tracing::debug!("Found latest privkey: {}", private_key);
    let full_chain = select_latest(entries, ArtifactKind::FullChain)?;
    tracing::debug!("Found latest fullchain: {}", full_chain);
    if private_key.version != full_chain.version {
        tracing::warn!(
            "Selected {} and {} come from different versions; they may not belong to the same issuance",
            private_key,
            full_chain
        );
    }
    Ok(CertificatePair {
        private_key,
        full_chain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn picks_maximum_version() {
        let entries = ["fullchain3.pem", "fullchain10.pem", "fullchain9.pem"];
        assert_eq!(
            select_latest(&entries, ArtifactKind::FullChain).unwrap().name,
            "fullchain10.pem"
        );
    }
    #[test]
    fn numeric_not_lexicographic() {
        let entries = ["privkey2.pem", "privkey11.pem", "privkey100.pem", "privkey0.pem"];
        let latest = select_latest(&entries, ArtifactKind::PrivateKey).unwrap();
        assert_eq!(latest.name, "privkey100.pem");
        assert_eq!(latest.version, Some(100));
    }
    #[test]
    fn ignores_other_kind_and_canonical() {
        let entries = [
            "privkey.pem",
            "privkey4.pem",
            "fullchain.pem",
            "fullchain8.pem",
            "cert8.pem",
        ];
        assert_eq!(
            select_latest(&entries, ArtifactKind::PrivateKey).unwrap().name,
            "privkey4.pem"
        );
        assert_eq!(
            select_latest(&entries, ArtifactKind::FullChain).unwrap().name,
            "fullchain8.pem"
        );
    }
    #[test]
    fn empty_candidates_fail() {
        let entries = ["fullchain1.pem", "privkey.pem"];
        assert!(matches!(
            select_latest(&entries, ArtifactKind::PrivateKey),
            Err(SyncError::Selection(_))
        ));
        let none: [&str; 0] = [];
        assert!(select_latest(&none, ArtifactKind::FullChain).is_err());
    }
    #[test]
    fn malformed_candidate_fails() {
        let entries = ["privkey1.pem", "privkey2.pem", "privkey-backup.pem"];
        assert!(matches!(
            select_latest(&entries, ArtifactKind::PrivateKey),
            Err(SyncError::Selection(_))
        ));
        let entries = ["privkey1.pem", "old-privkey9.pem"];
        assert!(select_latest(&entries, ArtifactKind::PrivateKey).is_err());
    }
    #[test]
    fn pair_selected_independently() {
        let entries = [
            "privkey1.pem",
            "privkey2.pem",
            "fullchain1.pem",
            "fullchain2.pem",
            "fullchain5.pem",
        ];
        let pair = select_pair(&entries).unwrap();
        assert_eq!(pair.private_key.name, "privkey2.pem");
        assert_eq!(pair.full_chain.name, "fullchain5.pem");
        assert_eq!(pair.get(ArtifactKind::FullChain).version, Some(5));
    }
}
