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

//! Filesystem side of a run: emptying the local certificate directory,
//! promoting the selected files to their canonical names and dropping
//! everything else.

use crate::artifact::ArtifactKind;
use crate::error::SyncError;
use crate::selector::CertificatePair;
use std::fs;
use std::path::Path;

/// Returns the names of all entries in `dir`, sorted.
pub fn list_directory(dir: &Path) -> Result<Vec<String>, SyncError> {
    let mut names = vec![];
    for entry in fs::read_dir(dir).map_err(|e| SyncError::io("read directory", dir, e))? {
        let entry = entry.map_err(|e| SyncError::io("read directory", dir, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn remove_entry(path: &Path) -> std::io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Removes every entry of `dir` and returns what was removed.
pub fn clear_directory(dir: &Path) -> Result<Vec<String>, SyncError> {
    let names = list_directory(dir)?;
    tracing::info!("Removing {} files from {}", names.len(), dir.display());
    tracing::debug!("Removing {:?}", names);
    for name in &names {
        let path = dir.join(name);
        remove_entry(&path).map_err(|e| SyncError::io("remove", path, e))?;
    }
    Ok(names)
}

/// Copies the selected files to `privkey.pem` and `fullchain.pem`, then
/// deletes everything else in `dir`.
///
/// Each canonical file is first written under a hidden temporary name and
/// renamed into place. The versioned sources stay untouched until both
/// canonical files exist.
pub fn promote(pair: &CertificatePair, dir: &Path) -> Result<(), SyncError> {
    tracing::info!(
        "Promoting {} and {} in {}",
        pair.private_key,
        pair.full_chain,
        dir.display()
    );
    for kind in ArtifactKind::ALL {
        copy_to_canonical(&dir.join(&pair.get(kind).name), dir, kind)?;
    }
    let removed = remove_stale(dir);
    tracing::info!("Removed {} stale files", removed);
    Ok(())
}

fn copy_to_canonical(source: &Path, dir: &Path, kind: ArtifactKind) -> Result<(), SyncError> {
    let canonical = dir.join(kind.canonical_name());
    let staging = dir.join(format!(".{}.tmp", kind.canonical_name()));
    let result = stage(source, &staging, kind)
        .and_then(|()| {
            fs::rename(&staging, &canonical).map_err(|e| SyncError::io("rename", &staging, e))
        });
    if result.is_err() {
        if let Err(e) = fs::remove_file(&staging) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", staging.display(), e);
            }
        }
    }
    result?;
    tracing::debug!("Copied {} to {}", source.display(), canonical.display());
    Ok(())
}

fn stage(source: &Path, staging: &Path, kind: ArtifactKind) -> Result<(), SyncError> {
    // `fs::copy` carries the permission bits over, so the copy may be
    // read-only. Setting timestamps only needs ownership.
    fs::copy(source, staging).map_err(|e| SyncError::io("copy", source, e))?;
    let metadata = fs::metadata(source).map_err(|e| SyncError::io("inspect", source, e))?;
    if let Ok(modified) = metadata.modified() {
        fs::File::open(staging)
            .and_then(|file| file.set_modified(modified))
            .map_err(|e| SyncError::io("set modification time of", staging, e))?;
    }
    #[cfg(unix)]
    {
        if kind == ArtifactKind::PrivateKey {
            restrict_to_owner(staging)?;
        }
    }
    #[cfg(not(unix))]
    let _ = kind;
    Ok(())
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<(), SyncError> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)
        .map_err(|e| SyncError::io("inspect", path, e))?
        .permissions();
    if permissions.mode() & 0o077 != 0 {
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)
            .map_err(|e| SyncError::io("restrict permissions of", path, e))?;
    }
    Ok(())
}

/// Deletes every entry of `dir` other than the canonical pair.
///
/// Best effort: a file that cannot be removed is logged and skipped.
/// Returns the number of entries removed.
pub fn remove_stale(dir: &Path) -> usize {
    let keep = ArtifactKind::ALL.map(ArtifactKind::canonical_name);
    let names = match list_directory(dir) {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!("Skipping cleanup: {}", e);
            return 0;
        }
    };
    let stale: Vec<_> = names
        .into_iter()
        .filter(|name| !keep.contains(name))
        .collect();
    tracing::info!("Remove everything but latest privkey and fullchain");
    tracing::debug!("Removing {:?}", stale);
    let mut removed = 0;
    for name in stale {
        let path = dir.join(&name);
        match remove_entry(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactName;
    use tempfile::TempDir;

    fn populate(dir: &Path, files: &[(&str, &str)]) {
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
    }

    fn pair(private_key: u64, full_chain: u64) -> CertificatePair {
        CertificatePair {
            private_key: ArtifactName::versioned(ArtifactKind::PrivateKey, private_key),
            full_chain: ArtifactName::versioned(ArtifactKind::FullChain, full_chain),
        }
    }

    #[test]
    fn clear_removes_everything() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), &[("privkey.pem", "a"), ("fullchain.pem", "b")]);
        fs::create_dir(dir.path().join("archive")).unwrap();
        fs::write(dir.path().join("archive").join("old.pem"), "c").unwrap();
        let removed = clear_directory(dir.path()).unwrap();
        assert_eq!(removed, vec!["archive", "fullchain.pem", "privkey.pem"]);
        assert!(list_directory(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn clear_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            clear_directory(&missing),
            Err(SyncError::Io { .. })
        ));
    }

    #[test]
    fn promote_leaves_only_canonical_pair() {
        let dir = TempDir::new().unwrap();
        populate(
            dir.path(),
            &[
                ("privkey1.pem", "key one"),
                ("privkey2.pem", "key two"),
                ("fullchain1.pem", "chain one"),
                ("fullchain2.pem", "chain two"),
                ("fullchain5.pem", "chain five"),
            ],
        );
        promote(&pair(2, 5), dir.path()).unwrap();
        assert_eq!(
            list_directory(dir.path()).unwrap(),
            vec!["fullchain.pem", "privkey.pem"]
        );
        assert_eq!(
            fs::read(dir.path().join("privkey.pem")).unwrap(),
            b"key two"
        );
        assert_eq!(
            fs::read(dir.path().join("fullchain.pem")).unwrap(),
            b"chain five"
        );
    }

    #[test]
    fn promote_replaces_existing_canonical_files() {
        let dir = TempDir::new().unwrap();
        populate(
            dir.path(),
            &[
                ("privkey.pem", "stale key"),
                ("fullchain.pem", "stale chain"),
                ("privkey3.pem", "fresh key"),
                ("fullchain3.pem", "fresh chain"),
            ],
        );
        promote(&pair(3, 3), dir.path()).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("privkey.pem")).unwrap(),
            "fresh key"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("fullchain.pem")).unwrap(),
            "fresh chain"
        );
    }

    #[test]
    fn promote_keeps_sources_when_copy_fails() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), &[("privkey1.pem", "key")]);
        // fullchain1.pem is missing.
        assert!(promote(&pair(1, 1), dir.path()).is_err());
        assert!(dir.path().join("privkey1.pem").exists());
    }

    #[test]
    fn promote_preserves_modification_time() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), &[("privkey1.pem", "key"), ("fullchain1.pem", "chain")]);
        let past =
            std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_600_000_000);
        fs::File::options()
            .write(true)
            .open(dir.path().join("fullchain1.pem"))
            .unwrap()
            .set_modified(past)
            .unwrap();
        promote(&pair(1, 1), dir.path()).unwrap();
        let modified = fs::metadata(dir.path().join("fullchain.pem"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(modified, past);
    }

    #[cfg(unix)]
    #[test]
    fn promote_restricts_private_key() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        populate(dir.path(), &[("privkey1.pem", "key"), ("fullchain1.pem", "chain")]);
        fs::set_permissions(
            dir.path().join("privkey1.pem"),
            fs::Permissions::from_mode(0o644),
        )
        .unwrap();
        fs::set_permissions(
            dir.path().join("fullchain1.pem"),
            fs::Permissions::from_mode(0o644),
        )
        .unwrap();
        promote(&pair(1, 1), dir.path()).unwrap();
        let mode = |name: &str| {
            fs::metadata(dir.path().join(name))
                .unwrap()
                .permissions()
                .mode()
                & 0o777
        };
        assert_eq!(mode("privkey.pem"), 0o600);
        assert_eq!(mode("fullchain.pem"), 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn promote_keeps_read_only_private_key() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        populate(dir.path(), &[("privkey1.pem", "key"), ("fullchain1.pem", "chain")]);
        fs::set_permissions(
            dir.path().join("privkey1.pem"),
            fs::Permissions::from_mode(0o400),
        )
        .unwrap();
        promote(&pair(1, 1), dir.path()).unwrap();
        assert_eq!(
            list_directory(dir.path()).unwrap(),
            vec!["fullchain.pem", "privkey.pem"]
        );
        let mode = fs::metadata(dir.path().join("privkey.pem"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o400);
        assert_eq!(fs::read_to_string(dir.path().join("privkey.pem")).unwrap(), "key");
    }

    #[test]
    fn failed_promotion_removes_staging_file() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), &[("privkey1.pem", "key"), ("fullchain1.pem", "chain")]);
        // A non-empty directory in the way makes the rename fail.
        fs::create_dir(dir.path().join("privkey.pem")).unwrap();
        fs::write(dir.path().join("privkey.pem").join("blocker"), "x").unwrap();
        assert!(matches!(
            promote(&pair(1, 1), dir.path()),
            Err(SyncError::Io { context: "rename", .. })
        ));
        assert!(!dir.path().join(".privkey.pem.tmp").exists());
        assert!(dir.path().join("privkey1.pem").exists());
    }

    #[test]
    fn remove_stale_counts_removed_entries() {
        let dir = TempDir::new().unwrap();
        populate(
            dir.path(),
            &[
                ("privkey.pem", "k"),
                ("fullchain.pem", "c"),
                ("privkey1.pem", "k1"),
                ("notes.txt", "n"),
            ],
        );
        assert_eq!(remove_stale(dir.path()), 2);
        assert_eq!(
            list_directory(dir.path()).unwrap(),
            vec!["fullchain.pem", "privkey.pem"]
        );
    }
}
