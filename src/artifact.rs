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

//! Names of the certificate files moved around by a run.
//!
//! The remote host keeps point-in-time copies such as `privkey3.pem` and
//! `fullchain12.pem`; the reverse proxy only reads the unnumbered
//! `privkey.pem` and `fullchain.pem`.

use std::fmt;

pub const PEM_SUFFIX: &str = ".pem";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    PrivateKey,
    FullChain,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::PrivateKey, ArtifactKind::FullChain];

    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::PrivateKey => "privkey",
            ArtifactKind::FullChain => "fullchain",
        }
    }
    /// The file name the reverse proxy reads, e.g. `privkey.pem`.
    pub fn canonical_name(self) -> String {
        format!("{}{}", self.prefix(), PEM_SUFFIX)
    }
    /// The shell glob matching every copy of this kind on the remote host.
    pub fn glob(self) -> String {
        format!("{}*{}", self.prefix(), PEM_SUFFIX)
    }
    pub fn versioned_name(self, version: u64) -> String {
        format!("{}{}{}", self.prefix(), version, PEM_SUFFIX)
    }
    pub fn of(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| name.starts_with(kind.prefix()))
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::PrivateKey => write!(f, "private key"),
            ArtifactKind::FullChain => write!(f, "full chain"),
        }
    }
}

/// A file name together with what could be read out of it.
///
/// `kind` is `None` for names that are neither a private key nor a full
/// chain; `version` is `None` for the canonical names and for anything
/// whose numeric part does not parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactName {
    pub name: String,
    pub kind: Option<ArtifactKind>,
    pub version: Option<u64>,
}

impl ArtifactName {
    pub fn parse(name: &str) -> Self {
        let kind = ArtifactKind::of(name);
        let version = kind.and_then(|kind| parse_version(name, kind).ok());
        ArtifactName {
            name: name.to_string(),
            kind,
            version,
        }
    }
    pub fn versioned(kind: ArtifactKind, version: u64) -> Self {
        ArtifactName {
            name: kind.versioned_name(version),
            kind: Some(kind),
            version: Some(version),
        }
    }
    pub fn is_canonical(&self) -> bool {
        self.kind
            .map_or(false, |kind| self.name == kind.canonical_name())
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Strips `<prefix>` and `.pem` from `name` and reads what is left as the
/// version number.
pub fn parse_version(name: &str, kind: ArtifactKind) -> Result<u64, String> {
    let number = name
        .strip_prefix(kind.prefix())
        .and_then(|rest| rest.strip_suffix(PEM_SUFFIX))
        .ok_or_else(|| {
            format!(
                r#""{}" is not of the form "{}<N>{}""#,
                name,
                kind.prefix(),
                PEM_SUFFIX
            )
        })?;
    // `u64::from_str` accepts a leading '+', which no real file carries.
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!(r#""{}" does not carry a numeric version"#, name));
    }
    number
        .parse()
        .map_err(|e| format!(r#"Version of "{}" is out of range: {}"#, name, e))
}
