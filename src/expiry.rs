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

use crate::error::SyncError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use std::path::Path;

/// ASN.1 GeneralizedTime as printed by `openssl x509 -enddate`-style tools.
pub const COMPACT_TIME_FORMAT: &str = "%Y%m%d%H%M%SZ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpiryInfo {
    pub not_after: DateTime<Utc>,
}

impl ExpiryInfo {
    /// Renders the expiry in the compact `YYYYMMDDHHMMSSZ` form.
    pub fn compact(&self) -> String {
        self.not_after.format(COMPACT_TIME_FORMAT).to_string()
    }
}

impl fmt::Display for ExpiryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.not_after.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

/// Parses a `YYYYMMDDHHMMSSZ` timestamp as UTC.
pub fn parse_compact_time(text: &str) -> Result<DateTime<Utc>, SyncError> {
    NaiveDateTime::parse_from_str(text, COMPACT_TIME_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| SyncError::Parse(format!(r#"Invalid timestamp "{}": {}"#, text, e)))
}

/// Returns the DER of the first `expected_tag` block, which for a full chain
/// is the leaf certificate.
fn get_der_from_pem(pem_text: &[u8], expected_tag: &str) -> Result<Vec<u8>, SyncError> {
    let blocks = pem::parse_many(pem_text).map_err(|e| SyncError::Parse(e.to_string()))?;
    blocks
        .into_iter()
        .find(|block| block.tag == expected_tag)
        .map(|block| block.contents)
        .ok_or_else(|| {
            SyncError::Parse(format!(
                r#"The PEM file does not contain a "{}" block"#,
                expected_tag
            ))
        })
}

/// Reads the "not valid after" field of the leaf certificate in a PEM
/// encoded full chain.
pub fn parse_expiry(pem_text: &[u8]) -> Result<ExpiryInfo, SyncError> {
    let der = get_der_from_pem(pem_text, "CERTIFICATE")?;
    let (_, cert) = x509_parser::parse_x509_certificate(&der)
        .map_err(|e| SyncError::Parse(format!("Invalid leaf certificate: {}", e)))?;
    let not_after = Utc
        .timestamp_opt(cert.validity().not_after.timestamp(), 0)
        .single()
        .ok_or_else(|| {
            SyncError::Parse("Failed to get expiration date from the certificate".into())
        })?;
    Ok(ExpiryInfo { not_after })
}

pub fn read_expiry(fullchain_path: &Path) -> Result<ExpiryInfo, SyncError> {
    let pem_text = std::fs::read(fullchain_path)
        .map_err(|e| SyncError::io("read", fullchain_path, e))?;
    let expiry = parse_expiry(&pem_text)?;
    tracing::debug!("notAfter={}", expiry.compact());
    tracing::info!(
        "Certificate {} will expire on: {}",
        fullchain_path.display(),
        expiry
    );
    Ok(expiry)
}
