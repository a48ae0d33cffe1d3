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

//! Keeps the TLS certificate of a reverse proxy in sync with a remote host.
//!
//! A run probes the remote host, fetches every `privkey<N>.pem` and
//! `fullchain<N>.pem`, promotes the highest version of each to
//! `privkey.pem` / `fullchain.pem`, and notifies the configured webhooks of
//! the new expiry date or of what went wrong.

pub mod artifact;
pub mod config;
pub mod error;
pub mod expiry;
pub mod linux_commands;
pub mod notifier;
pub mod remote;
pub mod rotator;
pub mod selector;
pub mod sync;

use std::future::Future;

/// Drives `future` to completion on a fresh single-threaded runtime.
pub fn tokio_block_on<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}
