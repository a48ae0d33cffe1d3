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

use cert_sync::config::Config;
use cert_sync::notifier::Notifiers;
use cert_sync::remote::SshRemote;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(config.log_level);
    tracing::info!(
        "Starting certificate synchronization from {}:{} to {}",
        config.remote.host,
        config.remote.cert_location,
        config.local_cert_location.display()
    );
    let notifiers = Notifiers::from_channels(&config.channels);
    let remote = SshRemote::new(config.remote.clone());
    let outcome = cert_sync::sync::run(&remote, &notifiers, &config.local_cert_location);
    ExitCode::from(outcome.exit_code)
}
