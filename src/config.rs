// Copyright 2021 Google LLC
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

use crate::notifier::{Backend, Channel};
use anyhow::{anyhow, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::Level;
use url::Url;

/// Pulls the newest TLS certificate from a remote host into the directory
/// read by a reverse proxy.
///
/// Every option can also be given through the environment variable shown,
/// or through a `.env` file in the working directory.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Opts {
    /// Host name or address of the machine holding the certificates.
    #[clap(long, env = "REMOTE_URL", value_name = "HOST")]
    remote_url: String,
    /// User to log in as on the remote host.
    #[clap(long, env = "REMOTE_USER", default_value = "root")]
    remote_user: String,
    /// Directory on the remote host containing privkey<N>.pem and
    /// fullchain<N>.pem.
    #[clap(long, env = "REMOTE_CERT_LOCATION", value_name = "DIR")]
    remote_cert_location: String,
    /// Local directory read by the reverse proxy. Its content is replaced on
    /// every run.
    #[clap(long, env = "LOCAL_CERT_LOCATION", value_name = "DIR")]
    local_cert_location: PathBuf,
    /// Notification backend, either "apprise" or "discord".
    #[clap(long, env = "NOTIFICATION_SERVICE", value_name = "BACKEND")]
    notification_service: Option<String>,
    #[clap(long, env = "WEBHOOK_URL", value_name = "URL")]
    webhook_url: Option<String>,
    /// Apprise tag to notify; defaults to "all".
    #[clap(long, env = "APPRISE_TAG", value_name = "TAG")]
    apprise_tag: Option<String>,
    /// Additional notification channel; may be repeated.
    #[clap(long = "channel", value_name = "BACKEND=URL")]
    channels: Vec<String>,
    /// Log level: "debug", "info" or "error".
    #[clap(long, env = "VERBOSE", value_name = "LEVEL")]
    verbose: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfig {
    pub user: String,
    pub host: String,
    pub cert_location: String,
}

impl RemoteConfig {
    /// `user@host`, as understood by `ssh` and `rsync`.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

#[derive(Debug)]
pub struct Config {
    pub remote: RemoteConfig,
    pub local_cert_location: PathBuf,
    pub channels: Vec<Channel>,
    pub log_level: Level,
}

impl Config {
    /// Loads `.env`, then the command line and environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Config::from_args(std::env::args_os())
    }

    /// Parses `args` and the environment.
    ///
    /// A missing or malformed setting is returned as an error; only `--help`
    /// and `--version` exit from here.
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let opts = match Opts::try_parse_from(args) {
            Ok(opts) => opts,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                e.exit()
            }
            Err(e) => return Err(anyhow!(e)),
        };
        Config::try_from(opts)
    }
}

impl TryFrom<Opts> for Config {
    type Error = anyhow::Error;
    fn try_from(opts: Opts) -> Result<Self> {
        if opts.remote_url.trim().is_empty() {
            return Err(anyhow!("REMOTE_URL must not be empty"));
        }
        if opts.remote_cert_location.trim().is_empty() {
            return Err(anyhow!("REMOTE_CERT_LOCATION must not be empty"));
        }
        if opts.local_cert_location.as_os_str().is_empty() {
            return Err(anyhow!("LOCAL_CERT_LOCATION must not be empty"));
        }
        let mut channels = vec![];
        match (&opts.notification_service, &opts.webhook_url) {
            (Some(service), Some(url)) if !url.is_empty() => {
                match Backend::from_identifier(service, opts.apprise_tag.clone()) {
                    Some(backend) => {
                        channels.push(Channel::new(backend, parse_webhook_url(url)?))
                    }
                    None => tracing::debug!("Unknown notification service {:?}", service),
                }
            }
            _ => (),
        }
        for channel in &opts.channels {
            let (service, url) = channel.split_once('=').ok_or_else(|| {
                anyhow!(r#"Channel "{}" is not of the form BACKEND=URL"#, channel)
            })?;
            let backend = Backend::from_identifier(service, opts.apprise_tag.clone())
                .ok_or_else(|| anyhow!(r#"Unknown notification backend "{}""#, service))?;
            channels.push(Channel::new(backend, parse_webhook_url(url)?));
        }
        Ok(Config {
            remote: RemoteConfig {
                user: opts.remote_user,
                host: opts.remote_url,
                cert_location: opts.remote_cert_location,
            },
            local_cert_location: opts.local_cert_location,
            channels,
            log_level: parse_log_level(opts.verbose.as_deref()),
        })
    }
}

fn parse_webhook_url(url: &str) -> Result<Url> {
    let parsed =
        Url::parse(url).map_err(|e| anyhow!(r#"Invalid webhook URL "{}": {}"#, url, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(anyhow!(
            r#"Webhook URL "{}" must be http or https, not {}"#,
            url,
            scheme
        )),
    }
}

/// `debug` and `info` select their level; anything else, including no value,
/// logs errors only.
pub fn parse_log_level(verbose: Option<&str>) -> Level {
    match verbose.map(str::to_ascii_lowercase).as_deref() {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        _ => Level::ERROR,
    }
}
