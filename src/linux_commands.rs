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

use anyhow::{anyhow, Error, Result};
use std::path::Path;
use std::process::Command;

/// Options making `ssh` fail instead of prompting for a password or a host
/// key confirmation.
const SSH_BATCH_OPTIONS: [&str; 2] = ["-o", "BatchMode=yes"];

/// Executes a command, and returns the stdout as bytes.
///
/// A non-zero exit status is an error carrying the status and stderr.
pub fn execute(command: &mut Command) -> Result<Vec<u8>> {
    let output = command
        .output()
        .map_err(|e| Error::new(e).context(format!("Failed to execute {:?}", command)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "{:?} exited with {}: {}",
            command.get_program(),
            output.status,
            stderr.trim()
        ));
    }
    Ok(output.stdout)
}

/// Executes a command, and parses the stdout as a string.
pub fn execute_and_parse_stdout(command: &mut Command) -> Result<String> {
    let stdout = execute(command)?;
    String::from_utf8(stdout)
        .map_err(|e| Error::new(e).context("The stdout contains non-utf8 bytes."))
}

/// Quotes `s` for a POSIX shell on the remote side.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Opens and immediately closes a session, without allocating a terminal.
pub fn ssh_probe(destination: &str) -> Result<()> {
    execute(
        Command::new("ssh")
            .arg("-T")
            .args(SSH_BATCH_OPTIONS)
            .arg(destination)
            .arg("exit"),
    )?;
    Ok(())
}

/// Lists the entries of `remote_dir`, one name per line.
pub fn ssh_list_directory(destination: &str, remote_dir: &str) -> Result<String> {
    execute_and_parse_stdout(
        Command::new("ssh")
            .args(SSH_BATCH_OPTIONS)
            .arg(destination)
            .arg(format!("cd {} && ls", shell_quote(remote_dir))),
    )
}

/// Copies every file matching `pattern` in `remote_dir` into `local_dir`,
/// keeping timestamps and permissions.
pub fn rsync_fetch(
    destination: &str,
    remote_dir: &str,
    pattern: &str,
    local_dir: &Path,
) -> Result<()> {
    execute(&mut rsync_command(destination, remote_dir, pattern, local_dir))?;
    Ok(())
}

/// `--protect-args` hands the remote path to rsync unsplit, so directories
/// with spaces work; the glob is still expanded by the remote rsync.
fn rsync_command(
    destination: &str,
    remote_dir: &str,
    pattern: &str,
    local_dir: &Path,
) -> Command {
    let source = format!(
        "{}:{}/{}",
        destination,
        remote_dir.trim_end_matches('/'),
        pattern
    );
    let mut target = local_dir.as_os_str().to_owned();
    target.push("/");
    let mut command = Command::new("rsync");
    command
        .arg("--archive")
        .arg("--protect-args")
        .arg("-e")
        .arg(format!("ssh {}", SSH_BATCH_OPTIONS.join(" ")))
        .arg(source)
        .arg(target);
    command
}
