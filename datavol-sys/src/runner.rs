// SPDX-License-Identifier: GPL-3.0-only

//! Command execution seam
//!
//! Every host tool invocation goes through a [`CommandRunner`]. The local
//! runner executes on this machine; the SSH runner executes each command on
//! the target host with elevated privilege.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};
use which::which;

use crate::error::{Result, SysError};

/// A single tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn render(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    fn status_label(&self) -> String {
        self.status
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string())
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `spec` to completion. A non-zero exit is not an error at this level.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs `spec` and fails on any non-zero exit.
pub async fn run_checked<R>(runner: &R, spec: &CommandSpec) -> Result<String>
where
    R: CommandRunner + ?Sized,
{
    let output = runner.run(spec).await?;
    if !output.success() {
        return Err(SysError::CommandFailed {
            command: spec.render(),
            status: output.status_label(),
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output.stdout)
}

async fn execute(mut command: Command, stdin: Option<&str>) -> Result<CommandOutput> {
    command
        .env("LC_ALL", "C")
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn()?;
    if let Some(input) = stdin
        && let Some(mut pipe) = child.stdin.take()
    {
        pipe.write_all(input.as_bytes()).await?;
    }

    let output = child.wait_with_output().await?;
    Ok(CommandOutput {
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Runs tools on the local machine
#[derive(Debug, Clone, Default)]
pub struct LocalRunner;

#[async_trait]
impl CommandRunner for LocalRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!("Running locally: {}", spec.render());
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        execute(command, spec.stdin.as_deref()).await
    }
}

/// Runs tools on a remote host over ssh, under `sudo -n`
#[derive(Debug, Clone)]
pub struct SshRunner {
    ssh_binary: PathBuf,
    identity: String,
    address: String,
    credential: PathBuf,
}

impl SshRunner {
    /// Returns an error if ssh is not installed or the credential is missing
    pub fn new(
        identity: impl Into<String>,
        address: impl Into<String>,
        credential: impl Into<PathBuf>,
    ) -> Result<Self> {
        let ssh_binary = which("ssh").map_err(|_| SysError::ToolMissing("ssh".to_string()))?;
        let credential = credential.into();
        if !credential.is_file() {
            return Err(SysError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("credential {} not found", credential.display()),
            )));
        }

        let runner = Self {
            ssh_binary,
            identity: identity.into(),
            address: address.into(),
            credential,
        };
        info!(
            "Using ssh at {:?} for {}@{}",
            runner.ssh_binary, runner.identity, runner.address
        );
        Ok(runner)
    }

    fn ssh_args(&self, spec: &CommandSpec) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.credential.display().to_string(),
            "-l".to_string(),
            self.identity.clone(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            self.address.clone(),
            "--".to_string(),
            remote_command(spec),
        ]
    }
}

#[async_trait]
impl CommandRunner for SshRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!("Running on {}: {}", self.address, spec.render());
        let mut command = Command::new(&self.ssh_binary);
        command.args(self.ssh_args(spec));
        execute(command, spec.stdin.as_deref()).await
    }
}

/// The remote shell line for `spec`
fn remote_command(spec: &CommandSpec) -> String {
    let mut words = vec![
        "sudo".to_string(),
        "-n".to_string(),
        "env".to_string(),
        "LC_ALL=C".to_string(),
        shell_quote(&spec.program),
    ];
    words.extend(spec.args.iter().map(|arg| shell_quote(arg)));
    words.join(" ")
}

fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
