// SPDX-License-Identifier: GPL-3.0-only

//! Signature and filesystem metadata lookups via `blkid`
//!
//! blkid exits 2 when it ran but found nothing to report. That status is the
//! only one read as "no signature"; every other failure (unreadable device,
//! permissions, bad usage) stays an error so a disk is never mistaken for
//! blank because the probe could not look at it.

use std::collections::BTreeMap;

use datavol_types::SignatureProbe;
use uuid::Uuid;

use crate::error::{Result, SysError};
use crate::runner::{CommandOutput, CommandSpec};

/// blkid exit status for "no identifiable token or device"
pub const EXIT_NOTHING_FOUND: i32 = 2;

/// Keys that identify a signature in `blkid -p -o export` output, in priority order
const SIGNATURE_KEYS: &[&str] = &["TYPE", "PTTYPE"];

pub fn probe_command(device: &str) -> CommandSpec {
    CommandSpec::new("blkid").args(["-p", "-o", "export", device])
}

pub fn tag_command(device: &str, tag: &str) -> CommandSpec {
    CommandSpec::new("blkid").args(["-o", "value", "-s", tag, device])
}

fn command_failed(spec: &CommandSpec, output: &CommandOutput) -> SysError {
    SysError::CommandFailed {
        command: spec.render(),
        status: output
            .status
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string()),
        stderr: output.stderr.trim().to_string(),
    }
}

/// `KEY=value` lines from `blkid -o export`
pub fn parse_export(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

pub fn interpret_probe(spec: &CommandSpec, output: &CommandOutput) -> Result<SignatureProbe> {
    match output.status {
        Some(0) => {
            let tags = parse_export(&output.stdout);
            Ok(SIGNATURE_KEYS
                .iter()
                .find_map(|key| tags.get(*key))
                .map(|value| SignatureProbe::Signature(value.clone()))
                .unwrap_or_else(|| {
                    // Some other tag was reported (e.g. only a PTUUID); still not blank
                    let summary = tags.keys().cloned().collect::<Vec<_>>().join(",");
                    SignatureProbe::Signature(format!("unknown ({summary})"))
                }))
        }
        Some(EXIT_NOTHING_FOUND) => Ok(SignatureProbe::NoSignature),
        _ => Err(command_failed(spec, output)),
    }
}

/// Single tag value; `None` when blkid found nothing
pub fn interpret_tag(spec: &CommandSpec, output: &CommandOutput) -> Result<Option<String>> {
    match output.status {
        Some(0) => Ok(Some(output.stdout.trim().to_string()).filter(|value| !value.is_empty())),
        Some(EXIT_NOTHING_FOUND) => Ok(None),
        _ => Err(command_failed(spec, output)),
    }
}

pub fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|e| SysError::parse("filesystem UUID", e.to_string()))
}
