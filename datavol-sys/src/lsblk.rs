// SPDX-License-Identifier: GPL-3.0-only

//! Block device enumeration via `lsblk --json`

use serde::Deserialize;

use datavol_types::BlockDevice;

use crate::error::{Result, SysError};
use crate::runner::CommandSpec;

/// Mount points that mark a device tree as hosting the running system
const SYSTEM_MOUNT_POINTS: &[&str] = &["/", "/boot", "/boot/efi", "[SWAP]"];

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<LsblkNode>,
}

#[derive(Debug, Deserialize)]
struct LsblkNode {
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<SizeField>,
    #[serde(default)]
    mountpoint: Option<String>,
    #[serde(default)]
    mountpoints: Vec<Option<String>>,
    #[serde(default)]
    children: Vec<LsblkNode>,
}

/// Older util-linux releases print every JSON value as a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeField {
    Number(u64),
    Text(String),
}

impl SizeField {
    fn bytes(&self) -> u64 {
        match self {
            SizeField::Number(value) => *value,
            SizeField::Text(value) => value.trim().parse().unwrap_or(0),
        }
    }
}

impl LsblkNode {
    fn mount_points(&self) -> impl Iterator<Item = &str> {
        self.mountpoint
            .as_deref()
            .into_iter()
            .chain(self.mountpoints.iter().filter_map(|mp| mp.as_deref()))
    }

    fn hosts_system(&self) -> bool {
        self.mount_points()
            .any(|mp| SYSTEM_MOUNT_POINTS.contains(&mp))
            || self.children.iter().any(LsblkNode::hosts_system)
    }
}

pub fn list_command() -> CommandSpec {
    CommandSpec::new("lsblk").args([
        "--json",
        "--bytes",
        "--output",
        "NAME,PATH,TYPE,SIZE,MOUNTPOINT",
    ])
}

/// Top-level devices from `lsblk --json` output, sorted by path
pub fn parse_lsblk(output: &str) -> Result<Vec<BlockDevice>> {
    let parsed: LsblkOutput =
        serde_json::from_str(output).map_err(|e| SysError::parse("lsblk output", e.to_string()))?;

    let mut devices: Vec<BlockDevice> = parsed
        .blockdevices
        .iter()
        .map(|node| BlockDevice {
            name: node.name.clone(),
            path: node
                .path
                .clone()
                .unwrap_or_else(|| format!("/dev/{}", node.name)),
            kind: node.kind.clone(),
            size: node.size.as_ref().map(SizeField::bytes).unwrap_or(0),
            is_system: node.hosts_system(),
        })
        .collect();

    devices.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(devices)
}
