// SPDX-License-Identifier: GPL-3.0-only

//! Mount table lookups (`findmnt`) and the persistent mount table (fstab)

use datavol_types::FstabEntry;

use crate::error::{Result, SysError};
use crate::runner::{CommandOutput, CommandSpec};

pub const FSTAB_PATH: &str = "/etc/fstab";

/// findmnt exit status when nothing matches
const FINDMNT_NO_MATCH: i32 = 1;

pub fn findmnt_source(mount_point: &str) -> CommandSpec {
    CommandSpec::new("findmnt").args([
        "--noheadings",
        "--first-only",
        "--output",
        "SOURCE",
        "--mountpoint",
        mount_point,
    ])
}

pub fn read_fstab() -> CommandSpec {
    CommandSpec::new("cat").arg(FSTAB_PATH)
}

pub fn append_fstab(entry: &FstabEntry) -> CommandSpec {
    CommandSpec::new("tee")
        .args(["-a", FSTAB_PATH])
        .stdin(format!("{}\n", render_fstab_line(entry)))
}

pub fn mkdir(mount_point: &str) -> CommandSpec {
    CommandSpec::new("mkdir").args(["-p", mount_point])
}

pub fn mount(mount_point: &str) -> CommandSpec {
    CommandSpec::new("mount").arg(mount_point)
}

/// Source device of a mount, `None` when nothing is mounted there
pub fn interpret_findmnt(spec: &CommandSpec, output: &CommandOutput) -> Result<Option<String>> {
    match output.status {
        Some(0) => Ok(output
            .stdout
            .lines()
            .map(strip_subvolume)
            .find(|source| !source.is_empty())
            .map(str::to_string)),
        Some(FINDMNT_NO_MATCH) => Ok(None),
        _ => Err(SysError::CommandFailed {
            command: spec.render(),
            status: output
                .status
                .map(|code| code.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            stderr: output.stderr.trim().to_string(),
        }),
    }
}

/// findmnt reports bind mounts and subvolumes as `/dev/x[/path]`
fn strip_subvolume(source: &str) -> &str {
    let source = source.trim();
    match source.find('[') {
        Some(index) => &source[..index],
        None => source,
    }
}

pub fn parse_fstab(input: &str) -> Result<Vec<FstabEntry>> {
    let mut entries = Vec::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(SysError::parse("fstab line", line));
        }

        entries.push(FstabEntry {
            spec: unescape_mount_field(fields[0]),
            mount_point: unescape_mount_field(fields[1]),
            fs_type: fields[2].to_string(),
            options: fields.get(3).copied().unwrap_or("defaults").to_string(),
            dump: fields.get(4).and_then(|v| v.parse().ok()).unwrap_or(0),
            pass: fields.get(5).and_then(|v| v.parse().ok()).unwrap_or(0),
        });
    }

    Ok(entries)
}

pub fn render_fstab_line(entry: &FstabEntry) -> String {
    format!(
        "{} {} {} {} {} {}",
        escape_mount_field(&entry.spec),
        escape_mount_field(&entry.mount_point),
        entry.fs_type,
        entry.options,
        entry.dump,
        entry.pass
    )
}

fn escape_mount_field(value: &str) -> String {
    value
        .replace('\\', "\\134")
        .replace(' ', "\\040")
        .replace('\t', "\\011")
}

/// Decodes `\NNN` octal escapes. Works on bytes so multi-byte UTF-8 and
/// escaped high bytes come back as the original characters.
fn unescape_mount_field(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'\\'
            && index + 3 < bytes.len()
            && bytes[index + 1..index + 4].iter().all(|b| (b'0'..=b'7').contains(b))
            && let Ok(byte) = u8::from_str_radix(&value[index + 1..index + 4], 8)
        {
            decoded.push(byte);
            index += 4;
            continue;
        }

        decoded.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fstab_skipping_comments() {
        let sample = "# /etc/fstab\nLABEL=cloudimg-rootfs / ext4 discard,errors=remount-ro 0 1\n\nUUID=3b5f0a0e-4c1d-4b8e-9f6a-2d7c8e9f0a1b /data ext4 defaults,nofail 0 2\n";
        let entries = parse_fstab(sample).expect("parse should succeed");
        assert_eq!(entries.len(), 2);
        assert!(entries[1].targets("/data"));
        assert!(entries[1].uuid().is_some());
    }

    #[test]
    fn fstab_fields_roundtrip_escaped_spaces() {
        let entry = FstabEntry {
            spec: "/dev/sdb".to_string(),
            mount_point: "/mnt/my data".to_string(),
            fs_type: "ext4".to_string(),
            options: "defaults".to_string(),
            dump: 0,
            pass: 2,
        };
        let line = render_fstab_line(&entry);
        assert_eq!(line, "/dev/sdb /mnt/my\\040data ext4 defaults 0 2");
        assert_eq!(parse_fstab(&line).unwrap(), vec![entry]);
    }

    #[test]
    fn non_ascii_mount_points_survive_parsing() {
        let entry = FstabEntry::for_uuid(
            uuid::Uuid::new_v4(),
            "/dätä/ünïcode dir",
            "ext4",
            "defaults,nofail",
        );
        let parsed = parse_fstab(&render_fstab_line(&entry)).unwrap();
        assert_eq!(parsed, vec![entry]);
        assert!(parsed[0].targets("/dätä/ünïcode dir"));

        // findmnt-style escaping of the raw UTF-8 bytes of "ä"
        let escaped = parse_fstab("/dev/sdb /d\\303\\244ta ext4 defaults 0 2").unwrap();
        assert_eq!(escaped[0].mount_point, "/däta");
    }

    #[test]
    fn rejects_truncated_lines() {
        assert!(parse_fstab("/dev/sdb /data\n").is_err());
    }

    #[test]
    fn findmnt_no_match_is_not_mounted() {
        let spec = findmnt_source("/data");
        assert_eq!(
            interpret_findmnt(&spec, &CommandOutput::failed(1, "")).unwrap(),
            None
        );
        assert_eq!(
            interpret_findmnt(&spec, &CommandOutput::ok("/dev/mapper/data_vg-data_lv\n")).unwrap(),
            Some("/dev/mapper/data_vg-data_lv".to_string())
        );
    }

    #[test]
    fn findmnt_strips_subvolume_suffix() {
        let spec = findmnt_source("/data");
        assert_eq!(
            interpret_findmnt(&spec, &CommandOutput::ok("/dev/sdb[/srv]\n")).unwrap(),
            Some("/dev/sdb".to_string())
        );
    }
}
