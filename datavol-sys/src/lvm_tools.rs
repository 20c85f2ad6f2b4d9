// SPDX-License-Identifier: GPL-3.0-only

//! LVM tool invocations and output parsing
//!
//! Reports are requested with `--noheadings --separator '\t'` so each row is
//! one tab separated line.

use datavol_types::{LogicalVolumeRef, PhysicalVolumeInfo};

use crate::runner::CommandSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VgRow {
    pub name: String,
    pub free_extents: u64,
}

fn parse_tabbed_line(line: &str) -> Vec<String> {
    line.split('\t')
        .map(|part| part.trim().to_string())
        .collect()
}

fn rows(output: &str, min_cols: usize) -> impl Iterator<Item = Vec<String>> + '_ {
    output.lines().filter_map(move |line| {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let cols = parse_tabbed_line(line);
        (cols.len() >= min_cols).then_some(cols)
    })
}

fn report(command: &str, fields: &str) -> CommandSpec {
    CommandSpec::new(command).args([
        "--noheadings",
        "--units",
        "b",
        "--nosuffix",
        "-o",
        fields,
        "--separator",
        "\t",
    ])
}

pub fn pvs_command() -> CommandSpec {
    report("pvs", "pv_name,vg_name,pv_size,pv_free")
}

pub fn lvs_command() -> CommandSpec {
    report("lvs", "vg_name,lv_name,lv_path")
}

pub fn vgs_command() -> CommandSpec {
    report("vgs", "vg_name,vg_free_count")
}

pub fn parse_pvs(output: &str) -> Vec<PhysicalVolumeInfo> {
    rows(output, 4)
        .filter_map(|cols| {
            let vg_name = if cols[1].is_empty() {
                None
            } else {
                Some(cols[1].clone())
            };

            Some(PhysicalVolumeInfo {
                device: cols[0].clone(),
                vg_name,
                size: cols[2].parse().ok()?,
                free: cols[3].parse().ok()?,
            })
        })
        .collect()
}

pub fn parse_lvs(output: &str) -> Vec<LogicalVolumeRef> {
    rows(output, 2)
        .map(|cols| {
            let lv_path = cols
                .get(2)
                .filter(|path| !path.is_empty())
                .cloned()
                .unwrap_or_else(|| LogicalVolumeRef::default_path(&cols[0], &cols[1]));
            LogicalVolumeRef::new(cols[0].clone(), cols[1].clone(), lv_path)
        })
        .collect()
}

pub fn parse_vgs(output: &str) -> Vec<VgRow> {
    rows(output, 2)
        .filter_map(|cols| {
            Some(VgRow {
                name: cols[0].clone(),
                free_extents: cols[1].parse().ok()?,
            })
        })
        .collect()
}

pub fn pvcreate(device: &str) -> CommandSpec {
    CommandSpec::new("pvcreate").arg(device)
}

pub fn vgcreate(vg_name: &str, device: &str) -> CommandSpec {
    CommandSpec::new("vgcreate").args([vg_name, device])
}

pub fn vgextend(vg_name: &str, device: &str) -> CommandSpec {
    CommandSpec::new("vgextend").args([vg_name, device])
}

pub fn lvcreate_full_free(vg_name: &str, lv_name: &str) -> CommandSpec {
    CommandSpec::new("lvcreate").args(["--yes", "-l", "100%FREE", "-n", lv_name, vg_name])
}

pub fn lvextend_full_free(lv_path: &str) -> CommandSpec {
    CommandSpec::new("lvextend").args(["-l", "+100%FREE", lv_path])
}
