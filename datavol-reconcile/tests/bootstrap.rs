use datavol_contracts::StorageErrorKind;
use datavol_reconcile::{ReconcileError, bootstrap};
use datavol_testing::{Mutation, MutationKind, SimulatedHost};
use datavol_types::{BootstrapOutcome, FstabEntry, LogicalVolumeRef, ReconcileConfig};

fn data_volume() -> LogicalVolumeRef {
    LogicalVolumeRef::new("data_vg", "data_lv", "/dev/data_vg/data_lv")
}

#[tokio::test]
async fn fresh_host_gets_a_mounted_data_volume() {
    let host = SimulatedHost::new()
        .with_system_disk("/dev/nvme0n1", 20)
        .with_disk("/dev/nvme1n1", 10)
        .into_shared();
    let config = ReconcileConfig::default();

    let outcome = bootstrap(&host.adapters(), &config).await.unwrap();

    assert_eq!(
        outcome,
        BootstrapOutcome::Initialized {
            device: "/dev/nvme1n1".to_string(),
            volume: data_volume(),
        }
    );
    assert_eq!(
        host.physical_volumes()
            .into_iter()
            .collect::<Vec<_>>(),
        vec![("/dev/nvme1n1".to_string(), Some("data_vg".to_string()))]
    );
    assert_eq!(host.groups(), vec!["data_vg".to_string()]);
    assert_eq!(host.volumes(), vec![data_volume()]);
    assert_eq!(host.free_extents("data_vg"), 0);

    let uuid = host.volume_uuid("data_vg", "data_lv").unwrap();
    assert_eq!(
        host.fstab(),
        vec![FstabEntry::for_uuid(uuid, "/data", "ext4", "defaults,nofail")]
    );
    assert_eq!(
        host.mount_source("/data").as_deref(),
        Some("/dev/mapper/data_vg-data_lv")
    );

    let kinds: Vec<_> = host.storage_mutations().iter().map(Mutation::kind).collect();
    assert_eq!(
        kinds,
        vec![
            MutationKind::CreatePhysicalVolume,
            MutationKind::CreateVolumeGroup,
            MutationKind::CreateLogicalVolume,
            MutationKind::FormatFilesystem,
        ]
    );
}

#[tokio::test]
async fn second_run_mounts_the_same_volume_without_rebuilding() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .into_shared();
    let adapters = host.adapters();
    let config = ReconcileConfig::default();

    bootstrap(&adapters, &config).await.unwrap();
    let uuid = host.volume_uuid("data_vg", "data_lv");
    host.clear_mutations();

    let outcome = bootstrap(&adapters, &config).await.unwrap();

    assert_eq!(
        outcome,
        BootstrapOutcome::MountedExisting {
            volume: data_volume()
        }
    );
    assert!(host.storage_mutations().is_empty());
    assert_eq!(host.physical_volumes().len(), 1);
    assert_eq!(host.groups().len(), 1);
    assert_eq!(host.volumes().len(), 1);
    assert_eq!(host.fstab().len(), 1);
    assert_eq!(host.volume_uuid("data_vg", "data_lv"), uuid);
}

#[tokio::test]
async fn single_existing_volume_is_mounted_as_is() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .with_volume_group("g1", &["/dev/sdb"])
        .with_logical_volume("g1", "lv1")
        .into_shared();

    let outcome = bootstrap(&host.adapters(), &ReconcileConfig::default())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        BootstrapOutcome::MountedExisting {
            volume: LogicalVolumeRef::new("g1", "lv1", "/dev/g1/lv1"),
        }
    );
    assert!(host.storage_mutations().is_empty());
    assert_eq!(host.groups(), vec!["g1".to_string()]);

    let uuid = host.volume_uuid("g1", "lv1").unwrap();
    let fstab = host.fstab();
    assert_eq!(fstab.len(), 1);
    assert_eq!(fstab[0].uuid(), Some(uuid));
    assert_eq!(
        host.mount_source("/data").as_deref(),
        Some("/dev/mapper/g1-lv1")
    );
}

#[tokio::test]
async fn group_spanning_several_candidates_is_counted_once() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .with_disk("/dev/sdc", 10)
        .with_volume_group("g1", &["/dev/sdb", "/dev/sdc"])
        .with_logical_volume("g1", "lv1")
        .into_shared();

    let outcome = bootstrap(&host.adapters(), &ReconcileConfig::default())
        .await
        .unwrap();

    assert!(matches!(outcome, BootstrapOutcome::MountedExisting { .. }));
}

#[tokio::test]
async fn two_existing_volumes_abort_without_any_mutation() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .with_disk("/dev/sdc", 10)
        .with_volume_group("g1", &["/dev/sdb"])
        .with_logical_volume("g1", "lv1")
        .with_volume_group("g2", &["/dev/sdc"])
        .with_logical_volume("g2", "lv2")
        .into_shared();

    let error = bootstrap(&host.adapters(), &ReconcileConfig::default())
        .await
        .unwrap_err();

    match error {
        ReconcileError::AmbiguousTarget { candidates } => assert_eq!(
            candidates,
            vec![
                LogicalVolumeRef::new("g1", "lv1", "/dev/g1/lv1"),
                LogicalVolumeRef::new("g2", "lv2", "/dev/g2/lv2"),
            ]
        ),
        other => panic!("expected ambiguity, got {other}"),
    }
    assert!(host.mutations().is_empty());
    assert!(host.mount_source("/data").is_none());
}

#[tokio::test]
async fn host_without_candidates_is_left_alone() {
    let host = SimulatedHost::new()
        .with_system_disk("/dev/nvme0n1", 20)
        .with_loop_device("/dev/loop0")
        .into_shared();

    let outcome = bootstrap(&host.adapters(), &ReconcileConfig::default())
        .await
        .unwrap();

    assert_eq!(outcome, BootstrapOutcome::NoCandidates);
    assert!(host.mutations().is_empty());
}

#[tokio::test]
async fn foreign_disks_are_not_initialized() {
    let host = SimulatedHost::new()
        .with_foreign_disk("/dev/sdb", "xfs")
        .into_shared();

    let error = bootstrap(&host.adapters(), &ReconcileConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ReconcileError::NoBlankDisk { ref candidates } if candidates == &["/dev/sdb".to_string()]
    ));
    assert!(host.mutations().is_empty());
}

#[tokio::test]
async fn configured_boot_device_is_never_initialized() {
    let host = SimulatedHost::new()
        .with_disk("/dev/xvda", 10)
        .with_disk("/dev/xvdb", 10)
        .into_shared();
    let config = ReconcileConfig {
        boot_device: Some("/dev/xvda".to_string()),
        ..ReconcileConfig::default()
    };

    let outcome = bootstrap(&host.adapters(), &config).await.unwrap();

    assert!(matches!(
        outcome,
        BootstrapOutcome::Initialized { ref device, .. } if device == "/dev/xvdb"
    ));
    assert!(!host.physical_volumes().contains_key("/dev/xvda"));
}

#[tokio::test]
async fn first_blank_disk_in_device_order_is_chosen() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdc", 10)
        .with_foreign_disk("/dev/sda", "ext4")
        .with_disk("/dev/sdb", 10)
        .into_shared();

    let outcome = bootstrap(&host.adapters(), &ReconcileConfig::default())
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        BootstrapOutcome::Initialized { ref device, .. } if device == "/dev/sdb"
    ));
    assert!(!host.physical_volumes().contains_key("/dev/sdc"));
}

#[tokio::test]
async fn custom_names_are_honoured() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .into_shared();
    let config = ReconcileConfig {
        vg_name: "scratch-vg".to_string(),
        lv_name: "scratch".to_string(),
        mount_point: "/scratch".to_string(),
        ..ReconcileConfig::default()
    };

    bootstrap(&host.adapters(), &config).await.unwrap();

    assert_eq!(
        host.mount_source("/scratch").as_deref(),
        Some("/dev/mapper/scratch--vg-scratch")
    );
    assert!(host.mount_source("/data").is_none());
}

#[tokio::test]
async fn run_resumes_after_volume_group_creation_failed() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .fail_on(MutationKind::CreateVolumeGroup)
        .into_shared();
    let adapters = host.adapters();
    let config = ReconcileConfig::default();

    let error = bootstrap(&adapters, &config).await.unwrap_err();
    assert!(error.to_string().contains("create volume group data_vg on /dev/sdb"));
    assert_eq!(host.physical_volumes().get("/dev/sdb"), Some(&None));
    assert!(host.groups().is_empty());

    let outcome = bootstrap(&adapters, &config).await.unwrap();

    assert_eq!(
        outcome,
        BootstrapOutcome::Initialized {
            device: "/dev/sdb".to_string(),
            volume: data_volume(),
        }
    );
    assert_eq!(host.groups(), vec!["data_vg".to_string()]);
    assert!(host.mount_source("/data").is_some());
}

#[tokio::test]
async fn run_resumes_after_logical_volume_creation_failed() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .fail_on(MutationKind::CreateLogicalVolume)
        .into_shared();
    let adapters = host.adapters();
    let config = ReconcileConfig::default();

    bootstrap(&adapters, &config).await.unwrap_err();
    assert!(host.volumes().is_empty());
    host.clear_mutations();

    bootstrap(&adapters, &config).await.unwrap();

    assert_eq!(host.volumes(), vec![data_volume()]);
    assert!(
        !host
            .mutations()
            .iter()
            .any(|m| m.kind() == MutationKind::CreateVolumeGroup)
    );
    assert_eq!(host.fstab().len(), 1);
}

#[tokio::test]
async fn run_resumes_after_mount_failed() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .fail_on(MutationKind::Mount)
        .into_shared();
    let adapters = host.adapters();
    let config = ReconcileConfig::default();

    bootstrap(&adapters, &config).await.unwrap_err();
    assert_eq!(host.fstab().len(), 1);
    assert!(host.mount_source("/data").is_none());

    let outcome = bootstrap(&adapters, &config).await.unwrap();

    assert!(matches!(outcome, BootstrapOutcome::MountedExisting { .. }));
    assert_eq!(host.fstab().len(), 1);
    assert!(host.mount_source("/data").is_some());
}

#[tokio::test]
async fn run_resumes_after_format_failed() {
    let host = SimulatedHost::new().with_disk("/dev/sdb", 10).into_shared();
    host.fail_next(MutationKind::FormatFilesystem);
    let adapters = host.adapters();
    let config = ReconcileConfig::default();

    let error = bootstrap(&adapters, &config).await.unwrap_err();
    assert!(error.to_string().contains("format /dev/data_vg/data_lv as ext4"));
    assert_eq!(host.volumes(), vec![data_volume()]);
    assert!(host.volume_uuid("data_vg", "data_lv").is_none());
    assert!(host.fstab().is_empty());

    let outcome = bootstrap(&adapters, &config).await.unwrap();

    assert_eq!(
        outcome,
        BootstrapOutcome::MountedExisting {
            volume: data_volume()
        }
    );
    let uuid = host.volume_uuid("data_vg", "data_lv").unwrap();
    assert_eq!(
        host.fstab(),
        vec![FstabEntry::for_uuid(uuid, "/data", "ext4", "defaults,nofail")]
    );
    assert_eq!(
        host.mount_source("/data").as_deref(),
        Some("/dev/mapper/data_vg-data_lv")
    );

    host.clear_mutations();
    bootstrap(&adapters, &config).await.unwrap();
    assert!(host.storage_mutations().is_empty());
    assert_eq!(host.volume_uuid("data_vg", "data_lv"), Some(uuid));
}

#[tokio::test]
async fn empty_volume_under_another_name_is_not_formatted() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .with_volume_group("g1", &["/dev/sdb"])
        .with_empty_logical_volume("g1", "lv1")
        .into_shared();

    let error = bootstrap(&host.adapters(), &ReconcileConfig::default())
        .await
        .unwrap_err();

    match error {
        ReconcileError::MissingFilesystemUuid { device } => {
            assert_eq!(device, "/dev/g1/lv1");
        }
        other => panic!("expected a missing UUID error, got {other}"),
    }
    assert!(host.storage_mutations().is_empty());
    assert!(host.fstab().is_empty());
}

#[tokio::test]
async fn existing_mount_entry_is_not_duplicated() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .with_volume_group("g1", &["/dev/sdb"])
        .with_logical_volume("g1", "lv1");
    let uuid = host.volume_uuid("g1", "lv1").unwrap();
    let entry = FstabEntry::for_uuid(uuid, "/data", "ext4", "defaults");
    let host = host.with_fstab_entry(entry.clone()).into_shared();

    bootstrap(&host.adapters(), &ReconcileConfig::default())
        .await
        .unwrap();

    assert_eq!(host.fstab(), vec![entry]);
    assert!(
        !host
            .mutations()
            .iter()
            .any(|m| m.kind() == MutationKind::PersistMountEntry)
    );
    assert!(host.mount_source("/data").is_some());
}

#[tokio::test]
async fn inconclusive_classification_stops_before_any_mutation() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .with_unreadable_disk("/dev/sdc")
        .into_shared();

    let error = bootstrap(&host.adapters(), &ReconcileConfig::default())
        .await
        .unwrap_err();

    match error {
        ReconcileError::Classification { device, source } => {
            assert_eq!(device, "/dev/sdc");
            assert_eq!(source.kind, StorageErrorKind::PermissionDenied);
        }
        other => panic!("expected a classification error, got {other}"),
    }
    assert!(host.mutations().is_empty());
}

#[tokio::test]
async fn mount_point_held_by_another_device_is_reported() {
    let host = SimulatedHost::new()
        .with_disk("/dev/sdb", 10)
        .with_volume_group("g1", &["/dev/sdb"])
        .with_logical_volume("g1", "lv1")
        .with_raw_mount("/data", "/dev/sdz1")
        .into_shared();

    let error = bootstrap(&host.adapters(), &ReconcileConfig::default())
        .await
        .unwrap_err();

    match error {
        ReconcileError::MountedElsewhere {
            mount_point,
            expected,
            found,
        } => {
            assert_eq!(mount_point, "/data");
            assert_eq!(expected, LogicalVolumeRef::new("g1", "lv1", "/dev/g1/lv1"));
            assert_eq!(found, "/dev/sdz1");
        }
        other => panic!("expected a mount source mismatch, got {other}"),
    }
    assert_eq!(host.mount_source("/data").as_deref(), Some("/dev/sdz1"));
    assert!(host.storage_mutations().is_empty());
}
