use std::num::NonZeroU64;
use std::time::Duration;

use eyre::Result;
use rollxfer_core::errors::{remote_error, RemoteError};
use rollxfer_core::plan::{plan_selection, SelectionRequest};
use rollxfer_core::profile::DataProfile;
use rollxfer_core::roll::{parse_roll_date, RollLocator};
use rollxfer_core::selection::SelectionRange;

mod common;
use common::ScriptedChannel;

const FIND_CAM1: &str = "find /img/R34/2025-08-21/cam1 -type f -name '*.jpg'";

fn throughput() -> NonZeroU64 {
    NonZeroU64::new(5 * 1024 * 1024).unwrap()
}

fn request(profile: DataProfile, range: SelectionRange) -> Result<SelectionRequest> {
    Ok(SelectionRequest {
        profile,
        locator: RollLocator::new("/img", "R34").on(parse_roll_date("2025-08-21")?),
        cameras: vec!["cam1".into()],
        defects: vec!["hole".into()],
        range: Some(range),
    })
}

fn image(id: u64) -> String {
    format!("/img/R34/2025-08-21/cam1/cam1_20250821_R34_{}_img.jpg", id)
}

#[test]
fn range_selects_inclusive_ids_in_order() -> Result<()> {
    let listing: String = [5, 1, 3, 2, 4].iter().map(|id| image(*id) + "\n").collect();
    let mut channel = ScriptedChannel::new()
        .on("ls -1 /img/R34", "2025-08-20\n2025-08-21\n")
        .on(FIND_CAM1, &listing);
    for id in 2..=4 {
        channel = channel.on(
            &format!("stat -c %s {} || true", image(id)),
            "104857600\n",
        );
    }

    let plan = plan_selection(
        &mut channel,
        &request(DataProfile::Fda, SelectionRange::new(2, 4)?)?,
        throughput(),
    )?;

    let ids: Vec<_> = plan.report.files.iter().map(|f| f.extracted_id()).collect();
    assert_eq!(ids, vec![Some(2), Some(3), Some(4)]);
    assert_eq!(plan.candidates, 5);
    assert_eq!(plan.report.total_bytes, 314_572_800);
    assert_eq!(plan.report.unknown_size, 0);
    assert_eq!(plan.eta.total, Duration::from_secs(60));
    assert_eq!(plan.eta.to_string(), "~1m 0s");
    Ok(())
}

#[test]
fn unreadable_sizes_are_counted_not_fatal() -> Result<()> {
    let listing = format!("{}\n{}\n", image(7), image(8));
    let mut channel = ScriptedChannel::new()
        .on("ls -1 /img/R34", "2025-08-21\n")
        .on(FIND_CAM1, &listing)
        .on(&format!("stat -c %s {} || true", image(7)), "2048\n")
        .on(&format!("stat -c %s {} || true", image(8)), "");

    let plan = plan_selection(
        &mut channel,
        &request(DataProfile::Fda, SelectionRange::new(7, 8)?)?,
        throughput(),
    )?;

    assert_eq!(plan.report.file_count(), 2);
    assert_eq!(plan.report.total_bytes, 2048);
    assert_eq!(plan.report.unknown_size, 1);
    assert_eq!(plan.report.files[1].size_bytes(), None);
    Ok(())
}

#[test]
fn files_without_an_id_are_dropped() -> Result<()> {
    let listing = format!("{}\n/img/R34/2025-08-21/cam1/preview.jpg\n", image(3));
    let mut channel = ScriptedChannel::new()
        .on("ls -1 /img/R34", "2025-08-21\n")
        .on(FIND_CAM1, &listing)
        .on(&format!("stat -c %s {} || true", image(3)), "10\n");

    let plan = plan_selection(
        &mut channel,
        &request(DataProfile::Fda, SelectionRange::new(0, 100)?)?,
        throughput(),
    )?;

    assert_eq!(plan.candidates, 2);
    assert_eq!(plan.report.file_count(), 1);
    Ok(())
}

#[test]
fn find_failure_surfaces_as_enumeration_error() -> Result<()> {
    let mut channel = ScriptedChannel::new()
        .on("ls -1 /img/R34", "2025-08-21\n")
        .failing(FIND_CAM1, 1, "find: permission denied");

    let err = plan_selection(
        &mut channel,
        &request(DataProfile::Fda, SelectionRange::new(1, 2)?)?,
        throughput(),
    )
    .unwrap_err();

    match remote_error(&err) {
        Some(RemoteError::Enumeration { status, stderr, .. }) => {
            assert_eq!(*status, 1);
            assert!(stderr.contains("permission denied"));
        }
        other => panic!("expected enumeration error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn mdd_reads_labels_per_defect_type() -> Result<()> {
    let labels = "/img/R34/2025-08-21/cam1/defect/labels/hole";
    let mut channel = ScriptedChannel::new()
        .on("ls -1 /img/R34", "2025-08-21\n")
        .on(
            &format!("ls -1 {}", labels),
            "cam1_20250821_R34_12_a.json\ncam1_20250821_R34_30_b.json\n",
        )
        .on(
            &format!("stat -c %s {}/cam1_20250821_R34_12_a.json || true", labels),
            "512\n",
        );

    let plan = plan_selection(
        &mut channel,
        &request(DataProfile::Mdd, SelectionRange::new(10, 20)?)?,
        throughput(),
    )?;

    assert_eq!(plan.report.file_count(), 1);
    assert_eq!(plan.report.files[0].name(), "cam1_20250821_R34_12_a.json");
    assert_eq!(plan.report.total_bytes, 512);
    Ok(())
}

#[test]
fn inverted_range_is_rejected_up_front() {
    assert_eq!(
        SelectionRange::new(5, 2),
        Err(RemoteError::InvalidRange { min: 5, max: 2 })
    );
}
