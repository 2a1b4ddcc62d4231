use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use eyre::Result;
use rollxfer_core::orchestrator::{
    PollOptions, ProgressSnapshot, StopSignal, TransferOptions, TransferOrchestrator,
};
use rollxfer_core::selection::RemoteFile;
use rollxfer_core::transfer_script::TransferScript;

mod common;
use common::{ScriptedChannel, ScriptedProcess};

fn options(timeout: Option<Duration>) -> TransferOptions {
    TransferOptions {
        poll: PollOptions {
            interval: Duration::from_millis(1),
            timeout,
        },
        stop: StopSignal::new(),
    }
}

fn script() -> Result<TransferScript> {
    TransferScript::new("/home/kniti/upload_to_onedrive.sh", "Mill A", "KM-07")
}

fn labels(count: u64) -> Vec<RemoteFile> {
    (1..=count)
        .map(|id| {
            RemoteFile::new(format!("/data/R34/cam1_20250821_R34_{}_a.json", id))
                .with_id(Some(id))
                .with_size(Some(100 * id))
        })
        .collect()
}

#[test]
fn each_file_gets_one_invocation_and_failures_are_recorded() -> Result<()> {
    let mut channel = ScriptedChannel::new()
        .process(ScriptedProcess::printing(&[
            "⬆️ Uploading /data/R34/cam1_20250821_R34_1_a.json → /Backup\n".as_bytes(),
        ]))
        .process(ScriptedProcess::printing(&[]).exit(1, "rclone: quota exceeded"))
        .process(ScriptedProcess::printing(&[]));
    let files = labels(3);
    let mut snapshots: Vec<ProgressSnapshot> = Vec::new();

    let summary = TransferOrchestrator::new(options(None)).run_with_script(
        &mut channel,
        &script()?,
        &files,
        |snapshot| snapshots.push(*snapshot),
    );

    assert_eq!(
        channel.issued,
        vec![
            "bash /home/kniti/upload_to_onedrive.sh 'Mill A' KM-07 /data/R34/cam1_20250821_R34_1_a.json",
            "bash /home/kniti/upload_to_onedrive.sh 'Mill A' KM-07 /data/R34/cam1_20250821_R34_2_a.json",
            "bash /home/kniti/upload_to_onedrive.sh 'Mill A' KM-07 /data/R34/cam1_20250821_R34_3_a.json",
        ]
    );
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.confirmed, 2);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].reason.contains("quota exceeded"));
    assert_eq!(summary.total_bytes, 600);

    let fractions: Vec<f64> = snapshots.iter().map(ProgressSnapshot::fraction).collect();
    assert_eq!(fractions.len(), 3);
    assert!(fractions.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(fractions[2], 1.0);
    Ok(())
}

#[test]
fn timed_out_file_does_not_block_the_rest() -> Result<()> {
    let mut channel = ScriptedChannel::new()
        .process(ScriptedProcess::hanging())
        .process(ScriptedProcess::printing(&[]));
    let files = labels(2);

    let summary = TransferOrchestrator::new(options(Some(Duration::from_millis(20))))
        .run_with_script(&mut channel, &script()?, &files, |_| {});

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.confirmed, 1);
    assert!(!summary.cancelled);
    assert!(summary.failed[0].reason.contains("still running"));
    Ok(())
}

#[test]
fn stop_request_interrupts_the_running_invocation() -> Result<()> {
    let process = ScriptedProcess::hanging();
    let aborted = process.abort_flag();
    let mut channel = ScriptedChannel::new().process(process);
    let files = labels(2);
    let options = options(None);
    let stop = options.stop.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        stop.stop();
    });

    let summary = TransferOrchestrator::new(options).run_with_script(
        &mut channel,
        &script()?,
        &files,
        |_| {},
    );
    stopper.join().unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.not_attempted(), 2);
    assert_eq!(channel.issued.len(), 1);
    assert!(aborted.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn batch_upload_follows_split_script_output() -> Result<()> {
    let mut channel = ScriptedChannel::new().process(ScriptedProcess::printing(&[
        b"TOTAL_FI",
        b"LES=2\n\xe2\xac\x86\xef\xb8\x8f Uploading /data/R34/a.json \xe2\x86",
        b"\x92 /Backup/Mill A/KM-07/a.json\nnoise\n",
        "⬆️ Uploading /data/R34/b.json → /Backup/Mill A/KM-07/b.json".as_bytes(),
    ]));
    let mut seen: Vec<ProgressSnapshot> = Vec::new();

    let summary = TransferOrchestrator::new(options(None)).run_batch(
        &mut channel,
        &script()?,
        "/data/R34",
        None,
        Some(4096),
        |snapshot| seen.push(*snapshot),
    )?;

    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.confirmed, 2);
    assert_eq!(summary.uploaded_bytes, 4096);
    assert!(summary.is_complete());

    let totals: Vec<u64> = seen.iter().map(|s| s.total_files).collect();
    let bytes: Vec<u64> = seen.iter().map(|s| s.uploaded_bytes).collect();
    let fractions: Vec<f64> = seen.iter().map(ProgressSnapshot::fraction).collect();
    assert_eq!(totals, vec![2, 2, 2, 2]);
    assert_eq!(bytes, vec![0, 2048, 4096, 4096]);
    assert_eq!(fractions, vec![0.0, 0.5, 1.0, 1.0]);
    Ok(())
}

#[test]
fn batch_without_sizes_counts_files_once_total_is_known() -> Result<()> {
    let mut channel = ScriptedChannel::new().process(ScriptedProcess::printing(&[
        "⬆️ Uploading /data/R34/a.json → /Backup\n".as_bytes(),
        b"TOTAL_FILES=4\n",
        "⬆️ Uploading /data/R34/b.json → /Backup\n".as_bytes(),
        "⬆️ Uploading /data/R34/c.json → /Backup\n".as_bytes(),
        "⬆️ Uploading /data/R34/d.json → /Backup\n".as_bytes(),
    ]));
    let mut seen: Vec<ProgressSnapshot> = Vec::new();

    let summary = TransferOrchestrator::new(options(None)).run_batch(
        &mut channel,
        &script()?,
        "/data/R34",
        None,
        None,
        |snapshot| seen.push(*snapshot),
    )?;

    assert_eq!(summary.total_files, 4);
    assert_eq!(summary.confirmed, 4);
    assert_eq!(summary.unknown_size_files, 1);
    assert!(summary.is_complete());

    let fractions: Vec<f64> = seen.iter().map(ProgressSnapshot::fraction).collect();
    assert!(fractions.windows(2).all(|w| w[1] >= w[0]), "{:?}", fractions);
    assert_eq!(fractions, vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.0]);
    assert_eq!(seen[0].total_files, 0);
    Ok(())
}
