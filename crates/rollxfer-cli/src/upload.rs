use eyre::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};

use rollxfer_core::orchestrator::{
    ProgressSnapshot, StopSignal, TransferOptions, TransferOrchestrator, TransferSummary,
};
use rollxfer_core::plan::{plan_roll, plan_selection, RollPlan, SelectionPlan, SelectionRequest};
use rollxfer_core::profile::DataProfile;
use rollxfer_core::selection::SelectionRange;
use rollxfer_core::sizing::{format_bytes, format_size};

use crate::cli::{SelectArgs, UploadArgs, UploadRollArgs};
use crate::context::AppContext;

const PROGRESS_SCALE: u64 = 1000;

/// Asks `question` on the terminal unless `assume_yes` is set.
fn confirm(question: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    print!("{} [y/N]: ", question);
    io::stdout().flush()?;
    read_answer(io::stdin().lock())
}

/// Only `y` or `yes` accepts; an empty line or closed input declines.
fn read_answer<R: BufRead>(mut input: R) -> Result<bool> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn selection_range(min: Option<u64>, max: Option<u64>) -> Result<Option<SelectionRange>> {
    match (min, max) {
        (Some(min), Some(max)) => Ok(Some(SelectionRange::new(min, max)?)),
        (None, None) => Ok(None),
        _ => bail!("--min and --max must be given together"),
    }
}

/// Validates everything local before any remote command is issued.
fn build_request(ctx: &AppContext, args: &SelectArgs) -> Result<SelectionRequest> {
    let range = selection_range(args.min, args.max)?;
    if args.roll.profile.id_field().is_some() && range.is_none() {
        bail!("the {} profile needs a doff range (--min and --max)", args.roll.profile);
    }
    if args.roll.profile == DataProfile::FullRoll && range.is_some() {
        log::warn!("full-roll selects every label file; --min/--max are ignored");
    }
    Ok(SelectionRequest {
        profile: args.roll.profile,
        locator: ctx.locator(&args.roll)?,
        cameras: args.roll.cameras.clone(),
        defects: args.roll.defects.clone(),
        range,
    })
}

async fn plan(ctx: &AppContext, args: &SelectArgs) -> Result<SelectionPlan> {
    let request = build_request(ctx, args)?;
    let throughput = ctx.settings.throughput()?;
    let mut channel = ctx.channel();
    tokio::task::spawn_blocking(move || plan_selection(&mut channel, &request, throughput)).await?
}

pub async fn run_plan(ctx: &AppContext, args: &SelectArgs) -> Result<()> {
    let plan = plan(ctx, args).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(ctx, &plan);
        for file in &plan.report.files {
            println!("  {}", file.path());
        }
    }
    Ok(())
}

pub async fn run_upload(ctx: &AppContext, args: &UploadArgs) -> Result<()> {
    let script = ctx.transfer_script(&args.target)?;
    let plan = plan(ctx, &args.select).await?;
    if plan.is_empty() {
        println!("No files in the selected range.");
        return Ok(());
    }
    print_plan(ctx, &plan);

    let prompt = format!(
        "Upload {} file(s) to {}?",
        plan.report.file_count(),
        script.destination()
    );
    if !confirm(&prompt, args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    println!(
        "rollxfer v{}: uploading {} file(s) to {}",
        env!("CARGO_PKG_VERSION"),
        plan.report.file_count(),
        script.destination()
    );

    let options = transfer_options(ctx);
    let interrupt = watch_for_interrupt(options.stop.clone());
    let progress = progress_bar()?;
    let bar = progress.clone();
    let mut channel = ctx.channel();
    let files = plan.report.files;

    let summary = tokio::task::spawn_blocking(move || {
        let orchestrator = TransferOrchestrator::new(options);
        orchestrator.run_with_script(&mut channel, &script, &files, |snapshot| {
            update_bar(&bar, snapshot)
        })
    })
    .await?;
    interrupt.abort();
    progress.finish_and_clear();

    report(&summary)
}

pub async fn run_upload_roll(ctx: &AppContext, args: &UploadRollArgs) -> Result<()> {
    let script = ctx.transfer_script(&args.target)?;
    let locator = ctx.full_roll_locator(args.profile, &args.roll)?;
    let throughput = ctx.settings.throughput()?;
    let mut channel = ctx.channel();
    let roll_plan =
        tokio::task::spawn_blocking(move || plan_roll(&mut channel, &locator, throughput))
            .await??;
    print_roll_plan(&roll_plan);

    let prompt = format!("Upload roll {} to {}?", roll_plan.dir, script.destination());
    if !confirm(&prompt, args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    let options = transfer_options(ctx);
    let interrupt = watch_for_interrupt(options.stop.clone());
    let progress = progress_bar()?;
    let bar = progress.clone();
    let mut channel = ctx.channel();

    let summary = tokio::task::spawn_blocking(move || {
        let orchestrator = TransferOrchestrator::new(options);
        orchestrator.run_batch(
            &mut channel,
            &script,
            &roll_plan.dir,
            roll_plan.totals.files,
            roll_plan.totals.bytes,
            |snapshot| update_bar(&bar, snapshot),
        )
    })
    .await??;
    interrupt.abort();
    progress.finish_and_clear();

    report(&summary)
}

fn transfer_options(ctx: &AppContext) -> TransferOptions {
    TransferOptions {
        poll: ctx.settings.poll_options(),
        stop: StopSignal::new(),
    }
}

fn watch_for_interrupt(stop: StopSignal) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, aborting the running upload");
            stop.stop();
        }
    })
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(PROGRESS_SCALE);
    pb.set_style(ProgressStyle::with_template("{bar:40} {percent:>3}% {msg}")?);
    Ok(pb)
}

fn update_bar(bar: &ProgressBar, snapshot: &ProgressSnapshot) {
    let position = (snapshot.fraction() * PROGRESS_SCALE as f64).round() as u64;
    bar.set_position(position.min(PROGRESS_SCALE));
    bar.set_message(progress_message(snapshot));
}

fn progress_message(snapshot: &ProgressSnapshot) -> String {
    let files = match snapshot.total_files {
        0 => format!("{} files", snapshot.uploaded_files),
        total => format!("{}/{} files", snapshot.uploaded_files, total),
    };
    format!(
        "{}, {} of {}",
        files,
        format_bytes(snapshot.uploaded_bytes),
        format_bytes(snapshot.total_bytes)
    )
}

fn print_plan(ctx: &AppContext, plan: &SelectionPlan) {
    match plan.range {
        Some(range) => println!(
            "Selected {} of {} file(s) with doff id {}",
            plan.report.file_count(),
            plan.candidates,
            range
        ),
        None => println!("Selected {} file(s)", plan.report.file_count()),
    }
    println!("• Total size: {}", format_size(plan.report.total_bytes));
    if plan.report.unknown_size > 0 {
        println!(
            "• Size unknown for {} file(s), not included above",
            plan.report.unknown_size
        );
    }
    println!(
        "• Estimated upload time: {} at {}/s",
        plan.eta,
        format_bytes(ctx.settings.throughput_bytes_per_sec)
    );
}

fn print_roll_plan(plan: &RollPlan) {
    println!("Roll folder: {}", plan.dir);
    match plan.totals.files {
        Some(files) => println!("• Files: {}", files),
        None => println!("• Files: unknown"),
    }
    match plan.totals.bytes {
        Some(bytes) => println!("• Total size: {}", format_size(bytes)),
        None => println!("• Total size: unknown"),
    }
    if let Some(eta) = plan.eta {
        println!("• Estimated upload time: {}", eta);
    }
}

fn report(summary: &TransferSummary) -> Result<()> {
    for line in summary_lines(summary) {
        println!("{}", line);
    }
    if !summary.failed.is_empty() {
        bail!("{} upload(s) failed", summary.failed.len());
    }
    Ok(())
}

fn summary_lines(summary: &TransferSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Upload {}: {} of {} file(s) attempted, {} confirmed, {} in {:.2?}",
        if summary.cancelled { "stopped" } else { "complete" },
        summary.attempted,
        summary.total_files,
        summary.confirmed,
        format_bytes(summary.uploaded_bytes),
        summary.duration
    )];
    if summary.not_attempted() > 0 {
        lines.push(format!("• Not attempted: {} file(s)", summary.not_attempted()));
    }
    if summary.unknown_size_files > 0 {
        lines.push(format!(
            "• Size unknown for {} file(s)",
            summary.unknown_size_files
        ));
    }
    for failure in &summary.failed {
        lines.push(format!("• Failed: {} ({})", failure.path, failure.reason));
    }
    lines
}
