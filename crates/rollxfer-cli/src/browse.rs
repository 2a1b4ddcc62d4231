use eyre::{bail, Result};
use rollxfer_core::enumeration::RemoteEnumerator;
use rollxfer_core::roll::{self, verify_date};

use crate::cli::RollArgs;
use crate::context::AppContext;

pub async fn run_dates(ctx: &AppContext, args: &RollArgs) -> Result<()> {
    let locator = ctx.locator(args)?;
    let channel = ctx.channel();
    let dates = tokio::task::spawn_blocking(move || {
        let mut enumerator = RemoteEnumerator::new(channel);
        roll::available_dates(&mut enumerator, &locator)
    })
    .await??;
    print_entries("date folder", &dates);
    Ok(())
}

pub async fn run_cameras(ctx: &AppContext, args: &RollArgs) -> Result<()> {
    let locator = ctx.locator(args)?;
    let channel = ctx.channel();
    let cameras = tokio::task::spawn_blocking(move || {
        let mut enumerator = RemoteEnumerator::new(channel);
        if !verify_date(&mut enumerator, &locator)? {
            bail!(
                "the folder is not available: {}",
                locator.date_label().unwrap_or_default()
            );
        }
        roll::cameras(&mut enumerator, &locator)
    })
    .await??;
    print_entries("camera", &cameras);
    Ok(())
}

pub async fn run_defects(ctx: &AppContext, args: &RollArgs) -> Result<()> {
    if args.cameras.is_empty() {
        bail!("select at least one camera (--camera)");
    }
    let locator = ctx.locator(args)?;
    let cameras = args.cameras.clone();
    let channel = ctx.channel();
    let defects = tokio::task::spawn_blocking(move || {
        let mut enumerator = RemoteEnumerator::new(channel);
        roll::defect_types(&mut enumerator, &locator, &cameras)
    })
    .await??;
    print_entries("defect type", &defects);
    Ok(())
}

fn print_entries(kind: &str, entries: &[String]) {
    if entries.is_empty() {
        println!("No {}s found.", kind);
        return;
    }
    for entry in entries {
        println!("{}", entry);
    }
}
