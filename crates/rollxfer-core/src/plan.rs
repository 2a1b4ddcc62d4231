//! Selection pipeline run before any upload: discover candidates, narrow
//! them by doff id, size them and estimate the upload time.

use std::num::NonZeroU64;

use eyre::{bail, Result};
use serde::Serialize;

use crate::channel::CommandChannel;
use crate::enumeration::RemoteEnumerator;
use crate::profile::DataProfile;
use crate::roll::{verify_date, RollLocator};
use crate::selection::SelectionRange;
use crate::sizing::{estimate_eta, EtaEstimate, RollTotals, SizeAggregator, SizeReport};

#[derive(Debug, Clone)]
pub struct SelectionRequest {
    pub profile: DataProfile,
    pub locator: RollLocator,
    pub cameras: Vec<String>,
    pub defects: Vec<String>,
    pub range: Option<SelectionRange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionPlan {
    pub profile: DataProfile,
    pub range: Option<SelectionRange>,
    pub candidates: usize,
    pub report: SizeReport,
    pub eta: EtaEstimate,
}

impl SelectionPlan {
    pub fn is_empty(&self) -> bool {
        self.report.files.is_empty()
    }
}

pub fn plan_selection<C: CommandChannel + ?Sized>(
    channel: &mut C,
    request: &SelectionRequest,
    throughput: NonZeroU64,
) -> Result<SelectionPlan> {
    let candidates = {
        let mut enumerator = RemoteEnumerator::new(&mut *channel);
        if request.profile.needs_cameras() && !verify_date(&mut enumerator, &request.locator)? {
            bail!(
                "the folder is not available: {}",
                request.locator.date_label().unwrap_or_default()
            );
        }
        request.profile.candidate_files(
            &mut enumerator,
            &request.locator,
            &request.cameras,
            &request.defects,
        )?
    };
    let candidate_count = candidates.len();
    let selected = request.profile.select(candidates, request.range)?;
    log::info!(
        "{} of {} candidate file(s) selected",
        selected.len(),
        candidate_count
    );

    let report = SizeAggregator::new(&mut *channel).measure(selected)?;
    if report.unknown_size > 0 {
        log::warn!(
            "{} file(s) have an unknown size and are not counted in the total",
            report.unknown_size
        );
    }
    let eta = estimate_eta(report.total_bytes, throughput);
    Ok(SelectionPlan {
        profile: request.profile,
        range: request.range,
        candidates: candidate_count,
        report,
        eta,
    })
}

/// Totals for uploading a roll directory in one batch.
#[derive(Debug, Clone, Serialize)]
pub struct RollPlan {
    pub dir: String,
    pub totals: RollTotals,
    pub eta: Option<EtaEstimate>,
}

pub fn plan_roll<C: CommandChannel + ?Sized>(
    channel: &mut C,
    locator: &RollLocator,
    throughput: NonZeroU64,
) -> Result<RollPlan> {
    let dir = locator.roll_dir();
    let totals = SizeAggregator::new(&mut *channel).roll_totals(&dir)?;
    if totals.files == Some(0) {
        bail!("no files found in roll {}", dir);
    }
    Ok(RollPlan {
        eta: totals.bytes.map(|bytes| estimate_eta(bytes, throughput)),
        dir,
        totals,
    })
}
