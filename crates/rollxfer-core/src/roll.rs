//! Layout of roll data on the inspection machine:
//! `<data_dir>/<roll_name>/<YYYY-MM-DD>/<camera>/...`.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use eyre::{bail, eyre, Result};

use crate::channel::CommandChannel;
use crate::enumeration::{join_remote, RemoteEnumerator};

/// A roll as offered to the operator: `"<number> - <name>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollChoice {
    pub number: String,
    pub name: String,
}

impl RollChoice {
    pub fn parse(raw: &str) -> Result<Self> {
        let (number, name) = raw
            .split_once(" - ")
            .ok_or_else(|| eyre!("invalid roll {:?}: expected '<number> - <name>'", raw))?;
        let number = number.trim();
        let name = name.trim();
        if number.is_empty() || name.is_empty() {
            bail!("invalid roll {:?}: expected '<number> - <name>'", raw);
        }
        Ok(Self {
            number: number.to_owned(),
            name: name.to_owned(),
        })
    }
}

impl fmt::Display for RollChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.number, self.name)
    }
}

/// Accepts `2025-08-21` as well as a database timestamp such as
/// `2025-08-21 06:00:00`; only the date part is used.
pub fn parse_roll_date(raw: &str) -> Result<NaiveDate> {
    let day = raw.split_whitespace().next().unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|err| eyre!("invalid roll date {:?}: {}", raw, err))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollLocator {
    pub base: String,
    pub roll_name: String,
    pub date: Option<NaiveDate>,
}

impl RollLocator {
    pub fn new(base: impl Into<String>, roll_name: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            roll_name: roll_name.into(),
            date: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn roll_dir(&self) -> String {
        join_remote(&self.base, &self.roll_name)
    }

    pub fn date_label(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }

    pub fn date_dir(&self) -> Result<String> {
        let label = self
            .date_label()
            .ok_or_else(|| eyre!("no date selected for roll {}", self.roll_name))?;
        Ok(join_remote(&self.roll_dir(), &label))
    }

    pub fn camera_dir(&self, camera: &str) -> Result<String> {
        Ok(join_remote(&self.date_dir()?, camera))
    }

    pub fn labels_dir(&self, camera: &str) -> Result<String> {
        Ok(join_remote(&self.camera_dir(camera)?, "defect/labels"))
    }
}

/// Date folders present under the roll.
pub fn available_dates<C: CommandChannel>(
    enumerator: &mut RemoteEnumerator<C>,
    locator: &RollLocator,
) -> Result<Vec<String>> {
    enumerator.list(&locator.roll_dir())
}

/// Whether the selected date folder exists. A missing folder is `Ok(false)`.
pub fn verify_date<C: CommandChannel>(
    enumerator: &mut RemoteEnumerator<C>,
    locator: &RollLocator,
) -> Result<bool> {
    let label = locator
        .date_label()
        .ok_or_else(|| eyre!("no date selected for roll {}", locator.roll_name))?;
    let dates = available_dates(enumerator, locator)?;
    Ok(dates.iter().any(|d| *d == label))
}

pub fn cameras<C: CommandChannel>(
    enumerator: &mut RemoteEnumerator<C>,
    locator: &RollLocator,
) -> Result<Vec<String>> {
    enumerator.list(&locator.date_dir()?)
}

/// Sorted union of defect label folders across `cameras`. A camera with no
/// label folder contributes nothing.
pub fn defect_types<C: CommandChannel>(
    enumerator: &mut RemoteEnumerator<C>,
    locator: &RollLocator,
    cameras: &[String],
) -> Result<Vec<String>> {
    let mut union = BTreeSet::new();
    for camera in cameras {
        let dir = locator.labels_dir(camera)?;
        union.extend(enumerator.list_or_empty(&dir));
    }
    Ok(union.into_iter().collect())
}
