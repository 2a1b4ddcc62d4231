//! Per-dataset strategies. The upload workflows differ only in where the
//! candidate files live and which file-name field carries the doff id;
//! everything after candidate discovery is shared.

use std::fmt;
use std::str::FromStr;

use eyre::{bail, Result};
use serde::Serialize;

use crate::channel::CommandChannel;
use crate::config::Settings;
use crate::enumeration::{join_remote, FindPattern, RemoteEnumerator};
use crate::roll::RollLocator;
use crate::selection::{sort_by_id, IdField, RemoteFile, SelectionRange, SequenceFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataProfile {
    /// Machine data: defect label files per camera and defect type.
    Mdd,
    /// Fabric defect images: every `.jpg` under the selected cameras.
    Fda,
    /// Machine data named with the doff id in the third field.
    MddLegacy,
    /// All defect label JSON files of a whole roll, no id filtering.
    FullRoll,
}

impl DataProfile {
    pub const ALL: [DataProfile; 4] = [
        DataProfile::Mdd,
        DataProfile::Fda,
        DataProfile::MddLegacy,
        DataProfile::FullRoll,
    ];

    pub fn id_field(self) -> Option<IdField> {
        match self {
            DataProfile::Mdd | DataProfile::Fda => Some(IdField::underscore(3)),
            DataProfile::MddLegacy => Some(IdField::underscore(2)),
            DataProfile::FullRoll => None,
        }
    }

    pub fn base_dir(self, settings: &Settings) -> &str {
        match self {
            DataProfile::Fda => &settings.fda_dir,
            DataProfile::Mdd | DataProfile::MddLegacy | DataProfile::FullRoll => {
                &settings.mdd_dir
            }
        }
    }

    /// Whether candidate discovery needs a date folder and cameras.
    pub fn needs_cameras(self) -> bool {
        !matches!(self, DataProfile::FullRoll)
    }

    pub fn needs_defects(self) -> bool {
        matches!(self, DataProfile::Mdd | DataProfile::MddLegacy)
    }

    /// Candidate file paths in discovery order.
    pub fn candidate_files<C: CommandChannel>(
        self,
        enumerator: &mut RemoteEnumerator<C>,
        locator: &RollLocator,
        cameras: &[String],
        defects: &[String],
    ) -> Result<Vec<String>> {
        if self.needs_cameras() && cameras.is_empty() {
            bail!("select at least one camera");
        }
        if self.needs_defects() && defects.is_empty() {
            bail!("select at least one defect type");
        }

        let mut files = Vec::new();
        match self {
            DataProfile::Mdd | DataProfile::MddLegacy => {
                for camera in cameras {
                    let labels = locator.labels_dir(camera)?;
                    for defect in defects {
                        let dir = join_remote(&labels, defect);
                        // Defect types are a union over cameras, so a camera
                        // may lack some of the folders.
                        for name in enumerator.list_or_empty(&dir) {
                            files.push(join_remote(&dir, &name));
                        }
                    }
                }
            }
            DataProfile::Fda => {
                let pattern = FindPattern::name("*.jpg")?;
                for camera in cameras {
                    let dir = locator.camera_dir(camera)?;
                    files.extend(enumerator.find(&dir, &pattern)?);
                }
            }
            DataProfile::FullRoll => {
                let pattern = FindPattern::path("*/defect/labels/*.json")?;
                files = enumerator.find(&locator.roll_dir(), &pattern)?;
            }
        }
        Ok(files)
    }

    /// Narrow candidates to the upload list. Id-based profiles keep files in
    /// `range` ordered by ascending id; `FullRoll` keeps everything.
    pub fn select(
        self,
        candidates: Vec<String>,
        range: Option<SelectionRange>,
    ) -> Result<Vec<RemoteFile>> {
        match (self.id_field(), range) {
            (Some(field), Some(range)) => {
                let mut selected = SequenceFilter::new(field).filter_by_range(candidates, range);
                sort_by_id(&mut selected);
                Ok(selected)
            }
            (Some(_), None) => bail!("the {} profile needs a doff id range", self),
            (None, _) => Ok(candidates.into_iter().map(RemoteFile::new).collect()),
        }
    }
}

impl fmt::Display for DataProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataProfile::Mdd => "mdd",
            DataProfile::Fda => "fda",
            DataProfile::MddLegacy => "mdd-legacy",
            DataProfile::FullRoll => "full-roll",
        };
        f.write_str(name)
    }
}

impl FromStr for DataProfile {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        DataProfile::ALL
            .into_iter()
            .find(|p| p.to_string() == wanted)
            .ok_or_else(|| {
                eyre::eyre!(
                    "unknown profile {:?} (expected mdd, fda, mdd-legacy or full-roll)",
                    s
                )
            })
    }
}
