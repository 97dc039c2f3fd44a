use std::fs;
use std::path::Path;

use qpsk_bootloader_core::target::WRITE_SETTLE_PAUSE;
use qpsk_bootloader_core::{AudioModemError, Pacing};
use serde::Deserialize;

use crate::CliError;

/// Custom target profile loaded from JSON
///
/// Page-paced:   `{"page_size": 1024, "pause_short": 0.06}`
/// Sector-paced: `{"block_size": 16384, "pause_erase": 3.5,
///                 "sector_table": [...], "application_start_address": ...}`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileFile {
    page_size: Option<usize>,
    block_size: Option<usize>,
    pause_short: Option<f64>,
    pause_erase: Option<f64>,
    #[serde(default)]
    sector_table: Vec<u32>,
    application_start_address: Option<u32>,
}

impl ProfileFile {
    pub fn load(path: &Path) -> Result<Pacing, CliError> {
        let text = fs::read_to_string(path).map_err(|source| CliError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;
        let profile: ProfileFile =
            serde_json::from_str(&text).map_err(|source| CliError::Profile {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(profile.into_pacing()?)
    }

    pub fn into_pacing(self) -> Result<Pacing, AudioModemError> {
        match (self.page_size, self.block_size) {
            (Some(page_size), None) => {
                if !self.sector_table.is_empty()
                    || self.pause_erase.is_some()
                    || self.application_start_address.is_some()
                {
                    return Err(invalid(
                        "page-paced profile does not take sector_table, pause_erase or application_start_address",
                    ));
                }
                let pause_short = self.pause_short.ok_or_else(|| {
                    invalid("page-paced profile needs pause_short")
                })?;
                Ok(Pacing::PagePaced {
                    page_size,
                    pause_short,
                })
            }
            (None, Some(block_size)) => {
                if self.sector_table.is_empty() {
                    return Err(invalid("sector-paced profile needs a sector_table"));
                }
                let pause_erase = self
                    .pause_erase
                    .ok_or_else(|| invalid("sector-paced profile needs pause_erase"))?;
                let start_address = self.application_start_address.ok_or_else(|| {
                    invalid("sector-paced profile needs application_start_address")
                })?;
                Ok(Pacing::SectorPaced {
                    sector_table: self.sector_table,
                    start_address,
                    block_size,
                    pause_erase,
                    pause_settle: self.pause_short.unwrap_or(WRITE_SETTLE_PAUSE),
                })
            }
            _ => Err(invalid(
                "profile must set exactly one of page_size or block_size",
            )),
        }
    }
}

fn invalid(message: &str) -> AudioModemError {
    AudioModemError::InvalidConfig(message.to_string())
}
