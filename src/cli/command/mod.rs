pub mod fetch;
pub mod map;
pub mod timeseries;

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::{Datelike, Local, NaiveDate};

pub use fetch::fetch_obs;
pub use map::map;
pub use timeseries::timeseries;

/// Output files are named for the plot kind, species and today's date.
pub fn make_output_file_name(kind: &str, species_name: &str) -> PathBuf {
    let today = Local::now();
    let file_name = format!(
        "mumba-{}-{}-{}-{:02}-{:02}.parquet",
        kind,
        species_name.to_lowercase(),
        today.year(),
        today.month(),
        today.day()
    );

    dirs::home_dir().unwrap().join(file_name)
}

/// Inclusive date range from the optional endpoints; both or neither.
pub fn date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Option<(NaiveDate, NaiveDate)>> {
    match (start, end) {
        (Some(start), Some(end)) => {
            if end < start {
                bail!("end date {end} precedes start date {start}");
            }
            Ok(Some((start, end)))
        }
        (None, None) => Ok(None),
        _ => bail!("--start and --end must be given together"),
    }
}

// -- Tests -------------------------------------------------------------------
