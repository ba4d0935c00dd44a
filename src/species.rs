//! Species name resolution.
//!
//! Maps a canonical species name to the GEOS-Chem tracers that must be
//! summed to reconstruct it, and to the matching MUMBA field / data file.
//! The tables are fixed; unknown species fall through to sensible defaults
//! and it is the loaders' job to decide whether that is an error.

use crate::error::{MumbaError, Result};

/// The four MUMBA data files the toolkit knows about.
pub const MUMBA_FILES: [&str; 4] = [
    "MUMBA_PTRMS_2012-12-21_2013-02-15.tab",
    "MUMBA_NOx_UOW_2012-11-21_2013-02-15.tab",
    "MUMBA_O3_2012-12-21_2013-02-15.tab",
    "MUMBA_MET_2012-12-21_2013-01-25.tab",
];

/// Converts a grouped species name to the list of GEOS-Chem tracer names
/// that sum to it. Species without an aggregation rule resolve to
/// themselves.
pub fn model_constituents(name: &str) -> Vec<String> {
    let tracers: &[&str] = match name.to_uppercase().as_str() {
        "MONOT" => &["MTPA", "LIMO", "MTPO"],
        "MVK_MACR" => &["MVK", "MACR"],
        "NOX" => &["NO", "NO2"],
        "SOA" => &[
            "SOAS", "SOAIE", "SOAME", "SOAGX", "SOAMG", "LVOCOA", "ISN1OA", "IONITA", "MONITA",
        ],
        _ => return vec![name.to_string()],
    };

    tracers.iter().map(|t| t.to_string()).collect()
}

/// Converts a GEOS-Chem species name to the matching MUMBA column label.
/// Unmapped names pass through unchanged.
pub fn obs_field(name: &str) -> String {
    match name.to_uppercase().as_str() {
        "CH2O" => "HCHO [ppbv]",
        "MOH" => "CH4O [ppbv]",
        "ALD2" => "Acetaldehyde [ppbv]",
        "ACET" => "Acetone [ppbv]",
        "ISOP" => "C5H8 [ppbv]",
        "MVK_MACR" => "Methacrolein + methyl vinyl ketone [ppbv]",
        "BENZ" => "C6H6 [ppbv]",
        "TOLU" => "C6H5CH3 [ppbv]",
        "MONOT" => "Monoterpenes [ppbv]",
        "NO" => "NO [ppbv]",
        "NO2" => "NO2 [ppbv]",
        "O3" => "O3 [ppbv] (mean of hourly O3 concentration)",
        "TMPU" => "TTT [C]",
        _ => return name.to_string(),
    }
    .to_string()
}

/// Picks the MUMBA data file holding a species, or `None` for species the
/// campaign did not measure.
pub fn obs_file(name: &str) -> Option<&'static str> {
    let fname = match name.to_uppercase().as_str() {
        "CH2O" | "MOH" | "ALD2" | "ACET" | "ISOP" | "MVK_MACR" | "BENZ" | "TOLU" | "MONOT" => {
            MUMBA_FILES[0]
        }
        "NO" | "NO2" | "NOX" => MUMBA_FILES[1],
        "O3" => MUMBA_FILES[2],
        "TMPU" => MUMBA_FILES[3],
        _ => return None,
    };

    Some(fname)
}

/// Number of lines preceding the header row in a MUMBA file. The headers
/// are human-edited and of fixed, known length per file; a file that is
/// mapped but missing here is a maintenance bug in these tables.
pub fn header_rows(fname: &str) -> Result<usize> {
    match fname {
        "MUMBA_PTRMS_2012-12-21_2013-02-15.tab" => Ok(25),
        "MUMBA_NOx_UOW_2012-11-21_2013-02-15.tab" => Ok(18),
        "MUMBA_O3_2012-12-21_2013-02-15.tab" => Ok(20),
        "MUMBA_MET_2012-12-21_2013-01-25.tab" => Ok(18),
        _ => Err(MumbaError::Configuration(format!(
            "no header offset known for MUMBA file {fname}"
        ))),
    }
}

// -- Tests -------------------------------------------------------------------
