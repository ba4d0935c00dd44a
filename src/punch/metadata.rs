//! Parsers for the `tracerinfo.dat` and `diaginfo.dat` metadata files.
//!
//! Both are fixed-width text files in the GAMAP convention:
//!
//! ```text
//! tracerinfo.dat: NAME(a8) x FULLNAME(a30) MOLWT(e10) C(i3) TRACER(i9) SCALE(e10) x UNIT(a40)
//! diaginfo.dat:   OFFSET(i8) x CATEGORY(a40) x COMMENT
//! ```
//!
//! Lines starting with `#` are comments.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::warn;

use crate::error::{MumbaError, Result};

#[derive(Debug, Clone)]
pub struct Tracer {
    pub name: String,
    pub full_name: String,
    pub number: i32,
    /// Carbon number; `None` when the column was blank or malformed.
    pub carbon: Option<f32>,
    /// Scale factor from stored values to `unit` (e.g. 1.0e9 for ppbv).
    pub scale: f32,
    pub unit: String,
}

/// Tracer metadata keyed by tracer number.
#[derive(Debug, Clone, Default)]
pub struct TracerTable {
    tracers: HashMap<i32, Tracer>,
}

impl TracerTable {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let mut tracers = HashMap::new();

        for line in text.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            match parse_tracer_line(line) {
                Some(tracer) => {
                    tracers.insert(tracer.number, tracer);
                }
                None => warn!("skipping malformed tracerinfo line in {origin}: {line}"),
            }
        }

        if tracers.is_empty() {
            return Err(MumbaError::decode(origin, "no tracers found"));
        }

        Ok(TracerTable { tracers })
    }

    pub fn get(&self, number: i32) -> Option<&Tracer> {
        self.tracers.get(&number)
    }

    pub fn len(&self) -> usize {
        self.tracers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracers.is_empty()
    }
}

fn parse_tracer_line(line: &str) -> Option<Tracer> {
    let name = field(line, 0, 8)?.to_string();
    let full_name = field(line, 9, 39).unwrap_or_default().to_string();
    let carbon = field(line, 49, 52).and_then(|s| s.parse::<f32>().ok());
    let number = field(line, 52, 61)?.parse::<i32>().ok()?;
    let scale = field(line, 61, 71)
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(1.0);
    let unit = line
        .get(72..)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    Some(Tracer {
        name,
        full_name,
        number,
        carbon,
        scale,
        unit,
    })
}

/// Per-category tracer-number offsets.
#[derive(Debug, Clone, Default)]
pub struct DiagTable {
    offsets: HashMap<String, i32>,
}

impl DiagTable {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let mut offsets = HashMap::new();

        for line in text.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let offset = field(line, 0, 8).and_then(|s| s.parse::<i32>().ok());
            let category = field(line, 9, 49);
            match (offset, category) {
                (Some(offset), Some(category)) => {
                    offsets.insert(category.to_string(), offset);
                }
                _ => warn!("skipping malformed diaginfo line in {origin}: {line}"),
            }
        }

        Ok(DiagTable { offsets })
    }

    /// Tracer-number offset for a category; unknown categories use 0.
    pub fn offset(&self, category: &str) -> i32 {
        self.offsets.get(category).copied().unwrap_or(0)
    }
}

/// Trimmed fixed-width field, `None` when blank or out of range.
fn field(line: &str, start: usize, end: usize) -> Option<&str> {
    let end = end.min(line.len());
    if start >= end {
        return None;
    }
    let trimmed = line[start..end].trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;

    const TRACERINFO: &str = "\
# GEOS-CHEM tracers
#
NO       Nitrogen oxide                  3.00E-02  1        1  1.00E+09 ppbv
NO2      Nitrogen dioxide                4.60E-02  1       64  1.00E+09 ppbv
ISOP     Isoprene                        1.20E-02  5        6  1.00E+09 ppbC
";

    const DIAGINFO: &str = "\
# offsets per category
       0 IJ-AVG-$                                 Tracer concentration
  100000 DAO-3D-$                                 GMAO 3-D fields
";

    #[test]
    fn should_parse_tracerinfo() {
        let table = TracerTable::parse(TRACERINFO, "tracerinfo.dat").unwrap();

        assert_eq!(table.len(), 3);

        let isop = table.get(6).unwrap();
        assert_eq!(isop.name, "ISOP");
        assert_eq!(isop.carbon, Some(5.0));
        assert_eq!(isop.scale, 1.0e9);
        assert_eq!(isop.unit, "ppbC");

        let no2 = table.get(64).unwrap();
        assert_eq!(no2.name, "NO2");
        assert_eq!(no2.full_name, "Nitrogen dioxide");
    }

    #[test]
    fn should_error_on_empty_tracerinfo() {
        let parsed = TracerTable::parse("# only comments\n", "tracerinfo.dat");
        assert!(parsed.is_err());
    }

    #[test]
    fn should_parse_diaginfo_offsets() {
        let table = DiagTable::parse(DIAGINFO, "diaginfo.dat").unwrap();

        assert_eq!(table.offset("IJ-AVG-$"), 0);
        assert_eq!(table.offset("DAO-3D-$"), 100000);
        // Unknown categories fall back to no offset
        assert_eq!(table.offset("PEDGE-$"), 0);
    }
}
