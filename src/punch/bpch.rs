//! Decoder for GEOS-Chem binary punch ("bpch") files.
//!
//! The format is a sequence of big-endian Fortran unformatted records: a
//! 40-byte `CTM bin 02` file-type record, an 80-byte title record, then one
//! (model header, data header, payload) record triple per stored data
//! block. Tracer numbers are resolved against the run's `tracerinfo.dat`
//! and `diaginfo.dat` tables.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::warn;
use ndarray::Array4;

use crate::error::{MumbaError, Result};

use super::metadata::{DiagTable, Tracer, TracerTable};
use super::{Grid, PunchRead, VariableData};

const FILE_TYPE: &str = "CTM bin 02";

/// Hours in a bpch `tau` value count from this epoch.
fn tau_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1985, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn tau_to_datetime(tau_hours: f64) -> NaiveDateTime {
    tau_epoch() + Duration::seconds((tau_hours * 3600.0).round() as i64)
}

/// One decoded data block (a single variable at a single output time).
#[derive(Debug)]
struct DataBlock {
    lonres: f32,
    latres: f32,
    halfpolar: bool,
    center180: bool,
    category: String,
    tracer: i32,
    unit: String,
    tau0: f64,
    ni: usize,
    nj: usize,
    nl: usize,
    ifirst: i32,
    jfirst: i32,
    data: Vec<f32>,
}

pub struct BpchDecoder {
    tracers: TracerTable,
    diag: DiagTable,
}

impl BpchDecoder {
    pub fn new(tracers: TracerTable, diag: DiagTable) -> Self {
        BpchDecoder { tracers, diag }
    }

    /// Builds a decoder from the `tracerinfo.dat` / `diaginfo.dat` pair
    /// living alongside the punch files in a run directory.
    pub fn for_run_dir(run_dir: &Path) -> Result<Self> {
        let tracers = TracerTable::from_file(&run_dir.join("tracerinfo.dat"))?;
        let diag = DiagTable::from_file(&run_dir.join("diaginfo.dat"))?;

        Ok(BpchDecoder::new(tracers, diag))
    }

    fn resolve_tracer(&self, block: &DataBlock) -> Option<&Tracer> {
        // Data headers may store the tracer number with or without the
        // category offset already applied.
        let number = self.diag.offset(&block.category) + block.tracer;
        self.tracers
            .get(number)
            .or_else(|| self.tracers.get(block.tracer))
    }

    fn assemble(
        &self,
        field: &str,
        category: &str,
        blocks: Vec<DataBlock>,
        tracer: Option<Tracer>,
        path: &Path,
    ) -> Result<VariableData> {
        let (Some(first), Some(tracer)) = (blocks.first(), tracer) else {
            return Err(MumbaError::decode(
                path.display(),
                format!("variable {field} not found in category {category}"),
            ));
        };

        let (ni, nj, nl) = (first.ni, first.nj, first.nl);
        if blocks
            .iter()
            .any(|b| (b.ni, b.nj, b.nl, b.ifirst, b.jfirst) != (ni, nj, nl, first.ifirst, first.jfirst))
        {
            return Err(MumbaError::decode(
                path.display(),
                format!("inconsistent dimensions across {field} blocks"),
            ));
        }

        let grid = Grid {
            lon: lon_centers(first.lonres, first.center180, first.ifirst, ni),
            lat: lat_centers(first.latres, first.halfpolar, first.jfirst, nj),
        };
        let times: Vec<NaiveDateTime> = blocks.iter().map(|b| tau_to_datetime(b.tau0)).collect();

        let mut values = Array4::<f32>::zeros((blocks.len(), nl, nj, ni));
        for (t, block) in blocks.iter().enumerate() {
            for l in 0..nl {
                for j in 0..nj {
                    for i in 0..ni {
                        // Payload is Fortran-ordered, longitude fastest
                        values[[t, l, j, i]] = block.data[i + ni * (j + nj * l)] * tracer.scale;
                    }
                }
            }
        }

        let unit = if tracer.unit.is_empty() {
            first.unit.clone()
        } else {
            tracer.unit.clone()
        };

        Ok(VariableData {
            name: field.to_string(),
            unit,
            carbon: tracer.carbon,
            times,
            grid,
            values,
        })
    }
}

impl PunchRead for BpchDecoder {
    fn read_file(
        &self,
        path: &Path,
        category: &str,
        fields: &[String],
    ) -> Result<Vec<VariableData>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let file_type = read_record(&mut reader, path)?
            .ok_or_else(|| MumbaError::decode(path.display(), "empty file"))?;
        if !String::from_utf8_lossy(&file_type).starts_with(FILE_TYPE) {
            return Err(MumbaError::decode(
                path.display(),
                format!("not a `{FILE_TYPE}` punch file"),
            ));
        }
        // Title record, unused
        read_record(&mut reader, path)?
            .ok_or_else(|| MumbaError::decode(path.display(), "missing title record"))?;

        let mut hits: Vec<(Vec<DataBlock>, Option<Tracer>)> =
            fields.iter().map(|_| (Vec::new(), None)).collect();

        while let Some(header1) = read_record(&mut reader, path)? {
            let header2 = read_record(&mut reader, path)?
                .ok_or_else(|| MumbaError::decode(path.display(), "truncated data block"))?;
            let payload = read_record(&mut reader, path)?
                .ok_or_else(|| MumbaError::decode(path.display(), "truncated data block"))?;

            let block = parse_block(&header1, &header2, &payload, path)?;
            if block.category != category {
                continue;
            }

            let Some(tracer) = self.resolve_tracer(&block) else {
                warn!(
                    "no tracerinfo entry for tracer {} in category {}",
                    block.tracer, block.category
                );
                continue;
            };

            if let Some(idx) = fields.iter().position(|f| f == &tracer.name) {
                hits[idx].1.get_or_insert_with(|| tracer.clone());
                hits[idx].0.push(block);
            }
        }

        fields
            .iter()
            .zip(hits)
            .map(|(field, (blocks, tracer))| self.assemble(field, category, blocks, tracer, path))
            .collect()
    }
}

/// Reads one Fortran sequential record. `None` at a clean end of file.
fn read_record(reader: &mut impl Read, path: &Path) -> Result<Option<Vec<u8>>> {
    let mut head = [0u8; 4];
    match reader.read_exact(&mut head) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = i32::from_be_bytes(head);
    if len < 0 {
        return Err(MumbaError::decode(path.display(), "negative record length"));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;

    let mut tail = [0u8; 4];
    reader.read_exact(&mut tail)?;
    if tail != head {
        return Err(MumbaError::decode(
            path.display(),
            "record length markers disagree",
        ));
    }

    Ok(Some(payload))
}

fn parse_block(
    header1: &[u8],
    header2: &[u8],
    payload: &[u8],
    path: &Path,
) -> Result<DataBlock> {
    if header1.len() != 36 || header2.len() != 168 {
        return Err(MumbaError::decode(
            path.display(),
            format!(
                "unexpected header record lengths ({}, {})",
                header1.len(),
                header2.len()
            ),
        ));
    }

    let lonres = be_f32(&header1[20..24]);
    let latres = be_f32(&header1[24..28]);
    let halfpolar = be_i32(&header1[28..32]) != 0;
    let center180 = be_i32(&header1[32..36]) != 0;

    let category = text_field(&header2[0..40]);
    let tracer = be_i32(&header2[40..44]);
    let unit = text_field(&header2[44..84]);
    let tau0 = be_f64(&header2[84..92]);
    let ni = be_i32(&header2[140..144]) as usize;
    let nj = be_i32(&header2[144..148]) as usize;
    let nl = be_i32(&header2[148..152]) as usize;
    let ifirst = be_i32(&header2[152..156]);
    let jfirst = be_i32(&header2[156..160]);

    if payload.len() != ni * nj * nl * 4 {
        return Err(MumbaError::decode(
            path.display(),
            format!(
                "payload of {} bytes does not match dimensions {}x{}x{}",
                payload.len(),
                ni,
                nj,
                nl
            ),
        ));
    }

    let data = payload
        .chunks_exact(4)
        .map(be_f32)
        .collect();

    Ok(DataBlock {
        lonres,
        latres,
        halfpolar,
        center180,
        category,
        tracer,
        unit,
        tau0,
        ni,
        nj,
        nl,
        ifirst,
        jfirst,
        data,
    })
}

/// Longitude cell centers for a subgrid starting at 1-based global index
/// `ifirst`. `center180` grids have a cell centered on the date line.
fn lon_centers(lonres: f32, center180: bool, ifirst: i32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let ig = (ifirst - 1 + i as i32) as f32;
            if center180 {
                -180.0 + lonres * ig
            } else {
                -180.0 + lonres * (ig + 0.5)
            }
        })
        .collect()
}

/// Latitude cell centers; on half-polar grids the southernmost global cell
/// is half-height with its center pulled toward the pole.
fn lat_centers(latres: f32, halfpolar: bool, jfirst: i32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|j| {
            let jg = jfirst - 1 + j as i32;
            if halfpolar && jg == 0 {
                -90.0 + latres / 4.0
            } else {
                -90.0 + latres * jg as f32
            }
        })
        .collect()
}

fn be_i32(bytes: &[u8]) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    i32::from_be_bytes(buf)
}

fn be_f32(bytes: &[u8]) -> f32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    f32::from_be_bytes(buf)
}

fn be_f64(bytes: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    f64::from_be_bytes(buf)
}

fn text_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;
    use std::fs;

    const TRACERINFO: &str = "\
NO       Nitrogen oxide                  3.00E-02  1        1  1.00E+09 ppbv
NO2      Nitrogen dioxide                4.60E-02  1       64  1.00E+09 ppbv
";

    const DIAGINFO: &str = "       0 IJ-AVG-$                                 Tracer concentration\n";

    fn push_record(buf: &mut Vec<u8>, payload: &[u8]) {
        let len = (payload.len() as i32).to_be_bytes();
        buf.extend_from_slice(&len);
        buf.extend_from_slice(payload);
        buf.extend_from_slice(&len);
    }

    fn padded(text: &str, width: usize) -> Vec<u8> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.resize(width, b' ');
        bytes
    }

    fn push_block(buf: &mut Vec<u8>, tracer: i32, tau0: f64, data: &[f32]) {
        // Model header: 2x2 subgrid of the 0.3125x0.25 nested grid
        let mut header1 = padded("GEOSFP", 20);
        header1.extend_from_slice(&0.3125f32.to_be_bytes());
        header1.extend_from_slice(&0.25f32.to_be_bytes());
        header1.extend_from_slice(&0i32.to_be_bytes());
        header1.extend_from_slice(&1i32.to_be_bytes());
        push_record(buf, &header1);

        // Data header
        let mut header2 = padded("IJ-AVG-$", 40);
        header2.extend_from_slice(&tracer.to_be_bytes());
        header2.extend_from_slice(&padded("v/v", 40));
        header2.extend_from_slice(&tau0.to_be_bytes());
        header2.extend_from_slice(&(tau0 + 1.0).to_be_bytes());
        header2.extend_from_slice(&padded("", 40));
        for dim in [2i32, 2, 1, 1059, 221, 1] {
            header2.extend_from_slice(&dim.to_be_bytes());
        }
        header2.extend_from_slice(&((data.len() * 4 + 8) as i32).to_be_bytes());
        push_record(buf, &header2);

        let payload: Vec<u8> = data.iter().flat_map(|v| v.to_be_bytes()).collect();
        push_record(buf, &payload);
    }

    fn write_test_file(dir: &Path, name: &str, blocks: &[(i32, f64, Vec<f32>)]) -> std::path::PathBuf {
        let mut buf = Vec::new();
        push_record(&mut buf, &padded(FILE_TYPE, 40));
        push_record(&mut buf, &padded("GEOS-CHEM binary punch file", 80));
        for (tracer, tau0, data) in blocks {
            push_block(&mut buf, *tracer, *tau0, data);
        }

        let path = dir.join(name);
        fs::write(&path, buf).unwrap();
        path
    }

    fn decoder() -> BpchDecoder {
        let tracers = TracerTable::parse(TRACERINFO, "tracerinfo.dat").unwrap();
        let diag = DiagTable::parse(DIAGINFO, "diaginfo.dat").unwrap();
        BpchDecoder::new(tracers, diag)
    }

    #[test]
    fn should_decode_two_tracers_over_two_times() {
        let dir = tempfile::tempdir().unwrap();
        // Stored in v/v; tracerinfo scale brings them to ppbv
        let path = write_test_file(
            dir.path(),
            "ts20130101.bpch",
            &[
                (1, 245448.0, vec![1e-9, 2e-9, 3e-9, 4e-9]),
                (64, 245448.0, vec![5e-9, 6e-9, 7e-9, 8e-9]),
                (1, 245449.0, vec![9e-9, 10e-9, 11e-9, 12e-9]),
                (64, 245449.0, vec![13e-9, 14e-9, 15e-9, 16e-9]),
            ],
        );

        let fields = vec!["NO".to_string(), "NO2".to_string()];
        let vars = decoder().read_file(&path, "IJ-AVG-$", &fields).unwrap();

        assert_eq!(vars.len(), 2);
        let no = &vars[0];
        assert_eq!(no.name, "NO");
        assert_eq!(no.unit, "ppbv");
        assert_eq!(no.carbon, Some(1.0));
        assert_eq!(no.values.shape(), &[2, 1, 2, 2]);

        // tau 245448 h after 1985-01-01 00:00 is 2013-01-01 00:00
        assert_eq!(
            no.times[0],
            NaiveDate::from_ymd_opt(2013, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(no.times[1] - no.times[0], Duration::hours(1));

        // Fortran payload order: longitude fastest
        assert_relative_eq!(no.values[[0, 0, 0, 0]], 1.0, epsilon = 1e-4);
        assert_relative_eq!(no.values[[0, 0, 0, 1]], 2.0, epsilon = 1e-4);
        assert_relative_eq!(no.values[[0, 0, 1, 0]], 3.0, epsilon = 1e-4);
        assert_relative_eq!(no.values[[1, 0, 1, 1]], 12.0, epsilon = 1e-4);

        let no2 = &vars[1];
        assert_relative_eq!(no2.values[[0, 0, 0, 0]], 5.0, epsilon = 1e-4);
        assert_relative_eq!(no2.values[[1, 0, 1, 1]], 16.0, epsilon = 1e-4);

        // Cell centers from resolution and 1-based global offsets
        assert_relative_eq!(no.grid.lon[0], -180.0 + 0.3125 * 1058.0);
        assert_relative_eq!(no.grid.lon[1], no.grid.lon[0] + 0.3125);
        assert_relative_eq!(no.grid.lat[0], -90.0 + 0.25 * 220.0);
    }

    #[test]
    fn should_fail_on_missing_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_file(
            dir.path(),
            "ts20130101.bpch",
            &[(1, 245448.0, vec![1e-9, 2e-9, 3e-9, 4e-9])],
        );

        let fields = vec!["O3".to_string()];
        let err = decoder()
            .read_file(&path, "IJ-AVG-$", &fields)
            .unwrap_err();

        assert!(matches!(err, MumbaError::Decode { .. }));
        assert!(err.to_string().contains("O3"));
    }

    #[test]
    fn should_reject_wrong_file_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut buf = Vec::new();
        push_record(&mut buf, &padded("CTM bin 4D", 40));
        push_record(&mut buf, &padded("title", 80));
        let path = dir.path().join("bad.bpch");
        fs::write(&path, buf).unwrap();

        let fields = vec!["NO".to_string()];
        let err = decoder()
            .read_file(&path, "IJ-AVG-$", &fields)
            .unwrap_err();

        assert!(matches!(err, MumbaError::Decode { .. }));
    }

    #[test]
    fn should_convert_tau_epoch() {
        assert_eq!(
            tau_to_datetime(0.0),
            NaiveDate::from_ymd_opt(1985, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn should_pull_halfpolar_edge_cell_toward_pole() {
        let lats = lat_centers(2.0, true, 1, 3);
        assert_relative_eq!(lats[0], -89.5);
        assert_relative_eq!(lats[1], -88.0);
        assert_relative_eq!(lats[2], -86.0);
    }
}
