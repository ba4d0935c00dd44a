//! Writes prepared map plots as Parquet.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use arrow::array::{ArrayRef, Float32Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::plot::MapPlot;

/// One row per grid cell; unit, title, colormap and color-scale range ride
/// along in the schema metadata.
pub fn save_map(plot: &MapPlot, file_path: &Path) -> Result<()> {
    let n_cells = plot.lat.len() * plot.lon.len();
    let mut lons = Vec::with_capacity(n_cells);
    let mut lats = Vec::with_capacity(n_cells);
    let mut values = Vec::with_capacity(n_cells);

    for (j, lat) in plot.lat.iter().enumerate() {
        for (i, lon) in plot.lon.iter().enumerate() {
            lons.push(*lon);
            lats.push(*lat);
            values.push(plot.values[[j, i]]);
        }
    }

    let mut metadata = HashMap::new();
    metadata.insert("species".to_string(), plot.species.clone());
    metadata.insert("unit".to_string(), plot.unit.clone());
    metadata.insert("title".to_string(), plot.title.clone());
    metadata.insert("cmap".to_string(), plot.cmap.clone());
    if let Some(vmin) = plot.vmin {
        metadata.insert("vmin".to_string(), vmin.to_string());
    }
    if let Some(vmax) = plot.vmax {
        metadata.insert("vmax".to_string(), vmax.to_string());
    }
    metadata.insert(
        "lon_window".to_string(),
        format!("{},{}", plot.lon_window.0, plot.lon_window.1),
    );
    metadata.insert(
        "lat_window".to_string(),
        format!("{},{}", plot.lat_window.0, plot.lat_window.1),
    );

    let schema = Arc::new(
        Schema::new(vec![
            Field::new("lon", DataType::Float32, false),
            Field::new("lat", DataType::Float32, false),
            Field::new("value", DataType::Float32, false),
        ])
        .with_metadata(metadata),
    );

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float32Array::from(lons)),
        Arc::new(Float32Array::from(lats)),
        Arc::new(Float32Array::from(values)),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let file = File::create(file_path)?;
    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;

    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
