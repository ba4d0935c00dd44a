//! Unit conversion.
//!
//! Hydrocarbon tracers are archived on a per-carbon basis (ppbC); dividing
//! by the tracer's carbon number converts them to volume units. The
//! temperature field additionally comes out of the model in kelvin.

use log::info;

use crate::punch::VariableData;

pub const KELVIN_OFFSET: f32 = 273.15;

/// GEOS-Chem's temperature field name.
pub const TEMPERATURE: &str = "TMPU";

/// Carbon-basis scale factor for a loaded variable. Variables without the
/// attribute convert by 1.0.
pub fn carbon_scale(var: &VariableData) -> f32 {
    match var.carbon {
        Some(c) => c,
        None => {
            info!("no C value found for {}", var.name);
            1.0
        }
    }
}

/// Converts a loaded variable in place: ppbC to ppbv where the tracer
/// carries a carbon number, and kelvin to Celsius for temperature.
pub fn convert(var: &mut VariableData, species_name: &str) {
    let conv = carbon_scale(var);
    if conv != 1.0 {
        info!("dividing {} by {} to convert from ppbC to ppbv", var.name, conv);
        var.values.mapv_inplace(|v| v / conv);
    }

    if species_name.to_uppercase() == TEMPERATURE {
        var.values.mapv_inplace(|v| v - KELVIN_OFFSET);
        var.unit = "C".to_string();
    }
}

// -- Tests -------------------------------------------------------------------
