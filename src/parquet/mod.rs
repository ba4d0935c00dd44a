//! Handles serialising and saving prepared plots in the _parquet_ file format.

pub mod map;
pub mod timeseries;

pub use map::save_map;
pub use timeseries::save_timeseries;
