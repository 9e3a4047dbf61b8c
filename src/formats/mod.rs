//! File format adapters
//!
//! BED interval input and link map output.

pub mod bed;
pub mod map;

pub use bed::{read_bed, read_bed_file, BedLayout, BedParseError};
pub use map::{write_map, write_map_file};
