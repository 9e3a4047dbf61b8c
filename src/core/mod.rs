//! Core regulatory map functionality
//!
//! This module contains the genomic interval index, link records, the
//! bipartite link graphs, the link filter policies and the map loader.

mod error;
mod filter;
mod graph;
mod index;
mod interval;
pub mod io;
mod link;
mod loader;

pub use error::{
    ConfigurationError, GraphError, GraphResult, IntervalError, LinkError, LinkMapError, LinkParseError, ParseResult, Result,
};
pub use filter::{FilterRun, LinkFilter, LinkFilterBuilder, LinkType, PromoterWindow, RunState, NOT_NEAREST_NEIGHBOR_DEPTH};
pub use graph::{by_confidence, by_distance, Adjacency, LocusGraph, RegulatoryGraph, TssGraph};
pub use index::{closest_in, find_range_start, Anchor, IntervalIndex, BIN_SIZE};
pub use interval::{default_overlaps, directional_start_overlaps, GenomicInterval, Strand};
pub use io::{open_text, CompressionFormat, LineIterator, SmartReader, TabFields};
pub use link::{LinkRef, LocusKey, MapLink, TssKey, LINK_FIELD_COUNT};
pub use loader::{parse_link_line, read_name_set, LoadStats, MapLoader};
