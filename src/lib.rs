//! cislink - cis-regulatory link maps
//!
//! Builds and filters bipartite maps of candidate regulatory links between
//! genomic loci (enhancers, DHS regions) and transcription start sites.
//!
//! # Features
//!
//! - Binned, chromosome-partitioned interval index with overlap and
//!   nearest-feature queries
//! - TSS-keyed and locus-keyed views of the same link set
//! - Seventeen link reduction policies (nearest locus, best link, distal, ...)
//! - Streaming loader for plain, gzip and bzip2 link files
//!
//! # Example
//!
//! ```ignore
//! use cislink::{LinkFilter, LinkType, MapLoader, RegulatoryGraph};
//!
//! let filter = LinkFilter::builder()
//!     .link_type(LinkType::BestLocusLink)
//!     .max_distance(1_000_000)
//!     .confidence_threshold(0.05)
//!     .build()?;
//!
//! let (map, stats) = MapLoader::new(filter).load_file("links.tsv.gz")?;
//! println!("{} links kept of {}", map.link_count(), stats.total);
//! ```

pub mod core;
pub mod formats;

// Re-export commonly used types
pub use core::{
    Anchor, ConfigurationError, GenomicInterval, GraphError, IntervalIndex, LinkError, LinkFilter, LinkMapError,
    LinkParseError, LinkRef, LinkType, LoadStats, LocusGraph, LocusKey, MapLink, MapLoader, RegulatoryGraph,
    Strand, TssGraph, TssKey,
};
pub use formats::{bed, map};
