//! Link map loading
//!
//! Streams a tab-separated link file, gates every record through the
//! restriction sets and thresholds of a [`LinkFilter`], folds the survivors
//! into a [`FilterRun`](crate::core::filter::FilterRun) and post-processes
//! at end of input. Malformed records stop the load.

use crate::core::error::{LinkParseError, ParseResult, Result};
use crate::core::filter::LinkFilter;
use crate::core::graph::{RegulatoryGraph, TssGraph};
use crate::core::io::{is_skippable, open_text, LineIterator, TabFields, LINE_PROGRESS_INTERVAL};
use crate::core::link::{MapLink, LINK_FIELD_COUNT};
use log::{debug, info};
use std::collections::HashSet;
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::Arc;

/// Counters collected while loading a map
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadStats {
    /// Records read (blank and comment lines excluded)
    pub total: usize,
    /// Records outside the transcript or locus restriction sets
    pub restricted: usize,
    /// Records failing a threshold
    pub rejected: usize,
    /// Records handed to the link policy
    pub applied: usize,
    /// Links in the final map
    pub final_links: usize,
}

/// Parse one link file record
///
/// The locus key is parsed eagerly here so a malformed key is reported with
/// its line number.
pub fn parse_link_line(line: &[u8], line_number: usize) -> ParseResult<MapLink> {
    let mut fields: Vec<&str> = Vec::with_capacity(LINK_FIELD_COUNT);
    for field in TabFields::new(line) {
        let field = std::str::from_utf8(field).map_err(|_| LinkParseError::InvalidUtf8 { line: line_number })?;
        fields.push(field);
    }

    let link = MapLink::from_fields(&fields, line_number)?;
    link.locus
        .validate()
        .map_err(|_| LinkParseError::InvalidLocusKey {
            line: line_number,
            key: link.locus.to_string(),
        })?;
    Ok(link)
}

/// Builds filtered maps from link files
#[derive(Debug, Clone)]
pub struct MapLoader {
    filter: LinkFilter,
}

impl MapLoader {
    pub fn new(filter: LinkFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &LinkFilter {
        &self.filter
    }

    /// Load and filter a map from any line source
    pub fn load<R: BufRead>(&self, reader: R) -> Result<(TssGraph, LoadStats)> {
        let mut run = self.filter.run();
        let mut stats = LoadStats::default();
        let mut lines = LineIterator::new(reader);

        loop {
            let line_number = lines.line_number() + 1;
            let line = match lines.next_line() {
                Some(line) => line?,
                None => break,
            };
            if is_skippable(line) {
                continue;
            }

            stats.total += 1;
            let link = parse_link_line(line, line_number)?;

            if !self.filter.passes_restrictions(&link) {
                stats.restricted += 1;
                continue;
            }
            if !self.filter.is_valid(&link)? {
                stats.rejected += 1;
                continue;
            }

            run.apply(Arc::new(link))?;
            stats.applied += 1;

            if stats.total % LINE_PROGRESS_INTERVAL == 0 {
                debug!("Read {} link records ({} applied)", stats.total, stats.applied);
            }
        }

        let graph = run.finish();
        stats.final_links = graph.link_count();

        info!(
            "Loaded {} link records: {} restricted, {} rejected by thresholds, {} applied, {} links after {}",
            stats.total,
            stats.restricted,
            stats.rejected,
            stats.applied,
            stats.final_links,
            self.filter.link_type()
        );
        Ok((graph, stats))
    }

    /// Load a plain, gzip or bzip2 compressed link file
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<(TssGraph, LoadStats)> {
        let path = path.as_ref();
        info!("Loading link map from {}", path.display());
        self.load(open_text(path)?)
    }
}

/// Read a one-name-per-line set (blank and `#` lines skipped)
pub fn read_name_set<P: AsRef<Path>>(path: P) -> io::Result<HashSet<String>> {
    let mut names = HashSet::new();
    for line in open_text(path)?.lines() {
        let line = line?;
        let name = line.trim();
        if !name.is_empty() && !name.starts_with('#') {
            names.insert(name.to_string());
        }
    }
    Ok(names)
}
