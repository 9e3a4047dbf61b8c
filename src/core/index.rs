//! Interval index for efficient coordinate queries
//!
//! Intervals are partitioned by chromosome and bucketed into fixed-width
//! bins keyed by `start / BIN_SIZE`. Overlap queries touch only the bins
//! that can hold an overlapping start, so their cost is
//! O(bins touched × bucket size) instead of O(n).
//!
//! Derived views (bins, start/end/mid orderings, maximum interval length)
//! are built on first query and dropped on every mutation. Mutation needs
//! `&mut self`, so queries never observe a stale view.

use crate::core::interval::{default_overlaps, GenomicInterval};
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Width of an index bin in base pairs
pub const BIN_SIZE: i64 = 100_000;

/// Coordinate used to order intervals for nearest-position lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    #[default]
    Start,
    End,
    Mid,
}

impl Anchor {
    /// The anchored coordinate of an interval
    pub fn position(&self, interval: &GenomicInterval) -> i64 {
        match self {
            Anchor::Start => interval.start,
            Anchor::End => interval.end,
            Anchor::Mid => interval.mid(),
        }
    }
}

/// Frozen per-chromosome views
#[derive(Debug, Clone)]
struct ChromosomeView {
    by_start: Vec<Arc<GenomicInterval>>,
    by_end: Vec<Arc<GenomicInterval>>,
    by_mid: Vec<Arc<GenomicInterval>>,
    bins: HashMap<i64, Vec<Arc<GenomicInterval>>>,
    max_len: i64,
}

impl ChromosomeView {
    fn build(intervals: Vec<Arc<GenomicInterval>>) -> Self {
        let mut by_start = intervals;
        by_start.sort_by(|a, b| (a.start, a.end, &a.name).cmp(&(b.start, b.end, &b.name)));

        let mut by_end = by_start.clone();
        by_end.sort_by(|a, b| (a.end, a.start, &a.name).cmp(&(b.end, b.start, &b.name)));

        let mut by_mid = by_start.clone();
        by_mid.sort_by(|a, b| (a.mid(), a.start, &a.name).cmp(&(b.mid(), b.start, &b.name)));

        let mut bins: HashMap<i64, Vec<Arc<GenomicInterval>>> = HashMap::new();
        for interval in &by_start {
            bins.entry(interval.start.div_euclid(BIN_SIZE))
                .or_default()
                .push(Arc::clone(interval));
        }

        let max_len = by_start.iter().map(|iv| iv.len()).max().unwrap_or(0);

        Self {
            by_start,
            by_end,
            by_mid,
            bins,
            max_len,
        }
    }

    fn ordered(&self, anchor: Anchor) -> &[Arc<GenomicInterval>] {
        match anchor {
            Anchor::Start => &self.by_start,
            Anchor::End => &self.by_end,
            Anchor::Mid => &self.by_mid,
        }
    }
}

/// Chromosome-partitioned, bin-indexed interval store
///
/// Intervals are keyed by name; adding an interval with an existing name
/// replaces it.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    intervals: HashMap<String, Arc<GenomicInterval>>,
    views: OnceLock<HashMap<String, ChromosomeView>>,
}

impl IntervalIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a collection of intervals
    ///
    /// When several intervals share a name the first one is kept.
    pub fn from_intervals<I: IntoIterator<Item = GenomicInterval>>(intervals: I) -> Self {
        let mut index = Self::new();
        let mut duplicates = 0usize;

        for interval in intervals {
            if index.intervals.contains_key(&interval.name) {
                duplicates += 1;
                continue;
            }
            index.intervals.insert(interval.name.clone(), Arc::new(interval));
        }

        if duplicates > 0 {
            warn!("{} intervals with duplicate names were ignored", duplicates);
        }
        index
    }

    /// Add an interval, returning the one it replaced
    pub fn add(&mut self, interval: GenomicInterval) -> Option<GenomicInterval> {
        self.invalidate();
        self.intervals
            .insert(interval.name.clone(), Arc::new(interval))
            .map(Arc::unwrap_or_clone)
    }

    /// Remove an interval by name
    pub fn remove(&mut self, name: &str) -> Option<GenomicInterval> {
        self.invalidate();
        self.intervals.remove(name).map(Arc::unwrap_or_clone)
    }

    /// Remove several intervals, returning how many were present
    pub fn remove_many<'a, I: IntoIterator<Item = &'a str>>(&mut self, names: I) -> usize {
        self.invalidate();
        names
            .into_iter()
            .filter(|name| self.intervals.remove(*name).is_some())
            .count()
    }

    fn invalidate(&mut self) {
        self.views.take();
    }

    fn views(&self) -> &HashMap<String, ChromosomeView> {
        self.views.get_or_init(|| {
            let mut by_chrom: HashMap<String, Vec<Arc<GenomicInterval>>> = HashMap::new();
            for interval in self.intervals.values() {
                by_chrom
                    .entry(interval.chrom.clone())
                    .or_default()
                    .push(Arc::clone(interval));
            }

            let views: HashMap<String, ChromosomeView> = by_chrom
                .into_iter()
                .map(|(chrom, intervals)| (chrom, ChromosomeView::build(intervals)))
                .collect();

            debug!(
                "Built interval index views: {} chromosomes, {} intervals",
                views.len(),
                self.intervals.len()
            );
            views
        })
    }

    /// Get an interval by name
    pub fn get(&self, name: &str) -> Option<&GenomicInterval> {
        self.intervals.get(name).map(|iv| iv.as_ref())
    }

    /// Check if an interval with this name is stored
    pub fn contains(&self, name: &str) -> bool {
        self.intervals.contains_key(name)
    }

    /// All interval names (unordered)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.intervals.keys().map(|s| s.as_str())
    }

    /// Indexed chromosome names, sorted
    pub fn chromosomes(&self) -> Vec<&str> {
        let mut chroms: Vec<&str> = self.views().keys().map(|s| s.as_str()).collect();
        chroms.sort_unstable();
        chroms
    }

    /// Check if a chromosome has any intervals
    pub fn has_chrom(&self, chrom: &str) -> bool {
        self.views().contains_key(chrom)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of intervals on a chromosome
    pub fn interval_count(&self, chrom: &str) -> usize {
        self.views().get(chrom).map(|v| v.by_start.len()).unwrap_or(0)
    }

    /// Longest interval on a chromosome
    pub fn max_interval_len(&self, chrom: &str) -> Option<i64> {
        self.views().get(chrom).map(|v| v.max_len)
    }

    /// Intervals on a chromosome ordered by the given anchor
    pub fn ordered(&self, chrom: &str, anchor: Anchor) -> Vec<&GenomicInterval> {
        self.views()
            .get(chrom)
            .map(|v| v.ordered(anchor).iter().map(|iv| iv.as_ref()).collect())
            .unwrap_or_default()
    }

    /// All stored intervals overlapping `query` (half-open overlap)
    pub fn overlapping(&self, query: &GenomicInterval) -> Vec<&GenomicInterval> {
        self.overlapping_with(query, default_overlaps)
    }

    /// All stored intervals for which `predicate(query, candidate)` holds
    ///
    /// Only candidates whose start lies within the query span widened by the
    /// larger of the query length and the chromosome's longest interval are
    /// tested, so the predicate must imply that proximity (both
    /// [`default_overlaps`] and
    /// [`directional_start_overlaps`](crate::core::directional_start_overlaps) do).
    /// An unindexed chromosome yields no results.
    pub fn overlapping_with<F>(&self, query: &GenomicInterval, predicate: F) -> Vec<&GenomicInterval>
    where
        F: Fn(&GenomicInterval, &GenomicInterval) -> bool,
    {
        let view = match self.views().get(&query.chrom) {
            Some(v) => v,
            None => return Vec::new(),
        };

        let max_flank = query.len().max(view.max_len);
        let first_bin = (query.start - max_flank).div_euclid(BIN_SIZE);
        let last_bin = (query.end + max_flank).div_euclid(BIN_SIZE);

        // Wide queries on sparse chromosomes walk the occupied bins instead
        let span = (last_bin - first_bin + 1) as usize;
        let buckets: Vec<&Vec<Arc<GenomicInterval>>> = if span > view.bins.len() {
            let mut occupied: Vec<(&i64, &Vec<Arc<GenomicInterval>>)> = view
                .bins
                .iter()
                .filter(|(bin, _)| (first_bin..=last_bin).contains(*bin))
                .collect();
            occupied.sort_unstable_by_key(|(bin, _)| **bin);
            occupied.into_iter().map(|(_, bucket)| bucket).collect()
        } else {
            (first_bin..=last_bin).filter_map(|bin| view.bins.get(&bin)).collect()
        };

        buckets
            .into_iter()
            .flatten()
            .filter(|candidate| predicate(query, candidate.as_ref()))
            .map(|candidate| candidate.as_ref())
            .collect()
    }

    /// Answer many overlap queries in parallel
    ///
    /// Views are frozen before the parallel phase starts; result `i` belongs
    /// to `queries[i]`.
    pub fn overlapping_many(&self, queries: &[GenomicInterval]) -> Vec<Vec<&GenomicInterval>> {
        self.views();
        queries.par_iter().map(|q| self.overlapping(q)).collect()
    }

    /// Interval whose anchor coordinate is closest to `position`
    ///
    /// Ties go to the interval that comes first in the anchor ordering.
    pub fn closest(&self, chrom: &str, position: i64, anchor: Anchor) -> Option<&GenomicInterval> {
        let items = self.views().get(chrom)?.ordered(anchor);
        closest_in(items, position, |iv| anchor.position(iv)).map(|i| items[i].as_ref())
    }

    /// Nearest interval strictly upstream (start < position) or downstream
    /// (start >= position) of `position`
    ///
    /// Returns `None` when there is no flanking interval on that side.
    pub fn closest_directional(
        &self,
        chrom: &str,
        position: i64,
        upstream: bool,
    ) -> Option<&GenomicInterval> {
        let items = self.views().get(chrom)?.ordered(Anchor::Start);
        let index = find_range_start(items, |iv| iv.start < position);

        if upstream {
            index.checked_sub(1).map(|i| items[i].as_ref())
        } else {
            items.get(index).map(|iv| iv.as_ref())
        }
    }

    /// Closest interval by midpoint among those whose start and end are both
    /// more than `range` away from `position`
    pub fn closest_excluding(&self, chrom: &str, position: i64, range: i64) -> Option<&GenomicInterval> {
        let candidates: Vec<&GenomicInterval> = self
            .views()
            .get(chrom)?
            .ordered(Anchor::Mid)
            .iter()
            .map(|iv| iv.as_ref())
            .filter(|iv| (iv.start - position).abs() > range && (iv.end - position).abs() > range)
            .collect();

        closest_in(&candidates, position, |iv| iv.mid()).map(|i| candidates[i])
    }

    /// Intervals of `self` on `chrom` overlapping any interval of `other`
    /// widened by `buffer` on both sides
    pub fn intersect_left(&self, other: &IntervalIndex, chrom: &str, buffer: i64) -> Vec<&GenomicInterval> {
        if !other.has_chrom(chrom) {
            return Vec::new();
        }

        self.ordered(chrom, Anchor::Start)
            .into_iter()
            .filter(|iv| !other.overlapping(&iv.widened(buffer)).is_empty())
            .collect()
    }
}

/// First index `i` such that `is_before(items[i])` is false
///
/// `is_before` must be monotonic over `items` (true for a prefix, false for
/// the rest), which holds when it compares the same coordinate the slice is
/// sorted by. Mixing orderings is a caller error that is not detected.
pub fn find_range_start<T, F>(items: &[T], is_before: F) -> usize
where
    F: Fn(&T) -> bool,
{
    items.partition_point(is_before)
}

/// Index of the item whose `key` is closest to `position`
///
/// `items` must be sorted ascending by `key`. Positions before the first or
/// after the last item clamp to that item; on a distance tie the item that
/// appears first wins.
pub fn closest_in<T, F>(items: &[T], position: i64, key: F) -> Option<usize>
where
    F: Fn(&T) -> i64,
{
    if items.is_empty() {
        return None;
    }

    let index = find_range_start(items, |item| key(item) < position);

    // First item sharing the key of items[i]
    let first_with_key = |i: usize| {
        let value = key(&items[i]);
        find_range_start(items, |item| key(item) < value)
    };

    if index == 0 {
        return Some(0);
    }
    if index == items.len() {
        return Some(first_with_key(items.len() - 1));
    }

    let left = index - 1;
    let left_distance = position - key(&items[left]);
    let right_distance = key(&items[index]) - position;

    if left_distance <= right_distance {
        Some(first_with_key(left))
    } else {
        Some(index)
    }
}
