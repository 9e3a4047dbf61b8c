//! Bipartite regulatory link graphs
//!
//! The same link set is viewed two ways: [`TssGraph`] maps each TSS to its
//! loci, [`LocusGraph`] maps each locus to its TSSes. Both share the
//! operations of [`RegulatoryGraph`] and convert into each other with
//! `invert`. Adjacency maps are ordered so iteration, output and
//! tie-breaking are deterministic.

use crate::core::error::{GraphError, GraphResult, LinkError};
use crate::core::link::{LinkRef, LocusKey, MapLink, TssKey};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

/// Origin-keyed adjacency: origin -> destination -> link
pub type Adjacency<O, D> = BTreeMap<O, BTreeMap<D, LinkRef>>;

/// Order links by confidence, most significant first
///
/// Equal confidences fall back to the `(tss, locus)` key, making this a
/// total order.
pub fn by_confidence(a: &MapLink, b: &MapLink) -> Ordering {
    a.confidence.total_cmp(&b.confidence).then_with(|| a.cmp(b))
}

/// Order links by absolute distance, closest first (key tie-break)
pub fn by_distance(a: &MapLink, b: &MapLink) -> Ordering {
    a.abs_link_length()
        .cmp(&b.abs_link_length())
        .then_with(|| a.cmp(b))
}

/// Operations shared by both graph views
pub trait RegulatoryGraph: Default + Clone {
    type Origin: Ord + Clone + fmt::Display;
    type Destination: Ord + Clone + fmt::Display;

    fn adjacency(&self) -> &Adjacency<Self::Origin, Self::Destination>;

    fn adjacency_mut(&mut self) -> &mut Adjacency<Self::Origin, Self::Destination>;

    fn origin_of(link: &MapLink) -> &Self::Origin;

    fn destination_of(link: &MapLink) -> &Self::Destination;

    /// Insert a link; the (origin, destination) pair must be new
    fn add(&mut self, link: LinkRef) -> GraphResult<()> {
        let destination = Self::destination_of(&link).clone();
        let edges = self
            .adjacency_mut()
            .entry(Self::origin_of(&link).clone())
            .or_default();

        if edges.contains_key(&destination) {
            return Err(GraphError::DuplicateLink {
                tss: link.tss.to_string(),
                locus: link.locus.to_string(),
            });
        }
        edges.insert(destination, link);
        Ok(())
    }

    /// Keep at most one edge per origin
    ///
    /// `link` replaces the origin's edges only when `is_better(link, existing)`
    /// holds for every stored edge. With a strict total order this keeps the
    /// global best whatever the arrival order. Returns whether `link` was kept.
    fn replace_best<F>(&mut self, link: LinkRef, is_better: F) -> bool
    where
        F: Fn(&MapLink, &MapLink) -> bool,
    {
        let origin = Self::origin_of(&link);
        if let Some(edges) = self.adjacency().get(origin) {
            if !edges.values().all(|existing| is_better(&link, existing)) {
                return false;
            }
        }

        let destination = Self::destination_of(&link).clone();
        let edges = self
            .adjacency_mut()
            .entry(Self::origin_of(&link).clone())
            .or_default();
        edges.clear();
        edges.insert(destination, link);
        true
    }

    /// Build from links; the first link for each pair wins
    fn from_links<I: IntoIterator<Item = LinkRef>>(links: I) -> Self {
        let mut graph = Self::default();
        for link in links {
            let destination = Self::destination_of(&link).clone();
            graph
                .adjacency_mut()
                .entry(Self::origin_of(&link).clone())
                .or_default()
                .entry(destination)
                .or_insert(link);
        }
        graph
    }

    /// Build from links, failing on a repeated pair
    fn try_from_links<I: IntoIterator<Item = LinkRef>>(links: I) -> GraphResult<Self> {
        let mut graph = Self::default();
        for link in links {
            graph.add(link)?;
        }
        Ok(graph)
    }

    /// Every edge in origin then destination order
    fn links(&self) -> Vec<&LinkRef> {
        self.adjacency().values().flat_map(|edges| edges.values()).collect()
    }

    /// The edge set, deduplicated by `(tss, locus)`
    fn distinct_links(&self) -> BTreeSet<LinkRef> {
        self.adjacency()
            .values()
            .flat_map(|edges| edges.values().cloned())
            .collect()
    }

    fn contains_link(&self, link: &MapLink) -> bool {
        self.adjacency()
            .get(Self::origin_of(link))
            .is_some_and(|edges| edges.contains_key(Self::destination_of(link)))
    }

    fn edges(&self, origin: &Self::Origin) -> Option<&BTreeMap<Self::Destination, LinkRef>> {
        self.adjacency().get(origin)
    }

    fn link_count(&self) -> usize {
        self.adjacency().values().map(|edges| edges.len()).sum()
    }

    fn origin_count(&self) -> usize {
        self.adjacency().len()
    }

    fn is_empty(&self) -> bool {
        self.adjacency().is_empty()
    }

    fn degree(&self, origin: &Self::Origin) -> usize {
        self.adjacency().get(origin).map_or(0, |edges| edges.len())
    }

    fn origin_degrees(&self) -> Vec<(&Self::Origin, usize)> {
        self.adjacency()
            .iter()
            .map(|(origin, edges)| (origin, edges.len()))
            .collect()
    }

    /// Histogram of origin degrees: entry `k` counts origins with `k` edges
    fn degree_distribution(&self) -> Vec<usize> {
        let max_degree = self.adjacency().values().map(|e| e.len()).max().unwrap_or(0);
        let mut histogram = vec![0usize; max_degree + 1];
        for edges in self.adjacency().values() {
            histogram[edges.len()] += 1;
        }
        histogram
    }

    /// Links passing `keep`; origins left without edges are dropped
    fn filter_links<F: Fn(&MapLink) -> bool>(&self, keep: F) -> Self {
        Self::from_links(
            self.adjacency()
                .values()
                .flat_map(|edges| edges.values())
                .filter(|link| keep(link))
                .cloned(),
        )
    }

    /// Fallible variant of [`filter_links`](Self::filter_links)
    fn try_filter_links<F>(&self, keep: F) -> Result<Self, LinkError>
    where
        F: Fn(&MapLink) -> Result<bool, LinkError>,
    {
        let mut kept = Vec::new();
        for link in self.adjacency().values().flat_map(|edges| edges.values()) {
            if keep(link)? {
                kept.push(Arc::clone(link));
            }
        }
        Ok(Self::from_links(kept))
    }

    /// Sort each origin's edges with `order` and keep what `select` picks
    fn select_per_origin<O, S>(&self, order: O, select: S) -> Self
    where
        O: Fn(&MapLink, &MapLink) -> Ordering,
        S: Fn(&[LinkRef]) -> Vec<LinkRef>,
    {
        let mut graph = Self::default();
        for edges in self.adjacency().values() {
            let mut sorted: Vec<LinkRef> = edges.values().cloned().collect();
            sorted.sort_by(|a, b| order(a, b));
            for link in select(&sorted) {
                let destination = Self::destination_of(&link).clone();
                graph
                    .adjacency_mut()
                    .entry(Self::origin_of(&link).clone())
                    .or_default()
                    .insert(destination, link);
            }
        }
        graph
    }

    /// The `n` closest edges of every origin
    fn nearest_neighbor_subgraph(&self, n: usize) -> Self {
        self.select_per_origin(by_distance, |sorted| sorted.iter().take(n).cloned().collect())
    }

    /// The `n` most significant edges of every origin
    fn best_n_subgraph(&self, n: usize) -> Self {
        self.select_per_origin(by_confidence, |sorted| sorted.iter().take(n).cloned().collect())
    }

    /// The `n` least significant edges of every origin
    fn worst_n_subgraph(&self, n: usize) -> Self {
        self.select_per_origin(
            |a, b| by_confidence(b, a),
            |sorted| sorted.iter().take(n).cloned().collect(),
        )
    }

    /// The median-confidence edge of every origin (upper median)
    fn median_subgraph(&self) -> Self {
        self.select_per_origin(by_confidence, |sorted| {
            sorted.get(sorted.len() / 2).cloned().into_iter().collect()
        })
    }

    /// Only the `n`-th most significant edge (1-based) of every origin,
    /// or its least significant edge when it has fewer than `n`
    fn best_nth_subgraph(&self, n: usize) -> Self {
        self.select_per_origin(by_confidence, |sorted| {
            sorted.iter().take(n).last().cloned().into_iter().collect()
        })
    }

    /// Strand-aware locus positions of every edge
    fn locus_positions(&self) -> Result<Vec<i64>, LinkError> {
        self.adjacency()
            .values()
            .flat_map(|edges| edges.values())
            .map(|link| link.locus_position())
            .collect()
    }

    fn transcripts(&self) -> BTreeSet<&TssKey> {
        self.adjacency()
            .values()
            .flat_map(|edges| edges.values())
            .map(|link| &link.tss)
            .collect()
    }

    fn loci(&self) -> BTreeSet<&LocusKey> {
        self.adjacency()
            .values()
            .flat_map(|edges| edges.values())
            .map(|link| &link.locus)
            .collect()
    }
}

/// TSS-origin view: TSS -> locus -> link
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TssGraph {
    adjacency: Adjacency<TssKey, LocusKey>,
}

/// Locus-origin view: locus -> TSS -> link
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocusGraph {
    adjacency: Adjacency<LocusKey, TssKey>,
}

impl RegulatoryGraph for TssGraph {
    type Origin = TssKey;
    type Destination = LocusKey;

    fn adjacency(&self) -> &Adjacency<TssKey, LocusKey> {
        &self.adjacency
    }

    fn adjacency_mut(&mut self) -> &mut Adjacency<TssKey, LocusKey> {
        &mut self.adjacency
    }

    fn origin_of(link: &MapLink) -> &TssKey {
        &link.tss
    }

    fn destination_of(link: &MapLink) -> &LocusKey {
        &link.locus
    }
}

impl RegulatoryGraph for LocusGraph {
    type Origin = LocusKey;
    type Destination = TssKey;

    fn adjacency(&self) -> &Adjacency<LocusKey, TssKey> {
        &self.adjacency
    }

    fn adjacency_mut(&mut self) -> &mut Adjacency<LocusKey, TssKey> {
        &mut self.adjacency
    }

    fn origin_of(link: &MapLink) -> &LocusKey {
        &link.locus
    }

    fn destination_of(link: &MapLink) -> &TssKey {
        &link.tss
    }
}

impl LocusGraph {
    /// Re-key every link by its TSS
    pub fn invert(&self) -> TssGraph {
        TssGraph::from_links(self.distinct_links())
    }
}

impl TssGraph {
    /// Re-key every link by its locus
    pub fn invert(&self) -> LocusGraph {
        LocusGraph::from_links(self.distinct_links())
    }

    /// Keep only the listed transcripts
    pub fn restrict_transcripts(&self, transcripts: &HashSet<String>) -> TssGraph {
        self.filter_links(|link| transcripts.contains(link.tss.as_str()))
    }

    /// Keep links at most `max_distance` away
    pub fn apply_range(&self, max_distance: i64) -> TssGraph {
        self.filter_links(|link| link.abs_link_length() <= max_distance)
    }

    /// Drop links closer than `min_distance`
    pub fn remove_range(&self, min_distance: i64) -> TssGraph {
        self.filter_links(|link| link.abs_link_length() >= min_distance)
    }

    /// Drop links within `upstream` bp before or `downstream` bp after the TSS
    pub fn remove_directional_range(&self, upstream: i64, downstream: i64) -> Result<TssGraph, LinkError> {
        self.try_filter_links(|link| {
            let position = link.locus_position()?;
            Ok((position < 0 && -position > upstream) || (position >= 0 && position > downstream))
        })
    }

    /// Keep links with confidence <= `threshold`
    pub fn apply_threshold(&self, threshold: f64) -> TssGraph {
        self.filter_links(|link| link.confidence <= threshold)
    }

    /// Keep links with confidence < `threshold`
    pub fn apply_threshold_exclusive(&self, threshold: f64) -> TssGraph {
        self.filter_links(|link| link.confidence < threshold)
    }

    /// Keep links with confidence >= `threshold`
    pub fn remove_threshold(&self, threshold: f64) -> TssGraph {
        self.filter_links(|link| link.confidence >= threshold)
    }

    /// Keep links with correlation > `threshold`
    pub fn apply_correlation(&self, threshold: f64) -> TssGraph {
        self.filter_links(|link| link.correlation > threshold)
    }

    /// Drop TSSes with `min_count` or more links
    pub fn remove_highly_connected(&self, min_count: usize) -> TssGraph {
        TssGraph {
            adjacency: self
                .adjacency
                .iter()
                .filter(|(_, edges)| edges.len() < min_count)
                .map(|(tss, edges)| (tss.clone(), edges.clone()))
                .collect(),
        }
    }

    /// Re-key links by gene name
    ///
    /// Each (gene, locus) pair keeps its most significant transcript link.
    /// Links without a gene name are dropped.
    pub fn convert_to_genes(&self) -> TssGraph {
        let mut best: BTreeMap<(TssKey, LocusKey), LinkRef> = BTreeMap::new();

        for link in self.adjacency.values().flat_map(|edges| edges.values()) {
            let Some(gene) = link.gene_name.as_deref() else {
                continue;
            };

            let mut gene_link = MapLink::clone(link);
            gene_link.tss = TssKey::new(gene);
            let gene_link = Arc::new(gene_link);
            let key = (gene_link.tss.clone(), gene_link.locus.clone());

            match best.get(&key) {
                Some(existing) if by_confidence(existing, &gene_link) != Ordering::Greater => {}
                _ => {
                    best.insert(key, gene_link);
                }
            }
        }

        TssGraph::from_links(best.into_values())
    }

    /// Nearest TSS of every locus
    pub fn locus_centric_nn_map(&self) -> LocusGraph {
        self.invert().nearest_neighbor_subgraph(1)
    }
}
