//! Link filter policies
//!
//! A [`LinkFilter`] holds the validated thresholds and the [`LinkType`]
//! reduction rule. Feeding links into a [`FilterRun`] builds the TSS and
//! locus views incrementally; [`FilterRun::post_process`] turns them into the
//! final TSS-keyed map.
//!
//! Every keep-best step uses a total order (metric first, then the
//! `(tss, locus)` key), so the final map does not depend on the order in
//! which links arrive. Nearest-neighbour tests in the relational policies
//! compare distance only: every link tied for nearest counts as nearest.

use crate::core::error::{ConfigurationError, GraphError, LinkError, LinkMapError, Result};
use crate::core::graph::{by_confidence, by_distance, LocusGraph, RegulatoryGraph, TssGraph};
use crate::core::link::{LinkRef, LocusKey, MapLink, TssKey};
use log::{debug, info};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Locus neighbourhood examined by [`LinkType::NotNearestLocusOrGene`]
pub const NOT_NEAREST_NEIGHBOR_DEPTH: usize = 5;

/// Graph reduction rule applied while a map is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkType {
    /// Every valid link
    #[default]
    Any,
    /// Closest locus of each TSS
    NearestLocus,
    /// Closest TSS of each locus
    NearestGene,
    /// Most significant of the nearest-gene links of each TSS
    NearestBestGene,
    /// Union of nearest locus and nearest gene links
    NearestLocusOrGene,
    /// Links that are both nearest locus and nearest gene
    NearestLocusAndGene,
    /// Closest of the nearest-gene links of each TSS
    NearestLocusOfNearestGene,
    /// Most significant locus of each TSS
    BestLocusLink,
    /// Least significant locus of each TSS
    WorstLocusLink,
    /// Most significant locus of each TSS that is also its locus's nearest gene
    BestLocusNearestGene,
    /// Links that are most significant from both ends
    BestLocusBestGene,
    /// Most significant TSS of each locus
    BestGeneLink,
    /// All links except each TSS's closest locus
    NotNearestLocus,
    /// All links except each locus's closest TSS
    NotNearestGene,
    /// Links within a locus's nearest TSSes that are neither nearest locus nor nearest gene
    NotNearestLocusOrGene,
    /// Most significant links that are neither nearest locus nor nearest gene
    BestLocusNotNearestLocusOrGene,
    /// Most significant link of each TSS that is neither nearest locus nor nearest gene
    BestDistalLocus,
}

impl LinkType {
    pub const ALL: [LinkType; 17] = [
        LinkType::Any,
        LinkType::NearestLocus,
        LinkType::NearestGene,
        LinkType::NearestBestGene,
        LinkType::NearestLocusOrGene,
        LinkType::NearestLocusAndGene,
        LinkType::NearestLocusOfNearestGene,
        LinkType::BestLocusLink,
        LinkType::WorstLocusLink,
        LinkType::BestLocusNearestGene,
        LinkType::BestLocusBestGene,
        LinkType::BestGeneLink,
        LinkType::NotNearestLocus,
        LinkType::NotNearestGene,
        LinkType::NotNearestLocusOrGene,
        LinkType::BestLocusNotNearestLocusOrGene,
        LinkType::BestDistalLocus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LinkType::Any => "Any",
            LinkType::NearestLocus => "NearestLocus",
            LinkType::NearestGene => "NearestGene",
            LinkType::NearestBestGene => "NearestBestGene",
            LinkType::NearestLocusOrGene => "NearestLocusOrGene",
            LinkType::NearestLocusAndGene => "NearestLocusAndGene",
            LinkType::NearestLocusOfNearestGene => "NearestLocusOfNearestGene",
            LinkType::BestLocusLink => "BestLocusLink",
            LinkType::WorstLocusLink => "WorstLocusLink",
            LinkType::BestLocusNearestGene => "BestLocusNearestGene",
            LinkType::BestLocusBestGene => "BestLocusBestGene",
            LinkType::BestGeneLink => "BestGeneLink",
            LinkType::NotNearestLocus => "NotNearestLocus",
            LinkType::NotNearestGene => "NotNearestGene",
            LinkType::NotNearestLocusOrGene => "NotNearestLocusOrGene",
            LinkType::BestLocusNotNearestLocusOrGene => "BestLocusNotNearestLocusOrGene",
            LinkType::BestDistalLocus => "BestDistalLocus",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LinkType {
    type Err = ConfigurationError;

    /// Case-insensitive policy name
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        LinkType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigurationError::UnknownLinkType(s.to_string()))
    }
}

/// Distance window around a TSS inside which links are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromoterWindow {
    pub upstream: i64,
    pub downstream: i64,
}

impl PromoterWindow {
    /// True when a strand-aware locus position falls inside the window
    pub fn contains(&self, position: i64) -> bool {
        (position <= 0 && -position <= self.upstream) || (position > 0 && position <= self.downstream)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CorrelationFloor {
    Signed(f64),
    Absolute(f64),
}

/// Validated, immutable filter configuration
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    link_type: LinkType,
    max_distance: Option<i64>,
    promoter: Option<PromoterWindow>,
    confidence_threshold: Option<f64>,
    correlation: Option<CorrelationFloor>,
    transcripts: Option<HashSet<String>>,
    loci: Option<HashSet<String>>,
}

/// Builder for [`LinkFilter`]; every threshold is optional
#[derive(Debug, Clone, Default)]
pub struct LinkFilterBuilder {
    link_type: LinkType,
    max_distance: Option<i64>,
    promoter: Option<PromoterWindow>,
    confidence_threshold: Option<f64>,
    correlation_threshold: Option<f64>,
    abs_correlation_threshold: Option<f64>,
    transcripts: Option<HashSet<String>>,
    loci: Option<HashSet<String>>,
}

impl LinkFilterBuilder {
    pub fn link_type(mut self, link_type: LinkType) -> Self {
        self.link_type = link_type;
        self
    }

    pub fn max_distance(mut self, max_distance: i64) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    /// Exclusion window around the TSS; a zero bound on either side turns it off
    pub fn promoter_window(mut self, upstream: i64, downstream: i64) -> Self {
        self.promoter = Some(PromoterWindow { upstream, downstream });
        self
    }

    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = Some(threshold);
        self
    }

    pub fn correlation_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = Some(threshold);
        self
    }

    pub fn abs_correlation_threshold(mut self, threshold: f64) -> Self {
        self.abs_correlation_threshold = Some(threshold);
        self
    }

    /// Only links to these transcripts are considered
    pub fn transcripts(mut self, transcripts: HashSet<String>) -> Self {
        self.transcripts = Some(transcripts);
        self
    }

    /// Only links from these loci are considered
    pub fn loci(mut self, loci: HashSet<String>) -> Self {
        self.loci = Some(loci);
        self
    }

    pub fn build(self) -> std::result::Result<LinkFilter, ConfigurationError> {
        let correlation = match (self.correlation_threshold, self.abs_correlation_threshold) {
            (Some(_), Some(_)) => return Err(ConfigurationError::ConflictingCorrelationThresholds),
            (Some(floor), None) => Some(CorrelationFloor::Signed(check_nan("correlation threshold", floor)?)),
            (None, Some(floor)) => Some(CorrelationFloor::Absolute(check_nan(
                "absolute correlation threshold",
                floor,
            )?)),
            (None, None) => None,
        };

        if let Some(max) = self.max_distance {
            check_distance("max distance", max)?;
        }
        if let Some(window) = self.promoter {
            check_distance("promoter upstream", window.upstream)?;
            check_distance("promoter downstream", window.downstream)?;
        }
        let promoter = self
            .promoter
            .filter(|window| window.upstream != 0 && window.downstream != 0);
        if let Some(threshold) = self.confidence_threshold {
            check_nan("confidence threshold", threshold)?;
        }

        Ok(LinkFilter {
            link_type: self.link_type,
            max_distance: self.max_distance,
            promoter,
            confidence_threshold: self.confidence_threshold,
            correlation,
            transcripts: self.transcripts,
            loci: self.loci,
        })
    }
}

fn check_distance(name: &'static str, value: i64) -> std::result::Result<(), ConfigurationError> {
    if value < 0 {
        return Err(ConfigurationError::NegativeDistance { name, value });
    }
    Ok(())
}

fn check_nan(name: &'static str, value: f64) -> std::result::Result<f64, ConfigurationError> {
    if value.is_nan() {
        return Err(ConfigurationError::NanThreshold { name });
    }
    Ok(value)
}

impl LinkFilter {
    pub fn builder() -> LinkFilterBuilder {
        LinkFilterBuilder::default()
    }

    /// Filter applying `link_type` with no thresholds
    pub fn with_link_type(link_type: LinkType) -> Self {
        LinkFilter {
            link_type,
            ..Default::default()
        }
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn max_distance(&self) -> Option<i64> {
        self.max_distance
    }

    pub fn promoter_window(&self) -> Option<PromoterWindow> {
        self.promoter
    }

    pub fn confidence_threshold(&self) -> Option<f64> {
        self.confidence_threshold
    }

    /// True when the link's transcript and locus are in the configured sets
    pub fn passes_restrictions(&self, link: &MapLink) -> bool {
        self.transcripts
            .as_ref()
            .map_or(true, |set| set.contains(link.tss.as_str()))
            && self.loci.as_ref().map_or(true, |set| set.contains(link.locus.as_str()))
    }

    /// Check the numeric thresholds
    ///
    /// The strand is consulted only when a promoter window is configured, so
    /// [`LinkError::MissingStrand`] is raised only then.
    pub fn is_valid(&self, link: &MapLink) -> std::result::Result<bool, LinkError> {
        if let Some(max) = self.max_distance {
            if link.abs_link_length() > max {
                return Ok(false);
            }
        }

        if let Some(window) = self.promoter {
            if window.contains(link.locus_position()?) {
                return Ok(false);
            }
        }

        if let Some(ceiling) = self.confidence_threshold {
            if link.confidence.is_nan() || link.confidence > ceiling {
                return Ok(false);
            }
        }

        let passes_correlation = match self.correlation {
            Some(CorrelationFloor::Signed(floor)) => link.correlation >= floor,
            Some(CorrelationFloor::Absolute(floor)) => link.correlation.abs() >= floor,
            None => true,
        };
        Ok(passes_correlation)
    }

    /// Start a new accumulation run
    pub fn run(&self) -> FilterRun<'_> {
        FilterRun::new(self)
    }
}

/// Lifecycle of a [`FilterRun`]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RunState {
    #[default]
    Empty,
    Accumulating,
    Finalized(TssGraph),
}

/// One pass of a filter over a link stream
#[derive(Debug)]
pub struct FilterRun<'a> {
    filter: &'a LinkFilter,
    tss_graph: TssGraph,
    locus_graph: LocusGraph,
    auxiliary: TssGraph,
    seen: HashSet<(TssKey, LocusKey)>,
    state: RunState,
    applied: usize,
}

fn better_by(order: fn(&MapLink, &MapLink) -> Ordering) -> impl Fn(&MapLink, &MapLink) -> bool {
    move |candidate, existing| order(candidate, existing) == Ordering::Less
}

fn worse_by(order: fn(&MapLink, &MapLink) -> Ordering) -> impl Fn(&MapLink, &MapLink) -> bool {
    move |candidate, existing| order(candidate, existing) == Ordering::Greater
}

/// No edge of the link's origin in `graph` is strictly closer
///
/// Ties count as closest, so a view holding any one of the tied nearest
/// links answers the same as the full view.
fn is_closest<G: RegulatoryGraph>(graph: &G, link: &MapLink) -> bool {
    graph.edges(G::origin_of(link)).map_or(true, |edges| {
        edges
            .values()
            .all(|other| other.abs_link_length() >= link.abs_link_length())
    })
}

impl<'a> FilterRun<'a> {
    pub fn new(filter: &'a LinkFilter) -> Self {
        Self {
            filter,
            tss_graph: TssGraph::default(),
            locus_graph: LocusGraph::default(),
            auxiliary: TssGraph::default(),
            seen: HashSet::new(),
            state: RunState::Empty,
            applied: 0,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Number of links applied so far
    pub fn applied(&self) -> usize {
        self.applied
    }

    pub fn tss_graph(&self) -> &TssGraph {
        &self.tss_graph
    }

    pub fn locus_graph(&self) -> &LocusGraph {
        &self.locus_graph
    }

    /// Third view kept by the policies that need one during post-processing
    pub fn auxiliary(&self) -> &TssGraph {
        &self.auxiliary
    }

    /// Fold one valid link into the views
    ///
    /// A repeated `(tss, locus)` pair is rejected under every policy.
    pub fn apply(&mut self, link: LinkRef) -> Result<()> {
        if matches!(self.state, RunState::Finalized(_)) {
            return Err(LinkMapError::Finalized);
        }
        if !self.seen.insert((link.tss.clone(), link.locus.clone())) {
            return Err(GraphError::DuplicateLink {
                tss: link.tss.to_string(),
                locus: link.locus.to_string(),
            }
            .into());
        }

        let tss = &mut self.tss_graph;
        let locus = &mut self.locus_graph;

        match self.filter.link_type {
            LinkType::Any | LinkType::NotNearestLocus => {
                tss.add(link)?;
            }
            LinkType::NearestLocus => {
                tss.replace_best(link, better_by(by_distance));
            }
            LinkType::NearestGene | LinkType::NearestBestGene | LinkType::NearestLocusOfNearestGene => {
                locus.replace_best(link, better_by(by_distance));
            }
            LinkType::NearestLocusOrGene | LinkType::NearestLocusAndGene => {
                tss.replace_best(link.clone(), better_by(by_distance));
                locus.replace_best(link, better_by(by_distance));
            }
            LinkType::BestLocusNearestGene => {
                tss.replace_best(link.clone(), better_by(by_confidence));
                locus.replace_best(link, better_by(by_distance));
            }
            LinkType::BestLocusBestGene => {
                tss.replace_best(link.clone(), better_by(by_confidence));
                locus.replace_best(link, better_by(by_confidence));
            }
            LinkType::BestLocusLink => {
                tss.replace_best(link, better_by(by_confidence));
            }
            LinkType::WorstLocusLink => {
                tss.replace_best(link, worse_by(by_confidence));
            }
            LinkType::BestGeneLink => {
                locus.replace_best(link, better_by(by_confidence));
            }
            LinkType::NotNearestGene => {
                tss.add(link.clone())?;
                locus.replace_best(link, better_by(by_distance));
            }
            LinkType::NotNearestLocusOrGene => {
                tss.add(link.clone())?;
                locus.add(link)?;
            }
            LinkType::BestLocusNotNearestLocusOrGene => {
                tss.add(link.clone())?;
                locus.add(link.clone())?;
                self.auxiliary.replace_best(link, better_by(by_confidence));
            }
            LinkType::BestDistalLocus => {
                tss.add(link.clone())?;
                locus.replace_best(link.clone(), better_by(by_distance));
                self.auxiliary.replace_best(link, better_by(by_distance));
            }
        }

        self.applied += 1;
        self.state = RunState::Accumulating;
        Ok(())
    }

    /// Reduce the accumulated views to the final TSS-keyed map
    ///
    /// The first call finalizes the run; later calls return the same map.
    pub fn post_process(&mut self) -> &TssGraph {
        if !matches!(self.state, RunState::Finalized(_)) {
            let result = self.reduce();
            info!(
                "{} post-processing: {} links applied, {} links in final map",
                self.filter.link_type,
                self.applied,
                result.link_count()
            );
            self.state = RunState::Finalized(result);
        }

        match &self.state {
            RunState::Finalized(result) => result,
            // set above
            _ => &self.tss_graph,
        }
    }

    /// Finalize and take the map
    pub fn finish(mut self) -> TssGraph {
        self.post_process();
        match std::mem::take(&mut self.state) {
            RunState::Finalized(result) => result,
            _ => self.tss_graph,
        }
    }

    fn reduce(&self) -> TssGraph {
        let tss = &self.tss_graph;
        let locus = &self.locus_graph;
        let auxiliary = &self.auxiliary;

        debug!(
            "Reducing views: {} TSS links, {} locus links, {} auxiliary links",
            tss.link_count(),
            locus.link_count(),
            auxiliary.link_count()
        );

        match self.filter.link_type {
            LinkType::NearestGene | LinkType::BestGeneLink => locus.invert(),
            LinkType::NearestBestGene => locus.invert().best_n_subgraph(1),
            LinkType::NearestLocusOfNearestGene => locus.invert().nearest_neighbor_subgraph(1),
            LinkType::NearestLocusOrGene => {
                TssGraph::from_links(tss.distinct_links().into_iter().chain(locus.distinct_links()))
            }
            LinkType::NearestLocusAndGene
            | LinkType::BestLocusNearestGene
            | LinkType::BestLocusBestGene => tss.filter_links(|link| locus.contains_link(link)),
            LinkType::NotNearestLocus => tss.filter_links(|link| !is_closest(tss, link)),
            LinkType::NotNearestGene => tss.filter_links(|link| !is_closest(locus, link)),
            LinkType::NotNearestLocusOrGene => {
                let neighbourhood = locus.nearest_neighbor_subgraph(NOT_NEAREST_NEIGHBOR_DEPTH);
                neighbourhood
                    .filter_links(|link| !is_closest(tss, link) && !is_closest(locus, link))
                    .invert()
            }
            LinkType::BestLocusNotNearestLocusOrGene => locus
                .filter_links(|link| {
                    !is_closest(tss, link) && !is_closest(locus, link) && auxiliary.contains_link(link)
                })
                .invert(),
            LinkType::BestDistalLocus => tss
                .filter_links(|link| !is_closest(auxiliary, link) && !is_closest(locus, link))
                .best_n_subgraph(1),
            LinkType::Any | LinkType::NearestLocus | LinkType::BestLocusLink | LinkType::WorstLocusLink => {
                tss.clone()
            }
        }
    }
}
