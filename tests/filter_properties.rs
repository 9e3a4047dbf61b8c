//! Property-based tests for link reduction policies
//!
//! **Feature: cislink, Property 12: 过滤策略与输入顺序无关**

use cislink::core::{
    by_confidence, by_distance, LinkFilter, LinkRef, LinkType, LocusKey, MapLink, RegulatoryGraph, RunState,
    Strand, TssGraph, TssKey, NOT_NEAREST_NEIGHBOR_DEPTH,
};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

fn make_link(tss: usize, locus: usize, distance: i64, confidence: f64, strand: Strand) -> LinkRef {
    Arc::new(MapLink {
        tss: TssKey::new(format!("T{}", tss)),
        locus: LocusKey::new(format!("chr2:{}-{}", locus * 2000, locus * 2000 + 300)),
        chromosome: "chr2".to_string(),
        tss_position: 500_000,
        strand,
        link_length: distance,
        confidence,
        correlation: 0.3,
        histone_name: None,
        gene_name: None,
    })
}

/// Unique (tss, locus) pairs with frequent distance and confidence ties
fn arb_links() -> impl Strategy<Value = Vec<LinkRef>> {
    prop::collection::vec(
        (
            0usize..4,
            0usize..6,
            prop_oneof![-3i64..3, -20_000i64..20_000],
            0u32..4,
            prop_oneof![Just(Strand::Plus), Just(Strand::Minus)],
        ),
        0..30,
    )
    .prop_map(|specs| {
        let mut unique = BTreeMap::new();
        for (tss, locus, distance, score, strand) in specs {
            unique
                .entry((tss, locus))
                .or_insert_with(|| make_link(tss, locus, distance, f64::from(score) / 10.0, strand));
        }
        unique.into_values().collect()
    })
}

fn run_policy(link_type: LinkType, links: &[LinkRef]) -> TssGraph {
    let filter = LinkFilter::with_link_type(link_type);
    let mut run = filter.run();
    for link in links {
        run.apply(Arc::clone(link)).unwrap();
    }
    run.finish()
}

fn pair_set(graph: &TssGraph) -> BTreeSet<(String, String)> {
    graph
        .links()
        .into_iter()
        .map(|link| (link.tss.to_string(), link.locus.to_string()))
        .collect()
}

type Pair = (String, String);

fn pair_of(link: &MapLink) -> Pair {
    (link.tss.to_string(), link.locus.to_string())
}

fn same_tss<'a>(links: &'a [LinkRef], link: &'a MapLink) -> impl Iterator<Item = &'a LinkRef> {
    links.iter().filter(move |other| other.tss == link.tss)
}

fn same_locus<'a>(links: &'a [LinkRef], link: &'a MapLink) -> impl Iterator<Item = &'a LinkRef> {
    links.iter().filter(move |other| other.locus == link.locus)
}

/// No other locus of the TSS is strictly closer
fn nearest_locus(links: &[LinkRef], link: &MapLink) -> bool {
    same_tss(links, link).all(|other| other.abs_link_length() >= link.abs_link_length())
}

/// No other TSS of the locus is strictly closer
fn nearest_gene(links: &[LinkRef], link: &MapLink) -> bool {
    same_locus(links, link).all(|other| other.abs_link_length() >= link.abs_link_length())
}

/// Minimum of `group` under a total order
fn is_minimum<'a>(
    mut group: impl Iterator<Item = &'a LinkRef>,
    link: &MapLink,
    order: fn(&MapLink, &MapLink) -> Ordering,
) -> bool {
    group.all(|other| order(link, other) != Ordering::Greater)
}

fn distal(links: &[LinkRef], link: &MapLink) -> bool {
    !nearest_locus(links, link) && !nearest_gene(links, link)
}

/// Direct set-based definition of each relational policy
fn reference(link_type: LinkType, links: &[LinkRef]) -> BTreeSet<Pair> {
    let selected: Vec<&LinkRef> = match link_type {
        LinkType::NotNearestLocus => links.iter().filter(|l| !nearest_locus(links, l)).collect(),
        LinkType::NotNearestGene => links.iter().filter(|l| !nearest_gene(links, l)).collect(),
        LinkType::NearestLocusAndGene => links
            .iter()
            .filter(|l| {
                is_minimum(same_tss(links, l), l, by_distance) && is_minimum(same_locus(links, l), l, by_distance)
            })
            .collect(),
        LinkType::NotNearestLocusOrGene => links
            .iter()
            .filter(|l| {
                let closer = same_locus(links, l)
                    .filter(|other| by_distance(other, l) == Ordering::Less)
                    .count();
                closer < NOT_NEAREST_NEIGHBOR_DEPTH && distal(links, l)
            })
            .collect(),
        LinkType::BestLocusNotNearestLocusOrGene => links
            .iter()
            .filter(|l| distal(links, l) && is_minimum(same_tss(links, l), l, by_confidence))
            .collect(),
        LinkType::BestDistalLocus => {
            let candidates: Vec<LinkRef> = links.iter().filter(|l| distal(links, l)).cloned().collect();
            return candidates
                .iter()
                .filter(|l| is_minimum(same_tss(&candidates, l), l, by_confidence))
                .map(|l| pair_of(l))
                .collect();
        }
        other => panic!("no reference definition for {}", other),
    };
    selected.into_iter().map(|l| pair_of(l)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 12: 过滤策略与输入顺序无关**
    ///
    /// Every policy yields the same map for any permutation of its input.
    #[test]
    fn prop_policies_ignore_arrival_order(
        (links, shuffled) in arb_links().prop_flat_map(|links| {
            let shuffled = Just(links.clone()).prop_shuffle();
            (Just(links), shuffled)
        })
    ) {
        for link_type in LinkType::ALL {
            let forward = run_policy(link_type, &links);
            let permuted = run_policy(link_type, &shuffled);
            prop_assert_eq!(pair_set(&forward), pair_set(&permuted), "policy {}", link_type);
        }
    }

    /// **Property 13: 结果是输入子集**
    #[test]
    fn prop_results_are_subsets_of_input(links in arb_links()) {
        let input = TssGraph::from_links(links.clone());
        for link_type in LinkType::ALL {
            let result = run_policy(link_type, &links);
            for link in result.links() {
                prop_assert!(input.contains_link(link), "policy {} invented a link", link_type);
            }
        }
    }

    /// **Property 14: 每个起点至多一条边**
    #[test]
    fn prop_single_edge_policies(links in arb_links()) {
        for link_type in [
            LinkType::NearestLocus,
            LinkType::BestLocusLink,
            LinkType::WorstLocusLink,
            LinkType::NearestBestGene,
            LinkType::NearestLocusOfNearestGene,
            LinkType::BestDistalLocus,
        ] {
            let result = run_policy(link_type, &links);
            for (_, degree) in result.origin_degrees() {
                prop_assert_eq!(degree, 1, "policy {}", link_type);
            }
        }

        for link_type in [LinkType::NearestGene, LinkType::BestGeneLink] {
            let by_locus = run_policy(link_type, &links).invert();
            for (_, degree) in by_locus.origin_degrees() {
                prop_assert_eq!(degree, 1, "policy {}", link_type);
            }
        }
    }

    /// **Property 15: 后处理幂等**
    #[test]
    fn prop_post_process_is_idempotent(links in arb_links()) {
        for link_type in LinkType::ALL {
            let filter = LinkFilter::with_link_type(link_type);
            let mut run = filter.run();
            for link in &links {
                run.apply(Arc::clone(link)).unwrap();
            }

            let first = run.post_process().clone();
            let second = run.post_process().clone();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(run.state(), &RunState::Finalized(first));
        }
    }

    /// **Property 16: 互补策略**
    ///
    /// NotNearestLocus keeps exactly the links not tied for their TSS's
    /// nearest locus, so it never overlaps NearestLocus.
    #[test]
    fn prop_not_nearest_locus_complements_nearest(links in arb_links()) {
        let nearest = pair_set(&run_policy(LinkType::NearestLocus, &links));
        let rest = pair_set(&run_policy(LinkType::NotNearestLocus, &links));
        let tied_nearest: BTreeSet<Pair> = links
            .iter()
            .filter(|l| nearest_locus(&links, l))
            .map(|l| pair_of(l))
            .collect();
        let all = pair_set(&TssGraph::from_links(links));

        prop_assert!(nearest.is_subset(&tied_nearest));
        prop_assert!(nearest.is_disjoint(&rest));
        let union: BTreeSet<_> = tied_nearest.union(&rest).cloned().collect();
        prop_assert_eq!(union, all);
    }

    /// **Property 17: 关系策略符合集合定义**
    ///
    /// Relational policies match a brute-force definition over the full link set.
    #[test]
    fn prop_relational_policies_match_reference(links in arb_links()) {
        for link_type in [
            LinkType::NotNearestLocus,
            LinkType::NotNearestGene,
            LinkType::NearestLocusAndGene,
            LinkType::NotNearestLocusOrGene,
            LinkType::BestLocusNotNearestLocusOrGene,
            LinkType::BestDistalLocus,
        ] {
            let actual = pair_set(&run_policy(link_type, &links));
            prop_assert_eq!(actual, reference(link_type, &links), "policy {}", link_type);
        }
    }
}

#[test]
fn test_apply_after_finalize_is_rejected() {
    let filter = LinkFilter::with_link_type(LinkType::NearestLocus);
    let mut run = filter.run();
    assert_eq!(run.state(), &RunState::Empty);

    run.apply(make_link(1, 1, 10, 0.1, Strand::Plus)).unwrap();
    assert_eq!(run.state(), &RunState::Accumulating);

    run.post_process();
    assert!(run.apply(make_link(1, 2, 5, 0.1, Strand::Plus)).is_err());
    assert_eq!(run.applied(), 1);
}

#[test]
fn test_promoter_window_excludes_proximal_links() {
    let filter = LinkFilter::builder().promoter_window(1000, 500).build().unwrap();

    let upstream_inside = make_link(1, 1, -800, 0.1, Strand::Plus);
    let upstream_outside = make_link(1, 2, -1500, 0.1, Strand::Plus);
    let downstream_inside = make_link(1, 3, 500, 0.1, Strand::Plus);
    let downstream_outside = make_link(1, 4, 501, 0.1, Strand::Plus);
    // minus strand: a positive genomic distance is upstream
    let minus_upstream = make_link(2, 1, 900, 0.1, Strand::Minus);
    let minus_downstream = make_link(2, 2, -600, 0.1, Strand::Minus);

    assert!(!filter.is_valid(&upstream_inside).unwrap());
    assert!(filter.is_valid(&upstream_outside).unwrap());
    assert!(!filter.is_valid(&downstream_inside).unwrap());
    assert!(filter.is_valid(&downstream_outside).unwrap());
    assert!(!filter.is_valid(&minus_upstream).unwrap());
    assert!(filter.is_valid(&minus_downstream).unwrap());

    assert!(!filter.is_valid(&make_link(3, 1, 300, 0.1, Strand::Plus)).unwrap());
    assert!(filter.is_valid(&make_link(3, 2, -1200, 0.1, Strand::Plus)).unwrap());
}

#[test]
fn test_confidence_threshold_is_inclusive() {
    let filter = LinkFilter::builder().confidence_threshold(0.05).build().unwrap();

    assert!(filter.is_valid(&make_link(1, 1, 10, 0.05, Strand::Plus)).unwrap());
    assert!(!filter.is_valid(&make_link(1, 1, 10, 0.051, Strand::Plus)).unwrap());
    assert!(!filter.is_valid(&make_link(1, 1, 10, f64::NAN, Strand::Plus)).unwrap());
}
