//! Property-based tests for the regulatory link graphs
//!
//! **Feature: cislink, Property 7: 二分图不变量**

use cislink::core::{by_confidence, by_distance, LinkRef, LocusKey, MapLink, RegulatoryGraph, Strand, TssGraph, TssKey};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

fn make_link(tss: usize, locus: usize, distance: i64, confidence: f64) -> LinkRef {
    Arc::new(MapLink {
        tss: TssKey::new(format!("T{}", tss)),
        locus: LocusKey::new(format!("chr1:{}-{}", locus * 1000, locus * 1000 + 500)),
        chromosome: "chr1".to_string(),
        tss_position: 100_000,
        strand: Strand::Plus,
        link_length: distance,
        confidence,
        correlation: 0.5,
        histone_name: None,
        gene_name: None,
    })
}

/// Links with unique (tss, locus) pairs; few distinct scores so ties occur
fn arb_links() -> impl Strategy<Value = Vec<LinkRef>> {
    prop::collection::vec((0usize..5, 0usize..8, -5_000i64..5_000, 0u32..6), 0..40).prop_map(|specs| {
        let mut unique = BTreeMap::new();
        for (tss, locus, distance, score) in specs {
            unique
                .entry((tss, locus))
                .or_insert_with(|| make_link(tss, locus, distance, f64::from(score) / 100.0));
        }
        unique.into_values().collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// **Property 7: 保留最优**
    ///
    /// After any sequence of offers, each origin keeps exactly the minimum
    /// of everything offered to it.
    #[test]
    fn prop_replace_best_keeps_global_minimum(links in arb_links().prop_shuffle()) {
        let mut graph = TssGraph::default();
        for link in &links {
            graph.replace_best(link.clone(), |a, b| by_confidence(a, b) == Ordering::Less);
        }

        let mut expected: BTreeMap<TssKey, LinkRef> = BTreeMap::new();
        for link in &links {
            let entry = expected.entry(link.tss.clone()).or_insert_with(|| link.clone());
            if by_confidence(link, entry) == Ordering::Less {
                *entry = link.clone();
            }
        }

        prop_assert_eq!(graph.origin_count(), expected.len());
        for (tss, best) in &expected {
            let edges = graph.edges(tss).unwrap();
            prop_assert_eq!(edges.len(), 1);
            prop_assert!(edges.contains_key(&best.locus));
        }
    }

    /// **Property 8: 反转保持边集**
    #[test]
    fn prop_invert_round_trip(links in arb_links()) {
        let graph = TssGraph::try_from_links(links.clone()).unwrap();
        let inverted = graph.invert();

        prop_assert_eq!(inverted.link_count(), graph.link_count());
        prop_assert_eq!(inverted.distinct_links(), graph.distinct_links());
        prop_assert_eq!(inverted.invert(), graph);
    }

    /// **Property 9: 度分布**
    #[test]
    fn prop_degree_distribution_sums(links in arb_links()) {
        let graph = TssGraph::from_links(links);
        let histogram = graph.degree_distribution();

        prop_assert_eq!(histogram.iter().sum::<usize>(), graph.origin_count());
        let weighted: usize = histogram.iter().enumerate().map(|(k, count)| k * count).sum();
        prop_assert_eq!(weighted, graph.link_count());
        if graph.is_empty() {
            prop_assert_eq!(histogram, vec![0]);
        } else {
            prop_assert_eq!(histogram[0], 0);
        }
    }

    /// **Property 10: 近邻子图**
    #[test]
    fn prop_nearest_neighbor_subgraph(links in arb_links(), n in 0usize..4) {
        let graph = TssGraph::from_links(links);
        let nearest = graph.nearest_neighbor_subgraph(n);

        for (tss, edges) in graph.adjacency() {
            let kept = nearest.degree(tss);
            prop_assert_eq!(kept, n.min(edges.len()));

            let mut sorted: Vec<&LinkRef> = edges.values().collect();
            sorted.sort_by(|a, b| by_distance(a, b));
            for link in sorted.iter().take(n) {
                prop_assert!(nearest.contains_link(link));
            }
        }
    }

    /// **Property 11: 子图是原图子集**
    #[test]
    fn prop_subgraphs_are_subsets(links in arb_links(), n in 1usize..4) {
        let graph = TssGraph::from_links(links);
        for subgraph in [
            graph.best_n_subgraph(n),
            graph.worst_n_subgraph(n),
            graph.median_subgraph(),
            graph.best_nth_subgraph(n),
        ] {
            for link in subgraph.links() {
                prop_assert!(graph.contains_link(link));
            }
        }
        prop_assert_eq!(graph.median_subgraph().origin_count(), graph.origin_count());
    }
}

#[test]
fn test_distinct_links_dedup_structurally_equal() {
    let a = make_link(1, 1, 100, 0.01);
    let b = make_link(1, 1, -300, 0.9);

    let graph = TssGraph::from_links(vec![a, b.clone()]);
    let links = graph.distinct_links();

    assert_eq!(links.len(), 1);
    assert!(links.contains(&b));
    assert!(TssGraph::try_from_links(vec![make_link(1, 1, 1, 0.1), b]).is_err());
}

#[test]
fn test_invert_two_tss_sharing_locus() {
    let graph = TssGraph::try_from_links(vec![make_link(1, 7, 100, 0.1), make_link(2, 7, -100, 0.2)]).unwrap();
    let by_locus = graph.invert();

    assert_eq!(by_locus.origin_count(), 1);
    let locus = LocusKey::new("chr1:7000-7500");
    assert_eq!(by_locus.degree(&locus), 2);
    assert_eq!(by_locus.degree_distribution(), vec![0, 0, 1]);
}
