//! Link map writer
//!
//! Writes links in the twelve-column layout read by
//! [`MapLoader`](crate::core::MapLoader), one link per line in
//! `(tss, locus)` order.

use crate::core::{MapLink, RegulatoryGraph};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Placeholder written in the fifth column
pub const PLACEHOLDER: &str = "NA";

/// Write one link record (with trailing newline)
pub fn write_link<W: Write>(writer: &mut W, link: &MapLink) -> io::Result<()> {
    writeln!(
        writer,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        link.chromosome,
        link.tss_position,
        link.tss_position,
        link.tss,
        PLACEHOLDER,
        link.strand,
        link.locus,
        link.correlation,
        link.confidence,
        link.link_length,
        link.histone_name.as_deref().unwrap_or(""),
        link.gene_name.as_deref().unwrap_or(""),
    )
}

/// Write every distinct link of a graph, returning the number written
pub fn write_map<W: Write, G: RegulatoryGraph>(writer: &mut W, graph: &G) -> io::Result<usize> {
    let links = graph.distinct_links();
    for link in &links {
        write_link(writer, link)?;
    }
    Ok(links.len())
}

/// Write a graph to a file
pub fn write_map_file<P: AsRef<Path>, G: RegulatoryGraph>(path: P, graph: &G) -> io::Result<usize> {
    let mut writer = BufWriter::with_capacity(64 * 1024, File::create(path)?);
    let written = write_map(&mut writer, graph)?;
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LinkFilter, LocusKey, MapLoader, Strand, TssGraph, TssKey};
    use std::sync::Arc;

    fn link(tss: &str, locus: &str, distance: i64, confidence: f64, gene: Option<&str>) -> MapLink {
        MapLink {
            tss: TssKey::new(tss),
            locus: LocusKey::new(locus),
            chromosome: "chr3".to_string(),
            tss_position: 12_345,
            strand: Strand::Minus,
            link_length: distance,
            confidence,
            correlation: -0.125,
            histone_name: Some("H3K4me1".to_string()),
            gene_name: gene.map(String::from),
        }
    }

    #[test]
    fn test_column_order() -> io::Result<()> {
        let mut out = Vec::new();
        write_link(&mut out, &link("T1", "chr3:100-200", -4000, 1e-7, Some("ABC")))?;
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "chr3\t12345\t12345\tT1\tNA\t-\tchr3:100-200\t-0.125\t0.0000001\t-4000\tH3K4me1\tABC\n"
        );
        Ok(())
    }

    #[test]
    fn test_written_map_loads_back() {
        let graph = TssGraph::from_links(vec![
            Arc::new(link("T2", "chr3:100-200", 50, 0.25, None)),
            Arc::new(link("T1", "chr3:900-1000", -4000, 3.5e-12, Some("ABC"))),
            Arc::new(link("T1", "chr3:100-200", 10, 0.01, Some("ABC"))),
        ]);

        let mut out = Vec::new();
        assert_eq!(write_map(&mut out, &graph).unwrap(), 3);

        let (loaded, stats) = MapLoader::new(LinkFilter::default()).load(&out[..]).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(loaded, graph);

        for (a, b) in loaded.links().into_iter().zip(graph.links()) {
            assert_eq!(a.confidence, b.confidence);
            assert_eq!(a.correlation, b.correlation);
            assert_eq!(a.link_length, b.link_length);
            assert_eq!(a.strand, b.strand);
            assert_eq!(a.gene_name, b.gene_name);
            assert_eq!(a.histone_name, b.histone_name);
        }
    }

    #[test]
    fn test_output_is_sorted() -> io::Result<()> {
        let graph = TssGraph::from_links(vec![
            Arc::new(link("T2", "chr3:1-2", 1, 0.1, None)),
            Arc::new(link("T1", "chr3:5-6", 1, 0.1, None)),
            Arc::new(link("T1", "chr3:1-2", 1, 0.1, None)),
        ]);
        let locus_view = graph.invert();

        let mut from_tss = Vec::new();
        let mut from_locus = Vec::new();
        write_map(&mut from_tss, &graph)?;
        write_map(&mut from_locus, &locus_view)?;
        assert_eq!(from_tss, from_locus);

        let text = String::from_utf8(from_tss).unwrap();
        let order: Vec<&str> = text.lines().map(|l| l.split('\t').nth(6).unwrap()).collect();
        assert_eq!(order, vec!["chr3:1-2", "chr3:5-6", "chr3:1-2"]);
        Ok(())
    }
}
