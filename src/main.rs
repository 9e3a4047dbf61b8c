//! cislink CLI entry point
//!
//! Filters regulatory link maps, summarizes them and intersects BED files.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use cislink::core::{read_name_set, LinkFilter, LinkType, MapLoader, RegulatoryGraph, TssGraph};
use cislink::formats::bed::{read_bed_file, write_bed3, BedLayout};
use cislink::formats::map::{write_map, write_map_file};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Link reduction policy (CLI enum)
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum LinkTypeArg {
    /// Every link passing the thresholds
    #[default]
    Any,
    /// Closest locus of each TSS
    NearestLocus,
    /// Closest TSS of each locus
    NearestGene,
    /// Most significant nearest-gene link of each TSS
    NearestBestGene,
    /// Nearest locus or nearest gene links
    NearestLocusOrGene,
    /// Links that are nearest locus and nearest gene
    NearestLocusAndGene,
    /// Closest nearest-gene link of each TSS
    NearestLocusOfNearestGene,
    /// Most significant locus of each TSS
    BestLocusLink,
    /// Least significant locus of each TSS
    WorstLocusLink,
    /// Best locus of each TSS that is also a nearest gene link
    BestLocusNearestGene,
    /// Best from both ends
    BestLocusBestGene,
    /// Most significant TSS of each locus
    BestGeneLink,
    /// Everything but each TSS's closest locus
    NotNearestLocus,
    /// Everything but each locus's closest TSS
    NotNearestGene,
    /// Neither nearest locus nor nearest gene
    NotNearestLocusOrGene,
    /// Best links that are neither nearest locus nor nearest gene
    BestLocusNotNearestLocusOrGene,
    /// Best distal link of each TSS
    BestDistalLocus,
}

impl From<LinkTypeArg> for LinkType {
    fn from(arg: LinkTypeArg) -> Self {
        match arg {
            LinkTypeArg::Any => LinkType::Any,
            LinkTypeArg::NearestLocus => LinkType::NearestLocus,
            LinkTypeArg::NearestGene => LinkType::NearestGene,
            LinkTypeArg::NearestBestGene => LinkType::NearestBestGene,
            LinkTypeArg::NearestLocusOrGene => LinkType::NearestLocusOrGene,
            LinkTypeArg::NearestLocusAndGene => LinkType::NearestLocusAndGene,
            LinkTypeArg::NearestLocusOfNearestGene => LinkType::NearestLocusOfNearestGene,
            LinkTypeArg::BestLocusLink => LinkType::BestLocusLink,
            LinkTypeArg::WorstLocusLink => LinkType::WorstLocusLink,
            LinkTypeArg::BestLocusNearestGene => LinkType::BestLocusNearestGene,
            LinkTypeArg::BestLocusBestGene => LinkType::BestLocusBestGene,
            LinkTypeArg::BestGeneLink => LinkType::BestGeneLink,
            LinkTypeArg::NotNearestLocus => LinkType::NotNearestLocus,
            LinkTypeArg::NotNearestGene => LinkType::NotNearestGene,
            LinkTypeArg::NotNearestLocusOrGene => LinkType::NotNearestLocusOrGene,
            LinkTypeArg::BestLocusNotNearestLocusOrGene => LinkType::BestLocusNotNearestLocusOrGene,
            LinkTypeArg::BestDistalLocus => LinkType::BestDistalLocus,
        }
    }
}

/// BED column layout (CLI enum)
#[derive(Clone, Copy, Debug, ValueEnum)]
enum BedLayoutArg {
    #[value(name = "bed3")]
    Bed3,
    #[value(name = "bed6")]
    Bed6,
    /// broadPeak
    #[value(name = "bed6+3")]
    Bed6Plus3,
    /// narrowPeak
    #[value(name = "bed6+4")]
    Bed6Plus4,
    /// Expression table (name in column 8, score in column 9)
    #[value(name = "expression")]
    Expression,
}

impl From<BedLayoutArg> for BedLayout {
    fn from(arg: BedLayoutArg) -> Self {
        match arg {
            BedLayoutArg::Bed3 => BedLayout::Bed3,
            BedLayoutArg::Bed6 => BedLayout::Bed6,
            BedLayoutArg::Bed6Plus3 => BedLayout::Bed6Plus3,
            BedLayoutArg::Bed6Plus4 => BedLayout::Bed6Plus4,
            BedLayoutArg::Expression => BedLayout::BedExpression,
        }
    }
}

#[derive(Parser)]
#[command(name = "cislink")]
#[command(about = "Filter and summarize cis-regulatory link maps")]
#[command(version)]
#[command(author = "cislink Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a link map with one link policy
    Filter {
        /// Input link map (plain, .gz or .bz2)
        map: PathBuf,
        /// Output file (stdout if not specified)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        /// Link reduction policy
        #[arg(short = 'l', long = "link-type", default_value = "any")]
        link_type: LinkTypeArg,
        /// Maximum absolute TSS-locus distance
        #[arg(long)]
        max_distance: Option<i64>,
        /// Promoter exclusion window upstream of the TSS
        #[arg(long, requires = "promoter_downstream")]
        promoter_upstream: Option<i64>,
        /// Promoter exclusion window downstream of the TSS
        #[arg(long, requires = "promoter_upstream")]
        promoter_downstream: Option<i64>,
        /// Maximum confidence score (lower is more significant)
        #[arg(short = 'c', long)]
        confidence: Option<f64>,
        /// Minimum correlation
        #[arg(long, conflicts_with = "abs_correlation", allow_hyphen_values = true)]
        correlation: Option<f64>,
        /// Minimum absolute correlation
        #[arg(long)]
        abs_correlation: Option<f64>,
        /// Only keep links to transcripts listed in this file
        #[arg(long)]
        transcripts: Option<PathBuf>,
        /// Only keep links from loci listed in this file
        #[arg(long)]
        loci: Option<PathBuf>,
    },
    /// Print link, TSS and locus counts and the TSS degree distribution
    Stats {
        /// Input link map (plain, .gz or .bz2)
        map: PathBuf,
    },
    /// Write the entries of A overlapping any entry of B as BED3
    Intersect {
        /// BED file A
        a: PathBuf,
        /// BED file B
        b: PathBuf,
        /// Widen B entries by this many bases on each side
        #[arg(long, default_value = "0")]
        buffer: i64,
        /// Column layout of both inputs
        #[arg(long, default_value = "bed3")]
        layout: BedLayoutArg,
        /// Output file (stdout if not specified)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

fn load_map(path: &Path, filter: LinkFilter) -> anyhow::Result<TssGraph> {
    let start = Instant::now();
    eprintln!("Loading link map: {:?} ({})", path, filter.link_type());

    let (map, stats) = MapLoader::new(filter)
        .load_file(path)
        .with_context(|| format!("Failed to load link map {:?}", path))?;

    eprintln!("\n=== Load Statistics ===");
    eprintln!("Total records:   {}", stats.total);
    eprintln!("Restricted:      {}", stats.restricted);
    eprintln!("Rejected:        {}", stats.rejected);
    eprintln!("Applied:         {}", stats.applied);
    eprintln!("Final links:     {}", stats.final_links);
    eprintln!("Load time:       {:.2}s", start.elapsed().as_secs_f64());

    Ok(map)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Filter {
            map,
            output,
            link_type,
            max_distance,
            promoter_upstream,
            promoter_downstream,
            confidence,
            correlation,
            abs_correlation,
            transcripts,
            loci,
        } => {
            let mut builder = LinkFilter::builder().link_type(link_type.into());
            if let Some(max) = max_distance {
                builder = builder.max_distance(max);
            }
            if let (Some(upstream), Some(downstream)) = (promoter_upstream, promoter_downstream) {
                builder = builder.promoter_window(upstream, downstream);
            }
            if let Some(threshold) = confidence {
                builder = builder.confidence_threshold(threshold);
            }
            if let Some(threshold) = correlation {
                builder = builder.correlation_threshold(threshold);
            }
            if let Some(threshold) = abs_correlation {
                builder = builder.abs_correlation_threshold(threshold);
            }
            if let Some(path) = transcripts {
                let names = read_name_set(&path)
                    .with_context(|| format!("Failed to read transcript list {:?}", path))?;
                builder = builder.transcripts(names);
            }
            if let Some(path) = loci {
                let names = read_name_set(&path).with_context(|| format!("Failed to read locus list {:?}", path))?;
                builder = builder.loci(names);
            }
            let filter = builder.build()?;

            let graph = load_map(&map, filter)?;
            let written = match output {
                Some(path) => {
                    write_map_file(&path, &graph).with_context(|| format!("Failed to write {:?}", path))?
                }
                None => {
                    let stdout = io::stdout();
                    let mut writer = BufWriter::new(stdout.lock());
                    let written = write_map(&mut writer, &graph)?;
                    writer.flush()?;
                    written
                }
            };

            eprintln!("Links written:   {}", written);
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Stats { map } => {
            let graph = load_map(&map, LinkFilter::default())?;
            let loci = graph.invert();

            println!("links\t{}", graph.link_count());
            println!("tss\t{}", graph.origin_count());
            println!("loci\t{}", loci.origin_count());
            for (degree, count) in graph.degree_distribution().iter().enumerate().skip(1) {
                if *count > 0 {
                    println!("tss_degree_{}\t{}", degree, count);
                }
            }
        }

        Commands::Intersect {
            a,
            b,
            buffer,
            layout,
            output,
        } => {
            let layout: BedLayout = layout.into();
            let left = read_bed_file(&a, layout).with_context(|| format!("Failed to read {:?}", a))?;
            let right = read_bed_file(&b, layout).with_context(|| format!("Failed to read {:?}", b))?;

            eprintln!("Intersecting {:?} ({} entries) with {:?} ({} entries)", a, left.len(), b, right.len());

            let mut writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(
                    std::fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
                )),
                None => Box::new(BufWriter::new(io::stdout().lock())),
            };

            let mut written = 0;
            for chrom in left.chromosomes() {
                written += write_bed3(&mut writer, left.intersect_left(&right, chrom, buffer))?;
            }
            writer.flush()?;

            eprintln!("Overlapping:     {}", written);
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }
    }

    Ok(())
}
