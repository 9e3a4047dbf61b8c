//! Regulatory link records and their endpoint identifiers
//!
//! A [`MapLink`] joins one locus to one TSS. Links are compared, hashed and
//! ordered by `(tss, locus)` only, so two records for the same pair are the
//! same link whatever their scores. Graph views share links as [`LinkRef`].

use crate::core::error::{LinkError, LinkParseError, ParseResult};
use crate::core::interval::{GenomicInterval, Strand};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Shared handle to an immutable link
pub type LinkRef = Arc<MapLink>;

/// Number of tab-separated columns in a link file record
pub const LINK_FIELD_COUNT: usize = 12;

/// Transcript (or gene) identifier of a TSS
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TssKey(String);

impl TssKey {
    pub fn new(name: impl Into<String>) -> Self {
        TssKey(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TssKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TssKey {
    fn from(s: &str) -> Self {
        TssKey::new(s)
    }
}

impl fmt::Display for TssKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct LocusCoords {
    chrom: String,
    start: i64,
    end: i64,
}

/// Locus identifier in `chr:start-end` form
///
/// Coordinates are parsed on first access and cached. Construction never
/// fails; a malformed key surfaces as [`LinkError::InvalidLocusKey`] from
/// the accessors. Identity is the key text.
#[derive(Debug, Clone)]
pub struct LocusKey {
    text: String,
    coords: OnceLock<Option<LocusCoords>>,
}

impl LocusKey {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            coords: OnceLock::new(),
        }
    }

    /// Build the canonical key for a region
    pub fn from_coords(chrom: &str, start: i64, end: i64) -> Self {
        Self::new(format!("{}:{}-{}", chrom, start, end))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn coords(&self) -> Result<&LocusCoords, LinkError> {
        self.coords
            .get_or_init(|| parse_locus_text(&self.text))
            .as_ref()
            .ok_or_else(|| LinkError::InvalidLocusKey(self.text.clone()))
    }

    /// Force parsing, reporting a malformed key
    pub fn validate(&self) -> Result<(), LinkError> {
        self.coords().map(|_| ())
    }

    pub fn chromosome(&self) -> Result<&str, LinkError> {
        Ok(&self.coords()?.chrom)
    }

    pub fn start(&self) -> Result<i64, LinkError> {
        Ok(self.coords()?.start)
    }

    pub fn end(&self) -> Result<i64, LinkError> {
        Ok(self.coords()?.end)
    }

    pub fn size(&self) -> Result<i64, LinkError> {
        let coords = self.coords()?;
        Ok(coords.end - coords.start)
    }

    /// Region covered by this locus, named by the key
    pub fn to_interval(&self) -> Result<GenomicInterval, LinkError> {
        let coords = self.coords()?;
        Ok(GenomicInterval::new(
            self.text.clone(),
            coords.chrom.clone(),
            coords.start,
            coords.end,
            Strand::Plus,
        ))
    }
}

fn parse_locus_text(text: &str) -> Option<LocusCoords> {
    let (chrom, range) = text.rsplit_once(':')?;
    let (start, end) = range.split_once('-')?;
    let start: i64 = start.parse().ok()?;
    let end: i64 = end.parse().ok()?;

    if chrom.is_empty() || start > end {
        return None;
    }
    Some(LocusCoords {
        chrom: chrom.to_string(),
        start,
        end,
    })
}

impl PartialEq for LocusKey {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for LocusKey {}

impl Hash for LocusKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialOrd for LocusKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LocusKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl Borrow<str> for LocusKey {
    fn borrow(&self) -> &str {
        &self.text
    }
}

impl From<&str> for LocusKey {
    fn from(s: &str) -> Self {
        LocusKey::new(s)
    }
}

impl fmt::Display for LocusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One candidate locus to TSS link
#[derive(Debug, Clone)]
pub struct MapLink {
    pub tss: TssKey,
    pub locus: LocusKey,
    /// Chromosome of the TSS
    pub chromosome: String,
    pub tss_position: i64,
    pub strand: Strand,
    /// Signed genomic distance from the TSS to the locus
    pub link_length: i64,
    /// p-value-like score, lower is more significant
    pub confidence: f64,
    pub correlation: f64,
    pub histone_name: Option<String>,
    pub gene_name: Option<String>,
}

impl MapLink {
    /// Build a link from the twelve columns of a link file record
    ///
    /// Columns: chromosome, tss position, tss position, tss name, placeholder,
    /// strand, locus key, correlation, confidence, distance, histone, gene.
    /// The locus key is stored unparsed.
    pub fn from_fields(fields: &[&str], line: usize) -> ParseResult<MapLink> {
        if fields.len() != LINK_FIELD_COUNT {
            return Err(LinkParseError::FieldCount {
                line,
                expected: LINK_FIELD_COUNT,
                found: fields.len(),
            });
        }

        let optional = |s: &str| (!s.is_empty()).then(|| s.to_string());

        Ok(MapLink {
            tss: TssKey::new(fields[3]),
            locus: LocusKey::new(fields[6]),
            chromosome: fields[0].to_string(),
            tss_position: parse_number(fields[1], "tss position", line)?,
            strand: Strand::from_field(fields[5]),
            link_length: parse_number(fields[9], "distance", line)?,
            confidence: parse_number(fields[8], "confidence", line)?,
            correlation: parse_number(fields[7], "correlation", line)?,
            histone_name: optional(fields[10]),
            gene_name: optional(fields[11]),
        })
    }

    pub fn abs_link_length(&self) -> i64 {
        self.link_length.abs()
    }

    /// Distance in the 5' to 3' direction of the TSS
    ///
    /// Fails with [`LinkError::MissingStrand`] unless the strand is `+` or `-`.
    pub fn locus_position(&self) -> Result<i64, LinkError> {
        match self.strand {
            Strand::Plus => Ok(self.link_length),
            Strand::Minus => Ok(-self.link_length),
            Strand::Unknown(ref s) => Err(LinkError::MissingStrand {
                tss: self.tss.to_string(),
                locus: self.locus.to_string(),
                strand: s.clone(),
            }),
        }
    }

    pub fn locus_start(&self) -> Result<i64, LinkError> {
        self.locus.start()
    }

    pub fn locus_end(&self) -> Result<i64, LinkError> {
        self.locus.end()
    }

    pub fn locus_size(&self) -> Result<i64, LinkError> {
        self.locus.size()
    }

    /// Zero-length interval at the TSS
    pub fn tss_location(&self) -> GenomicInterval {
        GenomicInterval::new(
            self.tss.as_str(),
            self.chromosome.clone(),
            self.tss_position,
            self.tss_position,
            self.strand.clone(),
        )
    }

    pub fn locus_location(&self) -> Result<GenomicInterval, LinkError> {
        self.locus.to_interval()
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &'static str, line: usize) -> ParseResult<T> {
    value.trim().parse().map_err(|_| LinkParseError::InvalidNumber {
        line,
        field,
        value: value.to_string(),
    })
}

impl PartialEq for MapLink {
    fn eq(&self, other: &Self) -> bool {
        self.tss == other.tss && self.locus == other.locus
    }
}

impl Eq for MapLink {}

impl Hash for MapLink {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tss.hash(state);
        self.locus.hash(state);
    }
}

impl PartialOrd for MapLink {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MapLink {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.tss, &self.locus).cmp(&(&other.tss, &other.locus))
    }
}
