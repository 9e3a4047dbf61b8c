//! Genomic intervals
//!
//! Half-open, 0-based intervals with strand-aware (5'-relative) accessors.

use crate::core::error::IntervalError;
use std::fmt;

/// Strand orientation
///
/// Unrecognized strand text is kept rather than rejected; properties that
/// need an orientation fail only when they are evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Strand {
    #[default]
    Plus,
    Minus,
    Unknown(String),
}

impl Strand {
    /// Parse strand from a text field
    ///
    /// # Examples
    /// ```
    /// use cislink::core::Strand;
    /// assert_eq!(Strand::from_field("+"), Strand::Plus);
    /// assert_eq!(Strand::from_field("-"), Strand::Minus);
    /// assert_eq!(Strand::from_field("."), Strand::Unknown(".".to_string()));
    /// ```
    pub fn from_field(s: &str) -> Self {
        match s {
            "+" => Strand::Plus,
            "-" => Strand::Minus,
            other => Strand::Unknown(other.to_string()),
        }
    }

    /// Text form, as written to BED and link files
    pub fn as_str(&self) -> &str {
        match self {
            Strand::Plus => "+",
            Strand::Minus => "-",
            Strand::Unknown(s) => s,
        }
    }

    /// Check if this is the reverse strand
    pub fn is_minus(&self) -> bool {
        matches!(self, Strand::Minus)
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named genomic interval
#[derive(Debug, Clone, PartialEq)]
pub struct GenomicInterval {
    /// Unique name within an index
    pub name: String,
    /// Chromosome name
    pub chrom: String,
    /// Start position (0-based)
    pub start: i64,
    /// End position (exclusive)
    pub end: i64,
    pub strand: Strand,
    /// Optional numeric score (BED column 5)
    pub score: Option<f64>,
    /// Name as written in the source file (`.` for unnamed entries)
    pub alternate_name: Option<String>,
    /// Raw fields of the source record
    pub fields: Vec<String>,
}

impl GenomicInterval {
    /// Create an interval with no score or auxiliary data
    ///
    /// The caller guarantees `end >= start`; use [`GenomicInterval::try_new`]
    /// for unchecked input.
    pub fn new(
        name: impl Into<String>,
        chrom: impl Into<String>,
        start: i64,
        end: i64,
        strand: Strand,
    ) -> Self {
        debug_assert!(end >= start, "interval end {} is before start {}", end, start);
        Self {
            name: name.into(),
            chrom: chrom.into(),
            start,
            end,
            strand,
            score: None,
            alternate_name: None,
            fields: Vec::new(),
        }
    }

    /// Create an interval, rejecting `end < start`
    pub fn try_new(
        name: impl Into<String>,
        chrom: impl Into<String>,
        start: i64,
        end: i64,
        strand: Strand,
    ) -> Result<Self, IntervalError> {
        if end < start {
            return Err(IntervalError::Reversed {
                chrom: chrom.into(),
                start,
                end,
            });
        }
        Ok(Self::new(name, chrom, start, end, strand))
    }

    /// Interval center (integer division)
    pub fn mid(&self) -> i64 {
        (self.start + self.end) / 2
    }

    /// Span length (`end - start`)
    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// 5' base of the interval
    pub fn directional_start(&self) -> i64 {
        if self.strand.is_minus() {
            self.end - 1
        } else {
            self.start
        }
    }

    /// 3' base of the interval
    pub fn directional_end(&self) -> i64 {
        if self.strand.is_minus() {
            self.start
        } else {
            self.end - 1
        }
    }

    /// Signed length from the 5' base to the 3' base
    pub fn directional_length(&self) -> i64 {
        self.directional_end() - self.directional_start()
    }

    /// Half-open overlap on the same chromosome
    pub fn overlaps(&self, other: &GenomicInterval) -> bool {
        self.chrom == other.chrom && self.start < other.end && other.start < self.end
    }

    /// True when this interval's 5' base lies inside `other`
    ///
    /// Used when only the proximity of a TSS to a region matters.
    pub fn directional_start_within(&self, other: &GenomicInterval) -> bool {
        let point = self.directional_start();
        self.chrom == other.chrom && other.start <= point && point < other.end
    }

    /// Copy of this interval widened by `buffer` on both sides
    pub fn widened(&self, buffer: i64) -> GenomicInterval {
        let mut widened = self.clone();
        widened.start -= buffer;
        widened.end += buffer;
        widened
    }
}

/// Default overlap predicate: `query` overlaps `candidate`
pub fn default_overlaps(query: &GenomicInterval, candidate: &GenomicInterval) -> bool {
    query.overlaps(candidate)
}

/// Alternate predicate: `query`'s directional start lies in `candidate`
pub fn directional_start_overlaps(query: &GenomicInterval, candidate: &GenomicInterval) -> bool {
    query.directional_start_within(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(start: i64, end: i64, strand: Strand) -> GenomicInterval {
        GenomicInterval::new("a", "chr1", start, end, strand)
    }

    #[test]
    fn test_strand_round_trip() {
        assert_eq!(Strand::from_field("+").as_str(), "+");
        assert_eq!(Strand::from_field("-").as_str(), "-");
        assert_eq!(Strand::from_field("?").as_str(), "?");
        assert!(Strand::from_field("-").is_minus());
    }

    #[test]
    fn test_directional_coordinates() {
        let plus = interval(100, 200, Strand::Plus);
        assert_eq!(plus.directional_start(), 100);
        assert_eq!(plus.directional_end(), 199);
        assert_eq!(plus.directional_length(), 99);

        let minus = interval(100, 200, Strand::Minus);
        assert_eq!(minus.directional_start(), 199);
        assert_eq!(minus.directional_end(), 100);
        assert_eq!(minus.directional_length(), -99);
        assert_eq!(minus.len(), 100);
        assert_eq!(minus.mid(), 150);
    }

    #[test]
    fn test_try_new_rejects_reversed_interval() {
        let err = GenomicInterval::try_new("a", "chr1", 500, 100, Strand::Plus).unwrap_err();
        assert_eq!(
            err,
            IntervalError::Reversed {
                chrom: "chr1".to_string(),
                start: 500,
                end: 100
            }
        );

        let empty = GenomicInterval::try_new("a", "chr1", 500, 500, Strand::Plus).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_half_open_overlap() {
        let a = interval(100, 200, Strand::Plus);
        assert!(a.overlaps(&interval(199, 300, Strand::Plus)));
        assert!(!a.overlaps(&interval(200, 300, Strand::Plus)));
        assert!(!a.overlaps(&interval(0, 100, Strand::Plus)));
        assert!(a.overlaps(&interval(0, 101, Strand::Plus)));

        let other_chrom = GenomicInterval::new("b", "chr2", 100, 200, Strand::Plus);
        assert!(!a.overlaps(&other_chrom));
    }

    #[test]
    fn test_directional_start_within() {
        let region = interval(1000, 2000, Strand::Plus);
        let tss_plus = interval(1500, 3000, Strand::Plus);
        let tss_minus = interval(0, 1001, Strand::Minus);
        let outside = interval(2000, 2100, Strand::Plus);

        assert!(tss_plus.directional_start_within(&region));
        assert!(tss_minus.directional_start_within(&region));
        assert!(!outside.directional_start_within(&region));
    }
}
