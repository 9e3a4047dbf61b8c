//! BED format adapter
//!
//! Reads BED-like files into an [`IntervalIndex`] according to a fixed
//! column layout, and writes intervals back as BED3.

use crate::core::io::{is_skippable, open_text, LineIterator, TabFields};
use crate::core::{GenomicInterval, IntervalIndex, Strand};
use log::debug;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Column positions of a BED layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub chrom: usize,
    pub start: usize,
    pub end: usize,
    pub name: Option<usize>,
    pub score: Option<usize>,
    pub strand: Option<usize>,
    pub signal_value: Option<usize>,
    pub p_value: Option<usize>,
    pub q_value: Option<usize>,
    pub peak: Option<usize>,
}

impl ColumnMap {
    const fn bed6() -> Self {
        ColumnMap {
            chrom: 0,
            start: 1,
            end: 2,
            name: Some(3),
            score: Some(4),
            strand: Some(5),
            signal_value: None,
            p_value: None,
            q_value: None,
            peak: None,
        }
    }

    /// Smallest field count that holds every mapped column
    pub fn min_fields(&self) -> usize {
        [
            Some(self.chrom),
            Some(self.start),
            Some(self.end),
            self.name,
            self.score,
            self.strand,
            self.signal_value,
            self.p_value,
            self.q_value,
            self.peak,
        ]
        .into_iter()
        .flatten()
        .max()
        .map_or(0, |max| max + 1)
    }
}

/// Supported BED column layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BedLayout {
    /// chrom, start, end
    #[default]
    Bed3,
    /// chrom, start, end, name, score, strand
    Bed6,
    /// BED6 + signalValue, pValue, qValue (broadPeak)
    Bed6Plus3,
    /// BED6 + signalValue, pValue, qValue, peak (narrowPeak)
    Bed6Plus4,
    /// Expression table: chrom, start (col 4), end (col 5), strand (col 7),
    /// name (col 8), score (col 9)
    BedExpression,
}

impl BedLayout {
    pub fn columns(&self) -> ColumnMap {
        match self {
            BedLayout::Bed3 => ColumnMap {
                name: None,
                score: None,
                strand: None,
                ..ColumnMap::bed6()
            },
            BedLayout::Bed6 => ColumnMap::bed6(),
            BedLayout::Bed6Plus3 => ColumnMap {
                signal_value: Some(6),
                p_value: Some(7),
                q_value: Some(8),
                ..ColumnMap::bed6()
            },
            BedLayout::Bed6Plus4 => ColumnMap {
                signal_value: Some(6),
                p_value: Some(7),
                q_value: Some(8),
                peak: Some(9),
                ..ColumnMap::bed6()
            },
            BedLayout::BedExpression => ColumnMap {
                chrom: 0,
                start: 3,
                end: 4,
                strand: Some(6),
                name: Some(7),
                score: Some(8),
                signal_value: None,
                p_value: None,
                q_value: None,
                peak: None,
            },
        }
    }
}

impl FromStr for BedLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bed3" => Ok(BedLayout::Bed3),
            "bed6" => Ok(BedLayout::Bed6),
            "bed6+3" | "broadpeak" => Ok(BedLayout::Bed6Plus3),
            "bed6+4" | "narrowpeak" => Ok(BedLayout::Bed6Plus4),
            "expression" | "bedexpression" => Ok(BedLayout::BedExpression),
            other => Err(format!("Unknown BED layout: {}", other)),
        }
    }
}

/// BED parsing errors
#[derive(Debug, Error)]
pub enum BedParseError {
    #[error("Line {line}: too few fields: expected at least {expected}, found {found}")]
    TooFewFields { line: usize, expected: usize, found: usize },

    #[error("Line {line}: invalid number in field {field}: {value}")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Line {line}: end {end} is before start {start}")]
    InvalidInterval { line: usize, start: i64, end: i64 },

    #[error("Line {line}: invalid UTF-8")]
    InvalidUtf8 { line: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn parse_coordinate(value: &str, field: &'static str, line: usize) -> Result<i64, BedParseError> {
    value.parse().map_err(|_| BedParseError::InvalidNumber {
        line,
        field,
        value: value.to_string(),
    })
}

/// Parse one BED record
///
/// `unnamed` numbers the entries whose name is `.`; layouts without a name
/// column name each entry `chrom:start-end`.
pub fn parse_bed_line(
    line: &[u8],
    line_number: usize,
    layout: BedLayout,
    unnamed: &mut usize,
) -> Result<GenomicInterval, BedParseError> {
    let mut fields: Vec<&str> = Vec::with_capacity(12);
    for field in TabFields::new(line) {
        fields.push(std::str::from_utf8(field).map_err(|_| BedParseError::InvalidUtf8 { line: line_number })?);
    }

    let columns = layout.columns();
    if fields.len() < columns.min_fields() {
        return Err(BedParseError::TooFewFields {
            line: line_number,
            expected: columns.min_fields(),
            found: fields.len(),
        });
    }

    let chrom = fields[columns.chrom];
    let start = parse_coordinate(fields[columns.start], "start", line_number)?;
    let end = parse_coordinate(fields[columns.end], "end", line_number)?;

    let generated = || format!("{}:{}-{}", chrom, fields[columns.start], fields[columns.end]);
    let (name, alternate_name) = match columns.name.map(|i| fields[i]) {
        Some(".") => {
            let name = unnamed.to_string();
            *unnamed += 1;
            (name, ".".to_string())
        }
        Some(raw) => (raw.to_string(), raw.to_string()),
        None => (generated(), generated()),
    };

    let score = match columns.score.map(|i| fields[i]) {
        Some(".") | None => None,
        Some(raw) => Some(raw.parse::<f64>().map_err(|_| BedParseError::InvalidNumber {
            line: line_number,
            field: "score",
            value: raw.to_string(),
        })?),
    };

    let strand = columns
        .strand
        .map_or(Strand::Plus, |i| Strand::from_field(fields[i]));

    let mut interval =
        GenomicInterval::try_new(name, chrom, start, end, strand).map_err(|_| BedParseError::InvalidInterval {
            line: line_number,
            start,
            end,
        })?;
    interval.score = score;
    interval.alternate_name = Some(alternate_name);
    interval.fields = fields.iter().map(|f| f.to_string()).collect();
    Ok(interval)
}

/// Read BED records into an index
///
/// Blank and `#` lines are skipped; entries sharing a name keep the first.
pub fn read_bed<R: BufRead>(reader: R, layout: BedLayout) -> Result<IntervalIndex, BedParseError> {
    let mut lines = LineIterator::new(reader);
    let mut intervals = Vec::new();
    let mut unnamed = 0usize;

    loop {
        let line_number = lines.line_number() + 1;
        let line = match lines.next_line() {
            Some(line) => line?,
            None => break,
        };
        if is_skippable(line) {
            continue;
        }
        intervals.push(parse_bed_line(line, line_number, layout, &mut unnamed)?);
    }

    debug!("Read {} BED records ({:?} layout)", intervals.len(), layout);
    Ok(IntervalIndex::from_intervals(intervals))
}

/// Read a plain, gzip or bzip2 compressed BED file
pub fn read_bed_file<P: AsRef<Path>>(path: P, layout: BedLayout) -> Result<IntervalIndex, BedParseError> {
    read_bed(open_text(path)?, layout)
}

/// Write intervals as BED3
pub fn write_bed3<'a, W, I>(writer: &mut W, intervals: I) -> io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a GenomicInterval>,
{
    let mut written = 0;
    for interval in intervals {
        writeln!(writer, "{}\t{}\t{}", interval.chrom, interval.start, interval.end)?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str, layout: BedLayout) -> Result<GenomicInterval, BedParseError> {
        let mut unnamed = 0;
        parse_bed_line(line.as_bytes(), 1, layout, &mut unnamed)
    }

    #[test]
    fn test_bed3() {
        let interval = parse("chr1\t1000\t2000", BedLayout::Bed3).unwrap();
        assert_eq!(interval.chrom, "chr1");
        assert_eq!((interval.start, interval.end), (1000, 2000));
        assert_eq!(interval.name, "chr1:1000-2000");
        assert_eq!(interval.strand, Strand::Plus);
        assert!(interval.score.is_none());
    }

    #[test]
    fn test_bed6() {
        let interval = parse("chr1\t1000\t2000\tgene1\t500\t-", BedLayout::Bed6).unwrap();
        assert_eq!(interval.name, "gene1");
        assert_eq!(interval.score, Some(500.0));
        assert_eq!(interval.strand, Strand::Minus);
        assert_eq!(interval.fields.len(), 6);
    }

    #[test]
    fn test_narrow_peak_layout() {
        let line = "chr2\t10\t60\t.\t0\t.\t8.5\t-1\t3.2\t25";
        let interval = parse(line, BedLayout::Bed6Plus4).unwrap();
        assert_eq!(interval.name, "0");
        assert_eq!(interval.alternate_name.as_deref(), Some("."));
        assert_eq!(interval.fields[BedLayout::Bed6Plus4.columns().signal_value.unwrap()], "8.5");
        assert_eq!(interval.strand, Strand::Unknown(".".to_string()));
    }

    #[test]
    fn test_expression_layout() {
        let line = "chr1\tHAVANA\ttranscript\t11868\t14409\t.\t+\tENST00000456328\t3.5";
        let interval = parse(line, BedLayout::BedExpression).unwrap();
        assert_eq!(interval.name, "ENST00000456328");
        assert_eq!((interval.start, interval.end), (11868, 14409));
        assert_eq!(interval.score, Some(3.5));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse("chr1\t1000", BedLayout::Bed3),
            Err(BedParseError::TooFewFields { expected: 3, found: 2, .. })
        ));
        assert!(matches!(
            parse("chr1\tabc\t2000", BedLayout::Bed3),
            Err(BedParseError::InvalidNumber { field: "start", .. })
        ));
        assert!(matches!(
            parse("chr1\t2000\t1000", BedLayout::Bed3),
            Err(BedParseError::InvalidInterval { .. })
        ));
        assert!(matches!(
            parse("chr1\t1\t2\tn\thigh\t+", BedLayout::Bed6),
            Err(BedParseError::InvalidNumber { field: "score", .. })
        ));
    }

    #[test]
    fn test_layout_names() {
        assert_eq!("BED6".parse::<BedLayout>(), Ok(BedLayout::Bed6));
        assert_eq!("narrowPeak".parse::<BedLayout>(), Ok(BedLayout::Bed6Plus4));
        assert!("bed12".parse::<BedLayout>().is_err());
        assert_eq!(BedLayout::BedExpression.columns().min_fields(), 9);
    }

    #[test]
    fn test_read_bed_numbers_unnamed_and_skips_comments() -> Result<(), BedParseError> {
        let text = "# peaks\nchr1\t0\t10\t.\t1\t+\n\nchr1\t20\t30\t.\t2\t+\nchr1\t40\t50\tpeak\t3\t+\n";
        let index = read_bed(text.as_bytes(), BedLayout::Bed6)?;
        assert_eq!(index.len(), 3);
        assert_eq!(index.get("0").map(|i| i.start), Some(0));
        assert_eq!(index.get("1").map(|i| i.start), Some(20));
        assert!(index.contains("peak"));
        Ok(())
    }

    #[test]
    fn test_read_bed_duplicate_names_keep_first() -> Result<(), BedParseError> {
        let text = "chr1\t0\t10\tdup\t0\t+\nchr1\t100\t110\tdup\t0\t+\n";
        let index = read_bed(text.as_bytes(), BedLayout::Bed6)?;
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("dup").map(|i| i.start), Some(0));
        Ok(())
    }

    #[test]
    fn test_read_bed_reports_line_number() {
        let text = "chr1\t0\t10\nchr1\tx\t10\n";
        let err = read_bed(text.as_bytes(), BedLayout::Bed3).unwrap_err();
        assert!(matches!(err, BedParseError::InvalidNumber { line: 2, .. }));
    }

    #[test]
    fn test_write_bed3() -> io::Result<()> {
        let a = GenomicInterval::new("a", "chr1", 5, 9, Strand::Minus);
        let mut out = Vec::new();
        assert_eq!(write_bed3(&mut out, [&a])?, 1);
        assert_eq!(out, b"chr1\t5\t9\n");
        Ok(())
    }
}
