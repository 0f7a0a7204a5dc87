use crate::error::{Error, Result};
use crate::map::{FragmentMap, MapRecord};
use log::info;
use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

/// Feature formats the transfer engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    Bed,
    Gff3,
    Vcf,
}

impl TrackFormat {
    /// Guess the format from a file name extension.
    pub fn from_extension(path: &str) -> Option<Self> {
        let name = path.strip_suffix(".gz").unwrap_or(path);
        match name.rsplit('.').next()? {
            "bed" => Some(TrackFormat::Bed),
            "gff" | "gff3" => Some(TrackFormat::Gff3),
            "vcf" => Some(TrackFormat::Vcf),
            _ => None,
        }
    }
}

impl FromStr for TrackFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bed" => Ok(TrackFormat::Bed),
            "gff" | "gff3" => Ok(TrackFormat::Gff3),
            "vcf" => Ok(TrackFormat::Vcf),
            other => Err(format!("unknown track format '{other}'")),
        }
    }
}

/// A BED feature: the three mandatory columns typed, everything after
/// carried verbatim (the strand, when present, is the third extra column).
#[derive(Debug, Clone, PartialEq)]
pub struct BedRecord {
    pub seq: String,
    pub start: i64,
    pub end: i64,
    pub rest: Vec<String>,
}

impl BedRecord {
    pub fn parse(line: &str, lineno: usize) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(Error::format(lineno, "the incorrect number of columns"));
        }
        let int = |s: &str| -> Result<i64> {
            s.parse()
                .map_err(|_| Error::format(lineno, format!("the incorrect numeric value {s}")))
        };
        Ok(BedRecord {
            seq: fields[0].to_string(),
            start: int(fields[1])?,
            end: int(fields[2])?,
            rest: fields[3..].iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn strand(&self) -> Option<char> {
        self.rest.get(2).and_then(|s| s.chars().next())
    }
}

impl fmt::Display for BedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.seq, self.start, self.end)?;
        for field in &self.rest {
            write!(f, "\t{field}")?;
        }
        Ok(())
    }
}

/// A GFF3 feature row; `start`/`end` are 1-based inclusive as in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct Gff3Record {
    pub seqid: String,
    pub source: String,
    pub feature_type: String,
    pub start: i64,
    pub end: i64,
    pub score: String,
    pub strand: char,
    pub phase: String,
    pub attributes: String,
}

impl Gff3Record {
    pub fn parse(line: &str, lineno: usize) -> Result<Self> {
        let fields: Vec<&str> = line.splitn(9, '\t').collect();
        if fields.len() < 9 {
            return Err(Error::format(lineno, "the incorrect number of columns"));
        }
        let int = |s: &str| -> Result<i64> {
            s.parse()
                .map_err(|_| Error::format(lineno, format!("the incorrect numeric value {s}")))
        };
        Ok(Gff3Record {
            seqid: fields[0].to_string(),
            source: fields[1].to_string(),
            feature_type: fields[2].to_string(),
            start: int(fields[3])?,
            end: int(fields[4])?,
            score: fields[5].to_string(),
            strand: fields[6]
                .chars()
                .next()
                .ok_or_else(|| Error::format(lineno, "an empty strand column"))?,
            phase: fields[7].to_string(),
            attributes: fields[8].to_string(),
        })
    }
}

impl fmt::Display for Gff3Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.seqid,
            self.source,
            self.feature_type,
            self.start,
            self.end,
            self.score,
            self.strand,
            self.phase,
            self.attributes
        )
    }
}

/// A VCF data row: `CHROM` and `POS` typed, the remaining columns carried
/// verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct VcfRecord {
    pub chrom: String,
    pub pos: i64,
    pub rest: Vec<String>,
}

impl VcfRecord {
    pub fn parse(line: &str, lineno: usize) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            return Err(Error::format(lineno, "the incorrect number of columns"));
        }
        let pos = fields[1]
            .parse()
            .map_err(|_| Error::format(lineno, format!("the incorrect numeric value {}", fields[1])))?;
        Ok(VcfRecord {
            chrom: fields[0].to_string(),
            pos,
            rest: fields[2..].iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl fmt::Display for VcfRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.chrom, self.pos)?;
        for field in &self.rest {
            write!(f, "\t{field}")?;
        }
        Ok(())
    }
}

/// Counts reported by a file-level transfer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    pub transferred: usize,
    pub dropped: usize,
}

/// Rewrites fragment-local feature coordinates into assembled-chromosome
/// coordinates using a fragment map.
pub struct Transfer {
    index: HashMap<String, MapRecord>,
}

impl Transfer {
    /// Index the map for repeated lookups. GAP records are skipped; if a
    /// fragment somehow occurs twice, the first placement wins.
    pub fn new(map: &FragmentMap) -> Result<Self> {
        let mut index = HashMap::new();
        for chromosome in map.chromosomes() {
            for record in map.fragments(chromosome)? {
                if record.is_gap() {
                    continue;
                }
                index
                    .entry(record.fr_name.clone())
                    .or_insert_with(|| record.clone());
            }
        }
        Ok(Transfer { index })
    }

    /// Load a fragment map file and index it.
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Transfer::new(&FragmentMap::from_path(path)?)
    }

    /// The placement record of a fragment, or `None` if the fragment is
    /// not part of the assembly.
    pub fn find_fragment(&self, fragment: &str) -> Option<&MapRecord> {
        self.index.get(fragment)
    }

    /// Map a fragment-local position to `(chromosome, position)`, or
    /// `None` if the fragment is absent from the map.
    pub fn coordinate(&self, fragment: &str, pos: i64) -> Option<(&str, i64)> {
        let record = self.find_fragment(fragment)?;
        Some((record.ref_chr.as_str(), position_on(record, pos)))
    }

    /// Transfer a BED feature, or drop it if its fragment is not in the
    /// map. Reverse-strand placement inverts interval order, hence the
    /// min/max swap of the transferred endpoints.
    pub fn transfer_bed(&self, feature: &BedRecord) -> Option<BedRecord> {
        let record = self.find_fragment(&feature.seq)?;
        let start = position_on(record, feature.start);
        let end = position_on(record, feature.end);

        let mut transferred = feature.clone();
        transferred.seq = record.ref_chr.clone();
        transferred.start = start.min(end);
        transferred.end = start.max(end);
        if let Some(strand) = feature.strand() {
            if strand == '+' || strand == '-' {
                transferred.rest[2] = transferred_strand(strand, record.fr_strand).to_string();
            }
        }
        Some(transferred)
    }

    /// Transfer a GFF3 feature (1-based inclusive coordinates at the
    /// boundary), or drop it if its fragment is not in the map.
    pub fn transfer_gff3(&self, feature: &Gff3Record) -> Option<Gff3Record> {
        let record = self.find_fragment(&feature.seqid)?;
        let start = position_on(record, feature.start - 1);
        let end = position_on(record, feature.end);

        let mut transferred = feature.clone();
        transferred.seqid = record.ref_chr.clone();
        transferred.start = start.min(end) + 1;
        transferred.end = start.max(end);
        if feature.strand != '.' {
            transferred.strand = transferred_strand(feature.strand, record.fr_strand);
        }
        Some(transferred)
    }

    /// Transfer a VCF variant position, or drop it if its fragment is not
    /// in the map. Point features need no swap or strand logic.
    pub fn transfer_vcf(&self, variant: &VcfRecord) -> Option<VcfRecord> {
        let record = self.find_fragment(&variant.chrom)?;
        let mut transferred = variant.clone();
        transferred.chrom = record.ref_chr.clone();
        transferred.pos = position_on(record, variant.pos);
        Some(transferred)
    }

    /// Transfer a whole feature file. Comment and header lines (leading
    /// `#`) pass through verbatim; features whose fragment is absent from
    /// the map are dropped and counted.
    pub fn transfer_file<R: BufRead, W: Write>(
        &self,
        format: TrackFormat,
        input: R,
        mut output: W,
    ) -> Result<TransferStats> {
        let mut stats = TransferStats::default();
        for (i, line) in input.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() || trimmed.starts_with('#') {
                writeln!(output, "{trimmed}")?;
                continue;
            }

            let transferred = match format {
                TrackFormat::Bed => self
                    .transfer_bed(&BedRecord::parse(trimmed, i + 1)?)
                    .map(|r| r.to_string()),
                TrackFormat::Gff3 => self
                    .transfer_gff3(&Gff3Record::parse(trimmed, i + 1)?)
                    .map(|r| r.to_string()),
                TrackFormat::Vcf => self
                    .transfer_vcf(&VcfRecord::parse(trimmed, i + 1)?)
                    .map(|r| r.to_string()),
            };

            match transferred {
                Some(line) => {
                    writeln!(output, "{line}")?;
                    stats.transferred += 1;
                }
                None => stats.dropped += 1,
            }
        }

        info!(
            "transferred {} features, dropped {} (fragments not in the map)",
            stats.transferred, stats.dropped
        );
        Ok(stats)
    }
}

fn position_on(record: &MapRecord, pos: i64) -> i64 {
    if record.fr_strand == '+' {
        record.ref_start + pos
    } else {
        record.ref_end - pos
    }
}

/// The transferred strand is the product of the feature strand and the
/// fragment strand.
fn transferred_strand(feature: char, fragment: char) -> char {
    let feature_sign = if feature == '-' { -1 } else { 1 };
    let fragment_sign = if fragment == '-' { -1 } else { 1 };
    if feature_sign * fragment_sign == -1 {
        '-'
    } else {
        '+'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(records: &[MapRecord]) -> FragmentMap {
        let mut map = FragmentMap::new();
        for record in records {
            map.add_record(record.clone());
        }
        map
    }

    fn placement(name: &str, strand: char, ref_start: i64, ref_end: i64) -> MapRecord {
        MapRecord {
            fr_name: name.to_string(),
            fr_length: ref_end - ref_start,
            fr_start: 0,
            fr_end: ref_end - ref_start,
            fr_strand: strand,
            ref_chr: "chr1".to_string(),
            ref_start,
            ref_end,
        }
    }

    #[test]
    fn test_coordinate_endpoints() {
        let map = map_with(&[
            placement("fwd", '+', 100, 110),
            placement("rev", '-', 200, 210),
        ]);
        let transfer = Transfer::new(&map).unwrap();

        assert_eq!(transfer.coordinate("fwd", 0), Some(("chr1", 100)));
        assert_eq!(transfer.coordinate("fwd", 10), Some(("chr1", 110)));
        assert_eq!(transfer.coordinate("rev", 0), Some(("chr1", 210)));
        assert_eq!(transfer.coordinate("rev", 10), Some(("chr1", 200)));
        assert_eq!(transfer.coordinate("missing", 0), None);
    }

    #[test]
    fn test_bed_reverse_interval_swaps_and_flips() {
        let map = map_with(&[placement("rev", '-', 100, 110)]);
        let transfer = Transfer::new(&map).unwrap();

        let feature = BedRecord::parse("rev\t2\t6\tfeat\t0\t+", 1).unwrap();
        let transferred = transfer.transfer_bed(&feature).unwrap();
        assert_eq!(transferred.seq, "chr1");
        assert_eq!(transferred.start, 104);
        assert_eq!(transferred.end, 108);
        assert_eq!(transferred.strand(), Some('-'));
    }

    #[test]
    fn test_strand_product() {
        assert_eq!(transferred_strand('+', '+'), '+');
        assert_eq!(transferred_strand('-', '+'), '-');
        assert_eq!(transferred_strand('+', '-'), '-');
        assert_eq!(transferred_strand('-', '-'), '+');
    }

    #[test]
    fn test_absent_fragment_dropped() {
        let map = map_with(&[placement("present", '+', 0, 10)]);
        let transfer = Transfer::new(&map).unwrap();

        let feature = BedRecord::parse("absent\t2\t6", 1).unwrap();
        assert_eq!(transfer.transfer_bed(&feature), None);
    }

    #[test]
    fn test_gff3_one_based_round_trip() {
        let map = map_with(&[placement("frag", '+', 100, 200)]);
        let transfer = Transfer::new(&map).unwrap();

        let feature =
            Gff3Record::parse("frag\tsrc\tgene\t11\t20\t.\t+\t.\tID=g1", 1).unwrap();
        let transferred = transfer.transfer_gff3(&feature).unwrap();
        assert_eq!(transferred.seqid, "chr1");
        assert_eq!(transferred.start, 111);
        assert_eq!(transferred.end, 120);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TrackFormat::from_extension("x.bed"), Some(TrackFormat::Bed));
        assert_eq!(TrackFormat::from_extension("x.gff3"), Some(TrackFormat::Gff3));
        assert_eq!(TrackFormat::from_extension("x.vcf.gz"), Some(TrackFormat::Vcf));
        assert_eq!(TrackFormat::from_extension("x.txt"), None);
    }
}
