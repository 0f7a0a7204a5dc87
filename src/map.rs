use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

/// Name of the synthetic spacer records separating fragments on a
/// chromosome.
pub const GAP_NAME: &str = "GAP";

/// One row of a fragment map: the placement of a fragment (or a gap) on an
/// assembled chromosome.
///
/// `fr_start`/`fr_end` delimit the half-open sub-range of the fragment used
/// in assembly; `ref_start`/`ref_end` are the half-open coordinates the
/// record occupies on the chromosome. Coordinates are signed because
/// extrapolating an anchor back to the full fragment length can run past
/// the chromosome start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRecord {
    pub fr_name: String,
    pub fr_length: i64,
    pub fr_start: i64,
    pub fr_end: i64,
    pub fr_strand: char,
    pub ref_chr: String,
    pub ref_start: i64,
    pub ref_end: i64,
}

impl MapRecord {
    pub fn is_gap(&self) -> bool {
        self.fr_name == GAP_NAME
    }
}

impl fmt::Display for MapRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.fr_name,
            self.fr_length,
            self.fr_start,
            self.fr_end,
            self.fr_strand,
            self.ref_chr,
            self.ref_start,
            self.ref_end
        )
    }
}

/// An ordered placement of fragments and gaps along reference chromosomes.
///
/// The map is a passive container: records are stored per chromosome and
/// sorted by `ref_start` on iteration, but contiguity is the map builder's
/// business, not the map's.
#[derive(Debug, Clone, Default)]
pub struct FragmentMap {
    fragments: BTreeMap<String, Vec<MapRecord>>,
}

impl FragmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a placement record to the map.
    pub fn add_record(&mut self, record: MapRecord) {
        self.fragments
            .entry(record.ref_chr.clone())
            .or_default()
            .push(record);
    }

    /// Chromosome names in lexicographic order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(|s| s.as_str())
    }

    /// Records of one chromosome, sorted by ascending `ref_start` (stable,
    /// so equal starts keep insertion order).
    pub fn fragments(&self, chromosome: &str) -> Result<Vec<&MapRecord>> {
        let records = self
            .fragments
            .get(chromosome)
            .ok_or_else(|| Error::MissingChromosome(chromosome.to_string()))?;

        let mut sorted: Vec<&MapRecord> = records.iter().collect();
        sorted.sort_by_key(|r| r.ref_start);
        Ok(sorted)
    }

    /// Total number of records across all chromosomes.
    pub fn len(&self) -> usize {
        self.fragments.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Read a fragment map from a tab-separated file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut map = FragmentMap::new();
        map.read_from(crate::alignment::open_input(path)?)?;
        Ok(map)
    }

    /// Read records from a tab-separated stream, adding them to the map.
    pub fn read_from<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let record = parse_map_line(line.trim_end_matches(['\r', '\n']), i + 1)?;
            self.add_record(record);
        }
        Ok(())
    }

    /// Write the fragment map to a file: chromosomes in lexicographic
    /// order, records by ascending `ref_start`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for chromosome in self.chromosomes() {
            for record in self.fragments(chromosome)? {
                writeln!(writer, "{record}")?;
            }
        }
        Ok(())
    }
}

fn parse_map_line(line: &str, lineno: usize) -> Result<MapRecord> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < 8 {
        return Err(Error::format(lineno, "the incorrect number of columns"));
    }

    let int = |s: &str| -> Result<i64> {
        s.parse()
            .map_err(|_| Error::format(lineno, format!("the incorrect numeric value {s}")))
    };

    let fr_strand = fields[4]
        .chars()
        .next()
        .ok_or_else(|| Error::format(lineno, "an empty strand column"))?;

    Ok(MapRecord {
        fr_name: fields[0].to_string(),
        fr_length: int(fields[1])?,
        fr_start: int(fields[2])?,
        fr_end: int(fields[3])?,
        fr_strand,
        ref_chr: fields[5].to_string(),
        ref_start: int(fields[6])?,
        ref_end: int(fields[7])?,
    })
}
