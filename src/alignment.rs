use crate::error::{Error, Result};
use noodles::bgzf;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Open a text input and auto-detect bgzip compression, returning a boxed
/// BufRead.
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path)?;

    // Check by file extension (faster than reading magic bytes)
    let is_compressed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz" || ext == "bgz")
        .unwrap_or(false);

    if is_compressed {
        Ok(Box::new(BufReader::new(bgzf::io::reader::Reader::new(
            file,
        ))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// One row of a BLAST tabular (-outfmt 6) alignment file.
///
/// Coordinates are kept as read: 1-based and inclusive, with
/// `s_start > s_end` encoding a reverse-strand hit. Anchor selection
/// normalizes them to 0-based half-open.
#[derive(Debug, Clone, PartialEq)]
pub struct BlastAlignment {
    pub query: String,
    pub subject: String,
    pub identity: f64,
    pub length: i64,
    pub mismatches: i64,
    pub gap_openings: i64,
    pub q_start: i64,
    pub q_end: i64,
    pub s_start: i64,
    pub s_end: i64,
    pub e_value: f64,
    pub bit_score: f64,
}

/// Streaming reader of BLAST tabular alignment files.
///
/// Comment lines (leading `#`) are skipped; anything else must carry at
/// least the 12 standard columns.
pub struct BlastReader<R> {
    reader: R,
    lineno: usize,
}

impl BlastReader<Box<dyn BufRead>> {
    /// Open an alignment file, auto-detecting bgzip compression.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(BlastReader::new(open_input(path)?))
    }
}

impl<R: BufRead> BlastReader<R> {
    pub fn new(reader: R) -> Self {
        BlastReader { reader, lineno: 0 }
    }

    /// Read the next alignment, or `None` at end of input.
    pub fn read_alignment(&mut self) -> Result<Option<BlastAlignment>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.lineno += 1;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            return parse_blast_line(line.trim_end_matches(['\r', '\n']), self.lineno).map(Some);
        }
    }
}

impl<R: BufRead> Iterator for BlastReader<R> {
    type Item = Result<BlastAlignment>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_alignment().transpose()
    }
}

fn parse_blast_line(line: &str, lineno: usize) -> Result<BlastAlignment> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < 12 {
        return Err(Error::format(lineno, "the incorrect number of columns"));
    }

    let int = |s: &str| -> Result<i64> {
        s.parse()
            .map_err(|_| Error::format(lineno, format!("the incorrect integer value {s}")))
    };
    let float = |s: &str| -> Result<f64> {
        s.parse()
            .map_err(|_| Error::format(lineno, format!("the incorrect numeric value {s}")))
    };

    Ok(BlastAlignment {
        query: fields[0].to_string(),
        subject: fields[1].to_string(),
        identity: float(fields[2])?,
        length: int(fields[3])?,
        mismatches: int(fields[4])?,
        gap_openings: int(fields[5])?,
        q_start: int(fields[6])?,
        q_end: int(fields[7])?,
        s_start: int(fields[8])?,
        s_end: int(fields[9])?,
        e_value: float(fields[10])?,
        bit_score: float(fields[11])?,
    })
}
