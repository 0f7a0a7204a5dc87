use crate::alignment::open_input;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use rand::Rng;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

/// Fragment-length table: sequence name to length.
pub type SeqLengths = IndexMap<String, i64>;

/// Streaming FASTA record reader. The record name is the first word of the
/// header line.
pub struct FastaReader<R> {
    reader: R,
    lineno: usize,
    pending: Option<String>,
}

impl FastaReader<Box<dyn BufRead>> {
    /// Open a FASTA file, auto-detecting bgzip compression.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(FastaReader::new(open_input(path)?))
    }
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        FastaReader {
            reader,
            lineno: 0,
            pending: None,
        }
    }

    /// Read the next `(name, sequence)` record, or `None` at end of input.
    pub fn read_record(&mut self) -> Result<Option<(String, String)>> {
        let header = match self.pending.take() {
            Some(header) => header,
            None => loop {
                let mut line = String::new();
                if self.reader.read_line(&mut line)? == 0 {
                    return Ok(None);
                }
                self.lineno += 1;
                let line = line.trim_end_matches(['\r', '\n']);
                if line.is_empty() {
                    continue;
                }
                if !line.starts_with('>') {
                    return Err(Error::format(self.lineno, "a sequence header expected"));
                }
                break line.to_string();
            },
        };

        let name = header[1..]
            .split_whitespace()
            .next()
            .ok_or_else(|| Error::format(self.lineno, "an empty sequence header"))?
            .to_string();

        let mut sequence = String::new();
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            self.lineno += 1;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.starts_with('>') {
                self.pending = Some(line.to_string());
                break;
            }
            sequence.push_str(line.trim());
        }

        Ok(Some((name, sequence)))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// An in-memory sequence store with random access by name, preserving file
/// order.
#[derive(Debug, Clone, Default)]
pub struct Fasta {
    sequences: IndexMap<String, String>,
}

impl Fasta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all sequences of a FASTA file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut fasta = Fasta::new();
        for record in FastaReader::from_path(path)? {
            let (name, sequence) = record?;
            fasta.insert(name, sequence);
        }
        Ok(fasta)
    }

    pub fn insert(&mut self, name: impl Into<String>, sequence: impl Into<String>) {
        self.sequences.insert(name.into(), sequence.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.sequences.get(name).map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sequences.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sequences.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sequences.iter().map(|(n, s)| (n.as_str(), s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Sequence lengths keyed by name, used as the fragment-length table.
    pub fn lengths(&self) -> SeqLengths {
        self.sequences
            .iter()
            .map(|(name, seq)| (name.clone(), seq.len() as i64))
            .collect()
    }
}

/// Default line width of written FASTA sequences.
pub const DEFAULT_WIDTH: usize = 72;

/// FASTA writer wrapping sequence lines at a fixed width.
pub struct FastaWriter<W: Write> {
    inner: W,
    width: usize,
}

impl FastaWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(FastaWriter::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> FastaWriter<W> {
    pub fn new(inner: W) -> Self {
        FastaWriter::with_width(inner, DEFAULT_WIDTH)
    }

    pub fn with_width(inner: W, width: usize) -> Self {
        assert!(width > 0, "line width must be positive");
        FastaWriter { inner, width }
    }

    pub fn write_record(&mut self, name: &str, sequence: &str) -> Result<()> {
        writeln!(self.inner, ">{name}")?;
        for chunk in sequence.as_bytes().chunks(self.width) {
            self.inner.write_all(chunk)?;
            self.inner.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Generate a random nucleotide sequence of the given length.
pub fn random_sequence<R: Rng>(rng: &mut R, length: usize) -> String {
    const NUCLEOTIDES: [char; 4] = ['A', 'C', 'G', 'T'];
    (0..length)
        .map(|_| NUCLEOTIDES[rng.gen_range(0..NUCLEOTIDES.len())])
        .collect()
}
