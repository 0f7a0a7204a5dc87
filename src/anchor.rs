use crate::alignment::BlastAlignment;
use crate::error::{Error, Result};
use crate::fasta::SeqLengths;
use indexmap::IndexMap;
use log::{debug, info};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// The single chosen placement of a fragment, normalized to 0-based
/// half-open coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub fragment: String,
    pub fr_start: i64,
    pub fr_end: i64,
    pub fr_strand: char,
    pub ref_chr: String,
    pub ref_start: i64,
    pub ref_end: i64,
}

impl Anchor {
    fn from_alignment(aln: &BlastAlignment) -> Self {
        Anchor {
            fragment: aln.query.clone(),
            fr_start: aln.q_start - 1,
            fr_end: aln.q_end,
            fr_strand: if aln.s_start < aln.s_end { '+' } else { '-' },
            ref_chr: aln.subject.clone(),
            ref_start: aln.s_start.min(aln.s_end) - 1,
            ref_end: aln.s_start.max(aln.s_end),
        }
    }
}

/// Chromosome arm relative to the centromere. Carried as a typed value;
/// the `_1`/`_2` name suffix only appears at the serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arm {
    First,
    Second,
}

impl Arm {
    pub fn suffix(self) -> &'static str {
        match self {
            Arm::First => "_1",
            Arm::Second => "_2",
        }
    }
}

/// Produce the arm-qualified chromosome name used downstream of anchor
/// selection.
pub fn arm_qualified(chromosome: &str, arm: Arm) -> String {
    format!("{}{}", chromosome, arm.suffix())
}

/// Centromere start positions keyed by reference chromosome.
pub type Centromeres = HashMap<String, i64>;

/// Read a centromere table: tab-separated rows of chromosome name and
/// centromere start (extra columns ignored).
pub fn read_centromeres<P: AsRef<Path>>(path: P) -> Result<Centromeres> {
    let reader = crate::alignment::open_input(path)?;
    let mut centromeres = Centromeres::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() < 2 {
            return Err(Error::format(i + 1, "the incorrect number of columns"));
        }
        let start: i64 = fields[1].parse().map_err(|_| {
            Error::format(i + 1, format!("the incorrect numeric value {}", fields[1]))
        })?;
        centromeres.insert(fields[0].to_string(), start);
    }
    Ok(centromeres)
}

/// Anchor selection output: one anchor per placed fragment (encounter order
/// preserved), plus the fragments needing manual attention.
#[derive(Debug, Default)]
pub struct AnchorSet {
    pub anchors: IndexMap<String, Anchor>,
    /// Fragment and the chromosome it belongs to; the two best alignments
    /// agree on the subject but fail the score-ratio test.
    pub unlocalized: Vec<(String, String)>,
    /// Fragments whose two best alignments disagree on the subject.
    pub unplaced: Vec<String>,
}

/// The two highest-scoring alignments of a fragment, retained while
/// streaming.
///
/// An alignment whose score equals a retained one never displaces it, so
/// encounter order is the tie break. With more than two candidates tied at
/// the maximum score this keeps the first two seen.
#[derive(Debug)]
struct TopAlignments {
    best: BlastAlignment,
    second: Option<BlastAlignment>,
}

impl TopAlignments {
    fn new(aln: BlastAlignment) -> Self {
        TopAlignments { best: aln, second: None }
    }

    fn offer(&mut self, aln: BlastAlignment) {
        if aln.bit_score > self.best.bit_score {
            self.second = Some(std::mem::replace(&mut self.best, aln));
        } else if self
            .second
            .as_ref()
            .map_or(true, |s| aln.bit_score > s.bit_score)
        {
            self.second = Some(aln);
        }
    }
}

/// Reduces per-fragment alignments to anchors.
pub struct AnchorSelector<'a> {
    fragment_lengths: &'a SeqLengths,
    min_fragment_length: Option<i64>,
    centromeres: Option<&'a Centromeres>,
}

impl<'a> AnchorSelector<'a> {
    pub fn new(fragment_lengths: &'a SeqLengths) -> Self {
        AnchorSelector {
            fragment_lengths,
            min_fragment_length: None,
            centromeres: None,
        }
    }

    /// Skip fragments shorter than the given length.
    pub fn with_min_fragment_length(mut self, length: i64) -> Self {
        self.min_fragment_length = Some(length);
        self
    }

    /// Treat chromosome arms around the given centromeres as separate
    /// placement targets.
    pub fn with_centromeres(mut self, centromeres: &'a Centromeres) -> Self {
        self.centromeres = Some(centromeres);
        self
    }

    /// Classify every fragment seen in the alignment stream.
    ///
    /// A fragment with a single alignment is placed outright; with two
    /// retained alignments the best one wins only if its score exceeds the
    /// runner-up by more than `ratio_threshold`, otherwise the fragment is
    /// unlocalized (same subject) or unplaced (different subjects).
    pub fn select<I>(&self, alignments: I, ratio_threshold: f64) -> Result<AnchorSet>
    where
        I: IntoIterator<Item = Result<BlastAlignment>>,
    {
        let mut top: IndexMap<String, TopAlignments> = IndexMap::new();

        for alignment in alignments {
            let mut alignment = alignment?;

            if let Some(min_length) = self.min_fragment_length {
                let length = self
                    .fragment_lengths
                    .get(&alignment.query)
                    .copied()
                    .ok_or_else(|| Error::MissingFragmentLength(alignment.query.clone()))?;
                if length < min_length {
                    debug!(
                        "fragment {} skipped: length {} below the minimum {}",
                        alignment.query, length, min_length
                    );
                    continue;
                }
            }

            if let Some(centromeres) = self.centromeres {
                if let Some(&boundary) = centromeres.get(&alignment.subject) {
                    let midpoint = (alignment.s_start + alignment.s_end) / 2;
                    let arm = if midpoint < boundary {
                        Arm::First
                    } else {
                        Arm::Second
                    };
                    alignment.subject = arm_qualified(&alignment.subject, arm);
                }
            }

            match top.entry(alignment.query.clone()) {
                indexmap::map::Entry::Occupied(mut entry) => entry.get_mut().offer(alignment),
                indexmap::map::Entry::Vacant(entry) => {
                    entry.insert(TopAlignments::new(alignment));
                }
            }
        }

        let mut set = AnchorSet::default();
        for (fragment, candidates) in top {
            match candidates.second {
                None => {
                    set.anchors
                        .insert(fragment, Anchor::from_alignment(&candidates.best));
                }
                Some(second) => {
                    if candidates.best.bit_score / second.bit_score > ratio_threshold {
                        set.anchors
                            .insert(fragment, Anchor::from_alignment(&candidates.best));
                    } else if candidates.best.subject == second.subject {
                        set.unlocalized
                            .push((fragment, candidates.best.subject.clone()));
                    } else {
                        set.unplaced.push(fragment);
                    }
                }
            }
        }

        info!(
            "anchor selection: {} placed, {} unlocalized, {} unplaced",
            set.anchors.len(),
            set.unlocalized.len(),
            set.unplaced.len()
        );

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment(query: &str, subject: &str, s_start: i64, s_end: i64, score: f64) -> BlastAlignment {
        BlastAlignment {
            query: query.to_string(),
            subject: subject.to_string(),
            identity: 100.0,
            length: 100,
            mismatches: 0,
            gap_openings: 0,
            q_start: 1,
            q_end: 100,
            s_start,
            s_end,
            e_value: 0.0,
            bit_score: score,
        }
    }

    #[test]
    fn test_top_two_retention() {
        let mut top = TopAlignments::new(alignment("f", "chr1", 1, 100, 50.0));
        top.offer(alignment("f", "chr2", 1, 100, 80.0));
        top.offer(alignment("f", "chr3", 1, 100, 60.0));
        assert_eq!(top.best.subject, "chr2");
        assert_eq!(top.second.as_ref().unwrap().subject, "chr3");
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let mut top = TopAlignments::new(alignment("f", "chr1", 1, 100, 80.0));
        top.offer(alignment("f", "chr2", 1, 100, 80.0));
        top.offer(alignment("f", "chr3", 1, 100, 80.0));
        assert_eq!(top.best.subject, "chr1");
        assert_eq!(top.second.as_ref().unwrap().subject, "chr2");
    }

    #[test]
    fn test_anchor_coordinates() {
        // Forward: subject coordinates ascending.
        let anchor = Anchor::from_alignment(&alignment("f", "chr1", 5001, 5100, 90.0));
        assert_eq!(anchor.fr_start, 0);
        assert_eq!(anchor.fr_end, 100);
        assert_eq!(anchor.fr_strand, '+');
        assert_eq!(anchor.ref_start, 5000);
        assert_eq!(anchor.ref_end, 5100);

        // Reverse: subject coordinates descending.
        let anchor = Anchor::from_alignment(&alignment("f", "chr1", 5100, 5001, 90.0));
        assert_eq!(anchor.fr_strand, '-');
        assert_eq!(anchor.ref_start, 5000);
        assert_eq!(anchor.ref_end, 5100);
    }

    #[test]
    fn test_centromere_arm_names() {
        assert_eq!(arm_qualified("chr1", Arm::First), "chr1_1");
        assert_eq!(arm_qualified("chr1", Arm::Second), "chr1_2");
    }
}
