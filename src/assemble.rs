use crate::error::{Error, Result};
use crate::fasta::{Fasta, FastaWriter};
use crate::map::FragmentMap;
use log::info;
use std::io::Write;

/// Complement of a nucleotide, case-preserving; `N`/`X` map to themselves
/// and anything else passes through.
fn complement(base: char) -> char {
    match base {
        'A' => 'T',
        'T' => 'A',
        'C' => 'G',
        'G' => 'C',
        'a' => 't',
        't' => 'a',
        'c' => 'g',
        'g' => 'c',
        other => other,
    }
}

/// Reverse complement of a nucleotide sequence.
pub fn reverse_complement(sequence: &str) -> String {
    sequence.chars().rev().map(complement).collect()
}

/// Assemble one chromosome sequence by replaying its map records in
/// reference order.
pub fn chromosome_sequence(
    map: &FragmentMap,
    chromosome: &str,
    fragments: &Fasta,
) -> Result<String> {
    let mut sequence = String::new();
    for record in map.fragments(chromosome)? {
        if record.is_gap() {
            sequence.extend(std::iter::repeat('N').take(record.fr_length.max(0) as usize));
            continue;
        }

        let fragment = fragments
            .get(&record.fr_name)
            .ok_or_else(|| Error::MissingFragmentSequence(record.fr_name.clone()))?;

        let start = record.fr_start.max(0) as usize;
        let end = (record.fr_end.max(0) as usize).min(fragment.len());
        let slice = &fragment[start.min(end)..end];

        if record.fr_strand == '-' {
            sequence.push_str(&reverse_complement(slice));
        } else {
            sequence.push_str(slice);
        }
    }
    Ok(sequence)
}

/// Assemble every chromosome of the map and write the sequences in FASTA
/// format, chromosomes in lexicographic order.
///
/// A fragment missing from the sequence store aborts the whole assembly:
/// a silently skipped fragment would shift the coordinates of everything
/// placed after it.
pub fn assemble<W: Write>(
    map: &FragmentMap,
    fragments: &Fasta,
    writer: &mut FastaWriter<W>,
) -> Result<()> {
    for chromosome in map.chromosomes() {
        let sequence = chromosome_sequence(map, chromosome, fragments)?;
        writer.write_record(chromosome, &sequence)?;
        info!("assembled {} ({} bp)", chromosome, sequence.len());
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MapRecord, GAP_NAME};

    fn record(name: &str, strand: char, length: i64, ref_start: i64) -> MapRecord {
        MapRecord {
            fr_name: name.to_string(),
            fr_length: length,
            fr_start: 0,
            fr_end: length,
            fr_strand: strand,
            ref_chr: "chr1".to_string(),
            ref_start,
            ref_end: ref_start + length,
        }
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement("AAGG"), "CCTT");
        assert_eq!(reverse_complement("acgtN"), "Nacgt");
        assert_eq!(reverse_complement("AXT"), "AXT");
    }

    #[test]
    fn test_assembly_with_gap_and_reverse_fragment() {
        let mut map = FragmentMap::new();
        map.add_record(record("A", '+', 4, 0));
        map.add_record(record(GAP_NAME, '+', 3, 4));
        map.add_record(record("B", '-', 4, 7));

        let mut fragments = Fasta::new();
        fragments.insert("A", "ACGT");
        fragments.insert("B", "AAGG");

        let sequence = chromosome_sequence(&map, "chr1", &fragments).unwrap();
        assert_eq!(sequence, "ACGTNNNCCTT");
    }

    #[test]
    fn test_sub_range_slice() {
        let mut map = FragmentMap::new();
        let mut partial = record("A", '+', 8, 0);
        partial.fr_start = 2;
        partial.fr_end = 6;
        map.add_record(partial);

        let mut fragments = Fasta::new();
        fragments.insert("A", "AACCGGTT");

        let sequence = chromosome_sequence(&map, "chr1", &fragments).unwrap();
        assert_eq!(sequence, "CCGG");
    }

    #[test]
    fn test_missing_sequence_aborts() {
        let mut map = FragmentMap::new();
        map.add_record(record("A", '+', 4, 0));
        let fragments = Fasta::new();

        let err = chromosome_sequence(&map, "chr1", &fragments).unwrap_err();
        assert!(matches!(err, Error::MissingFragmentSequence(name) if name == "A"));
    }
}
