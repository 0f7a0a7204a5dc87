use crate::assemble::reverse_complement;
use crate::error::Result;
use crate::fasta::{random_sequence, Fasta, FastaWriter};
use crate::map::{FragmentMap, MapRecord, GAP_NAME};
use rand::Rng;
use std::collections::BTreeMap;
use std::path::Path;

/// Simulates genome fragments and the chromosomes composed from them,
/// producing a ground-truth fragment map alongside the sequences. Used to
/// exercise the whole pipeline without a real aligner.
pub struct Simulator {
    fragment_length: usize,
    fragment_number: usize,
    chromosome_number: usize,
    gap_size: usize,
}

/// The simulated data set: the map, the fragment sequences and the
/// chromosome sequences the map assembles them into.
pub struct SimulatedAssembly {
    pub map: FragmentMap,
    pub fragments: Fasta,
    pub chromosomes: BTreeMap<String, String>,
}

impl Simulator {
    pub fn new(
        fragment_length: usize,
        fragment_number: usize,
        chromosome_number: usize,
        gap_size: usize,
    ) -> Self {
        Simulator {
            fragment_length,
            fragment_number,
            chromosome_number,
            gap_size,
        }
    }

    /// Generate fragments, assign each to a random chromosome with a
    /// random orientation, and lay them out with gaps in between.
    pub fn run<R: Rng>(&self, rng: &mut R) -> SimulatedAssembly {
        let mut fragments = Fasta::new();
        let mut map = FragmentMap::new();
        let mut chromosomes: BTreeMap<String, String> = (0..self.chromosome_number)
            .map(|i| (format!("chr{}", i + 1), String::new()))
            .collect();
        let mut positions = vec![0i64; self.chromosome_number];

        for i in 0..self.fragment_number {
            let fr_name = format!("fragment{}", i + 1);
            let sequence = random_sequence(rng, self.fragment_length);
            let chr_num = rng.gen_range(0..self.chromosome_number);
            let ref_chr = format!("chr{}", chr_num + 1);
            let fr_strand = if rng.gen_bool(0.5) { '+' } else { '-' };
            let fr_length = self.fragment_length as i64;

            map.add_record(MapRecord {
                fr_name: fr_name.clone(),
                fr_length,
                fr_start: 0,
                fr_end: fr_length,
                fr_strand,
                ref_chr: ref_chr.clone(),
                ref_start: positions[chr_num],
                ref_end: positions[chr_num] + fr_length,
            });
            positions[chr_num] += fr_length;

            map.add_record(MapRecord {
                fr_name: GAP_NAME.to_string(),
                fr_length: self.gap_size as i64,
                fr_start: 0,
                fr_end: self.gap_size as i64,
                fr_strand: '+',
                ref_chr: ref_chr.clone(),
                ref_start: positions[chr_num],
                ref_end: positions[chr_num] + self.gap_size as i64,
            });
            positions[chr_num] += self.gap_size as i64;

            // Build the chromosome sequence independently of the assembler.
            let chromosome = chromosomes.entry(ref_chr).or_default();
            if fr_strand == '-' {
                chromosome.push_str(&reverse_complement(&sequence));
            } else {
                chromosome.push_str(&sequence);
            }
            chromosome.extend(std::iter::repeat('N').take(self.gap_size));

            fragments.insert(fr_name, sequence);
        }

        SimulatedAssembly {
            map,
            fragments,
            chromosomes,
        }
    }
}

impl SimulatedAssembly {
    /// Write the simulated map, fragment FASTA and chromosome FASTA.
    pub fn write<P: AsRef<Path>>(
        &self,
        map_path: P,
        fragment_path: P,
        chromosome_path: P,
    ) -> Result<()> {
        self.map.write(map_path)?;

        let mut fragment_writer = FastaWriter::create(fragment_path)?;
        for (name, sequence) in self.fragments.iter() {
            fragment_writer.write_record(name, sequence)?;
        }
        fragment_writer.flush()?;

        let mut chromosome_writer = FastaWriter::create(chromosome_path)?;
        for (name, sequence) in &self.chromosomes {
            chromosome_writer.write_record(name, sequence)?;
        }
        chromosome_writer.flush()
    }
}
