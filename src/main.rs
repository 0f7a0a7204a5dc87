use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufWriter, Write};

use chromstitch::alignment::{open_input, BlastReader};
use chromstitch::anchor::{read_centromeres, AnchorSelector};
use chromstitch::assemble::assemble;
use chromstitch::builder::MapBuilder;
use chromstitch::fasta::{Fasta, FastaWriter};
use chromstitch::map::FragmentMap;
use chromstitch::simulator::Simulator;
use chromstitch::transfer::{TrackFormat, Transfer};

/// Reference-assisted chromosome assembly tool
///
/// Builds a fragment map from alignments of fragments to reference
/// chromosomes, assembles chromosome sequences from the map, and lifts
/// feature coordinates from fragments onto the assembled chromosomes.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Construct a fragment map from fragment alignments to reference
    /// chromosomes
    Fragmentmap {
        /// BLAST tabular file of fragment alignments to reference chromosomes
        alignment_file: String,

        /// Size of the gap inserted between mapped fragments
        gap_size: i64,

        /// FASTA file of fragment sequences (the fragment-length source)
        fragment_fasta: String,

        /// Output fragment map file
        output_map: String,

        /// Least ratio of the two greatest alignment scores required to
        /// consider a fragment placed
        #[clap(short = 'r', long = "ratio-threshold", default_value_t = 1.2)]
        ratio_threshold: f64,

        /// Skip fragments shorter than this length
        #[clap(long = "min-fragment-length")]
        min_fragment_length: Option<i64>,

        /// Tab-separated table of reference chromosome centromere starts;
        /// chromosome arms are then treated as separate placement targets
        #[clap(long = "centromeres")]
        centromeres: Option<String>,

        /// Write unlocalized fragment names (and their chromosomes) here
        #[clap(long = "unlocalized")]
        unlocalized: Option<String>,

        /// Write unplaced fragment names here
        #[clap(long = "unplaced")]
        unplaced: Option<String>,

        /// Keep anchor-derived coordinates instead of re-laying each
        /// chromosome contiguously with gaps
        #[clap(long = "no-gaps")]
        no_gaps: bool,
    },

    /// Get a FASTA file of assembled chromosomes from a fragment map
    Assemble {
        /// Fragment map file
        map: String,

        /// FASTA file of fragment sequences to be assembled
        fragment_fasta: String,

        /// Output FASTA file of the assembled chromosome sequences
        output_fasta: String,

        /// Line width of the output FASTA file
        #[clap(long = "width", default_value_t = chromstitch::fasta::DEFAULT_WIDTH)]
        width: usize,
    },

    /// Transfer feature coordinates from fragments onto assembled
    /// chromosomes
    Transfer {
        /// Fragment map file
        map: String,

        /// Feature file (BED, GFF3 or VCF) with fragment coordinates
        features: String,

        /// Output feature file with chromosome coordinates
        output: String,

        /// Feature file format: bed, gff3 or vcf (default: guessed from
        /// the file name)
        #[clap(short = 'f', long = "format")]
        format: Option<String>,
    },

    /// Simulate fragments, chromosomes and the fragment map relating them
    Simulate {
        /// Output fragment map file
        output_map: String,

        /// Output FASTA file of fragment sequences
        output_fragments: String,

        /// Output FASTA file of chromosome sequences
        output_chromosomes: String,

        /// Length of each simulated fragment
        #[clap(long = "fragment-length", default_value_t = 1000)]
        fragment_length: usize,

        /// Number of simulated fragments
        #[clap(long = "fragments", default_value_t = 20)]
        fragment_number: usize,

        /// Number of simulated chromosomes
        #[clap(long = "chromosomes", default_value_t = 2)]
        chromosome_number: usize,

        /// Gap size between fragments on a chromosome
        #[clap(long = "gap-size", default_value_t = 100)]
        gap_size: usize,

        /// Random seed for reproducible output
        #[clap(long = "seed")]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Fragmentmap {
            alignment_file,
            gap_size,
            fragment_fasta,
            output_map,
            ratio_threshold,
            min_fragment_length,
            centromeres,
            unlocalized,
            unplaced,
            no_gaps,
        } => {
            let fragments = Fasta::from_path(&fragment_fasta)
                .with_context(|| format!("failed to read {fragment_fasta}"))?;
            let lengths = fragments.lengths();

            let centromere_table = centromeres
                .as_deref()
                .map(read_centromeres)
                .transpose()
                .context("failed to read the centromere table")?;

            let mut selector = AnchorSelector::new(&lengths);
            if let Some(length) = min_fragment_length {
                selector = selector.with_min_fragment_length(length);
            }
            if let Some(table) = centromere_table.as_ref() {
                selector = selector.with_centromeres(table);
            }

            let reader = BlastReader::from_path(&alignment_file)
                .with_context(|| format!("failed to open {alignment_file}"))?;
            let anchors = selector
                .select(reader, ratio_threshold)
                .context("anchor selection failed")?;

            if !anchors.unlocalized.is_empty() || !anchors.unplaced.is_empty() {
                warn!(
                    "{} unlocalized and {} unplaced fragments left out of the map",
                    anchors.unlocalized.len(),
                    anchors.unplaced.len()
                );
            }
            if let Some(path) = unlocalized {
                let mut out = BufWriter::new(File::create(&path)?);
                for (fragment, chromosome) in &anchors.unlocalized {
                    writeln!(out, "{fragment}\t{chromosome}")?;
                }
            }
            if let Some(path) = unplaced {
                let mut out = BufWriter::new(File::create(&path)?);
                for fragment in &anchors.unplaced {
                    writeln!(out, "{fragment}")?;
                }
            }

            let builder = MapBuilder::new(gap_size, &lengths);
            let mut map = builder
                .build(anchors.anchors.values())
                .context("fragment map construction failed")?;
            if !no_gaps {
                map = builder.insert_gaps(&map)?;
            }
            map.write(&output_map)
                .with_context(|| format!("failed to write {output_map}"))?;
            info!("fragment map with {} records written to {output_map}", map.len());
        }

        Command::Assemble {
            map,
            fragment_fasta,
            output_fasta,
            width,
        } => {
            let fragment_map =
                FragmentMap::from_path(&map).with_context(|| format!("failed to read {map}"))?;
            let fragments = Fasta::from_path(&fragment_fasta)
                .with_context(|| format!("failed to read {fragment_fasta}"))?;
            let file = File::create(&output_fasta)
                .with_context(|| format!("failed to create {output_fasta}"))?;
            let mut writer = FastaWriter::with_width(BufWriter::new(file), width);
            assemble(&fragment_map, &fragments, &mut writer).context("assembly failed")?;
        }

        Command::Transfer {
            map,
            features,
            output,
            format,
        } => {
            let format = match format {
                Some(name) => name.parse::<TrackFormat>().map_err(anyhow::Error::msg)?,
                None => TrackFormat::from_extension(&features).with_context(|| {
                    format!("cannot guess the format of {features}; use --format")
                })?,
            };

            let transfer =
                Transfer::from_path(&map).with_context(|| format!("failed to read {map}"))?;
            let input = open_input(&features)
                .with_context(|| format!("failed to open {features}"))?;
            let out = BufWriter::new(
                File::create(&output).with_context(|| format!("failed to create {output}"))?,
            );
            let stats = transfer
                .transfer_file(format, input, out)
                .context("feature transfer failed")?;
            info!(
                "{} features transferred, {} dropped",
                stats.transferred, stats.dropped
            );
        }

        Command::Simulate {
            output_map,
            output_fragments,
            output_chromosomes,
            fragment_length,
            fragment_number,
            chromosome_number,
            gap_size,
            seed,
        } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let simulator =
                Simulator::new(fragment_length, fragment_number, chromosome_number, gap_size);
            let assembly = simulator.run(&mut rng);
            assembly
                .write(&output_map, &output_fragments, &output_chromosomes)
                .context("failed to write the simulated data")?;
        }
    }

    Ok(())
}
