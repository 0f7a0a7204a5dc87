use crate::anchor::Anchor;
use crate::error::{Error, Result};
use crate::fasta::SeqLengths;
use crate::map::{FragmentMap, MapRecord, GAP_NAME};
use indexmap::IndexMap;

/// Converts anchors into a fragment map of full-fragment placements.
pub struct MapBuilder<'a> {
    gap_size: i64,
    fragment_lengths: &'a SeqLengths,
}

impl<'a> MapBuilder<'a> {
    pub fn new(gap_size: i64, fragment_lengths: &'a SeqLengths) -> Self {
        MapBuilder {
            gap_size,
            fragment_lengths,
        }
    }

    /// Build a fragment map from anchors.
    ///
    /// Anchors are grouped by chromosome and stable-sorted by the lower
    /// reference coordinate, so anchors starting at the same position keep
    /// their source order. Each placement extrapolates from the aligned
    /// sub-interval back to the full fragment length: the unaligned flank
    /// recorded in `fr_start` shifts the reference interval so the whole
    /// fragment, not just the aligned portion, occupies the chromosome.
    pub fn build<'b, I>(&self, anchors: I) -> Result<FragmentMap>
    where
        I: IntoIterator<Item = &'b Anchor>,
    {
        let mut chr_anchors: IndexMap<&str, Vec<&Anchor>> = IndexMap::new();
        for anchor in anchors {
            chr_anchors.entry(&anchor.ref_chr).or_default().push(anchor);
        }

        let mut map = FragmentMap::new();
        for (_, mut group) in chr_anchors {
            group.sort_by_key(|a| a.ref_start.min(a.ref_end));
            for anchor in group {
                map.add_record(self.place_anchor(anchor)?);
            }
        }
        Ok(map)
    }

    fn place_anchor(&self, anchor: &Anchor) -> Result<MapRecord> {
        let fr_length = self
            .fragment_lengths
            .get(&anchor.fragment)
            .copied()
            .ok_or_else(|| Error::MissingFragmentLength(anchor.fragment.clone()))?;

        let (ref_start, ref_end) = if anchor.fr_strand == '+' {
            let ref_start = anchor.ref_start - anchor.fr_start;
            (ref_start, ref_start + fr_length)
        } else {
            let ref_end = anchor.ref_end + anchor.fr_start;
            (ref_end - fr_length, ref_end)
        };

        Ok(MapRecord {
            fr_name: anchor.fragment.clone(),
            fr_length,
            fr_start: 0,
            fr_end: fr_length,
            fr_strand: anchor.fr_strand,
            ref_chr: anchor.ref_chr.clone(),
            ref_start,
            ref_end,
        })
    }

    /// Re-lay every chromosome contiguously from zero, separating
    /// consecutive fragments by one GAP record of the configured size.
    ///
    /// Existing GAP records in the input are dropped first, so the pass is
    /// safe to run on an already gapped map.
    pub fn insert_gaps(&self, map: &FragmentMap) -> Result<FragmentMap> {
        let mut gapped = FragmentMap::new();
        for chromosome in map.chromosomes() {
            let fragments: Vec<&MapRecord> = map
                .fragments(chromosome)?
                .into_iter()
                .filter(|r| !r.is_gap())
                .collect();

            let mut position = 0;
            let last = fragments.len().saturating_sub(1);
            for (i, record) in fragments.into_iter().enumerate() {
                let length = record.fr_end - record.fr_start;
                gapped.add_record(MapRecord {
                    ref_start: position,
                    ref_end: position + length,
                    ..record.clone()
                });
                position += length;

                if i < last {
                    gapped.add_record(MapRecord {
                        fr_name: GAP_NAME.to_string(),
                        fr_length: self.gap_size,
                        fr_start: 0,
                        fr_end: self.gap_size,
                        fr_strand: '+',
                        ref_chr: chromosome.to_string(),
                        ref_start: position,
                        ref_end: position + self.gap_size,
                    });
                    position += self.gap_size;
                }
            }
        }
        Ok(gapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(fragment: &str, strand: char, fr_start: i64, ref_start: i64, ref_end: i64) -> Anchor {
        Anchor {
            fragment: fragment.to_string(),
            fr_start,
            fr_end: fr_start + (ref_end - ref_start),
            fr_strand: strand,
            ref_chr: "chr1".to_string(),
            ref_start,
            ref_end,
        }
    }

    fn lengths() -> SeqLengths {
        [("fragment1".to_string(), 200), ("fragment2".to_string(), 150)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_forward_placement_extrapolates_flanks() {
        let lengths = lengths();
        let builder = MapBuilder::new(10, &lengths);
        // Aligned sub-interval starts 20 bases into the fragment.
        let map = builder.build([&anchor("fragment1", '+', 20, 1000, 1100)]).unwrap();
        let records = map.fragments("chr1").unwrap();
        assert_eq!(records[0].ref_start, 980);
        assert_eq!(records[0].ref_end, 1180);
        assert_eq!(records[0].fr_start, 0);
        assert_eq!(records[0].fr_end, 200);
    }

    #[test]
    fn test_reverse_placement_extrapolates_flanks() {
        let lengths = lengths();
        let builder = MapBuilder::new(10, &lengths);
        let map = builder.build([&anchor("fragment1", '-', 20, 1000, 1100)]).unwrap();
        let records = map.fragments("chr1").unwrap();
        assert_eq!(records[0].ref_end, 1120);
        assert_eq!(records[0].ref_start, 920);
    }

    #[test]
    fn test_missing_length_is_fatal() {
        let lengths = lengths();
        let builder = MapBuilder::new(10, &lengths);
        let err = builder
            .build([&anchor("fragmentX", '+', 0, 0, 100)])
            .unwrap_err();
        assert!(matches!(err, Error::MissingFragmentLength(name) if name == "fragmentX"));
    }

    #[test]
    fn test_insert_gaps_relays_contiguously() {
        let lengths = lengths();
        let builder = MapBuilder::new(10, &lengths);
        let map = builder
            .build([
                &anchor("fragment1", '+', 0, 1000, 1200),
                &anchor("fragment2", '+', 0, 5000, 5150),
            ])
            .unwrap();
        let gapped = builder.insert_gaps(&map).unwrap();

        let records = gapped.fragments("chr1").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].ref_start, 0);
        assert_eq!(records[0].ref_end, 200);
        assert_eq!(records[1].fr_name, GAP_NAME);
        assert_eq!(records[1].ref_start, 200);
        assert_eq!(records[1].ref_end, 210);
        assert_eq!(records[2].ref_start, 210);
        assert_eq!(records[2].ref_end, 360);
    }
}
