use std::path::Path;

use crate::error::{Error, Result};
use crate::similarity_table::{SimilarityRecord, SimilarityTable};

/// Identity and aligned fraction cutoffs, as percentages to match the units
/// of skani output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessThresholds {
    pub min_ani: f64,
    pub min_coverage: f64,
}

impl PreprocessThresholds {
    /// Both arguments are fractions in [0, 1], as given on the command line.
    pub fn from_fractions(min_ani: f64, min_coverage: f64) -> PreprocessThresholds {
        PreprocessThresholds {
            min_ani: min_ani * 100.0,
            min_coverage: min_coverage * 100.0,
        }
    }

    pub fn passes(&self, record: &SimilarityRecord) -> bool {
        !record.is_self_comparison()
            && record.ani >= self.min_ani
            && (record.align_fraction_ref >= self.min_coverage
                || record.align_fraction_query >= self.min_coverage)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// The smaller of the two aligned fractions times the ANI, rescaled to
/// [0, 1].
pub fn edge_weight(record: &SimilarityRecord) -> f64 {
    let min_aligned_fraction = record
        .align_fraction_ref
        .min(record.align_fraction_query);
    min_aligned_fraction * record.ani / 10_000.0
}

pub fn to_edge(record: SimilarityRecord, thresholds: &PreprocessThresholds) -> Option<Edge> {
    if !thresholds.passes(&record) {
        return None;
    }
    let weight = edge_weight(&record);
    Some(Edge {
        source: record.ref_name,
        target: record.query_name,
        weight,
    })
}

/// Filter a raw skani table and write the surviving pairs as a headerless
/// `source<TAB>target<TAB>weight` edge list, in input order. Returns the
/// number of edges written.
pub fn preprocess_similarity_table(
    input: &Path,
    output: &Path,
    thresholds: &PreprocessThresholds,
) -> Result<usize> {
    info!(
        "Preprocessing {} into edge list {}, requiring ANI >= {} and aligned fraction >= {}",
        input.display(),
        output.display(),
        thresholds.min_ani,
        thresholds.min_coverage
    );
    let mut table = SimilarityTable::open(input)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(output)
        .map_err(Error::csv(output))?;

    let mut num_read = 0usize;
    let mut num_written = 0usize;
    for record in table.records() {
        num_read += 1;
        if let Some(edge) = to_edge(record?, thresholds) {
            trace!("Keeping edge {:?}", edge);
            writer
                .write_record(&[
                    edge.source.as_str(),
                    edge.target.as_str(),
                    edge.weight.to_string().as_str(),
                ])
                .map_err(Error::csv(output))?;
            num_written += 1;
        }
    }
    writer.flush().map_err(Error::io(output))?;

    info!(
        "Kept {} of {} pairwise comparisons as clustering edges",
        num_written, num_read
    );
    Ok(num_written)
}
