use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{Error, Result};
use crate::similarity_table::{SimilarityRecord, SimilarityTable};

pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub mean_ani: f64,
}

/// Read an MCL cluster file, where each line is one cluster and its members
/// are tab-separated. Clusters with fewer than `min_cluster_size` members
/// are skipped, and the remaining clusters are returned in file order.
pub fn read_clusters(clusters_file: &Path, min_cluster_size: usize) -> Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_path(clusters_file)
        .map_err(Error::csv(clusters_file))?;

    let mut clusters = vec![];
    let mut num_skipped = 0usize;
    for record_res in rdr.records() {
        let record = record_res.map_err(Error::csv(clusters_file))?;
        let cluster: Vec<String> = record
            .iter()
            .map(|member| member.trim())
            .filter(|member| !member.is_empty())
            .map(|member| member.to_string())
            .collect();
        if cluster.len() >= min_cluster_size {
            clusters.push(cluster);
        } else {
            num_skipped += 1;
        }
    }
    info!(
        "Read in {} clusters from {}, skipping {} with fewer than {} members",
        clusters.len(),
        clusters_file.display(),
        num_skipped,
        min_cluster_size
    );
    Ok(clusters)
}

/// Map each member name to the index of its cluster. If a name appears in
/// more than one cluster, the last one wins.
pub fn member_to_cluster(clusters: &[Vec<String>]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (cluster_id, cluster) in clusters.iter().enumerate() {
        for member in cluster {
            if let Some(previous) = map.insert(member.clone(), cluster_id) {
                warn!(
                    "Genome {} found in both cluster {} and cluster {}, using the latter",
                    member, previous, cluster_id
                );
            }
        }
    }
    map
}

/// Mean ANI of the pairs whose two genomes fall in the same cluster, sorted
/// by ascending mean (then by cluster id). Pairs with either genome outside
/// every cluster are ignored.
pub fn summarize_clusters<I>(
    records: I,
    membership: &HashMap<String, usize>,
) -> Result<Vec<ClusterSummary>>
where
    I: IntoIterator<Item = Result<SimilarityRecord>>,
{
    let mut totals: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
    for record in records {
        let record = record?;
        let ref_cluster = match membership.get(&record.ref_name) {
            Some(c) => *c,
            None => continue,
        };
        match membership.get(&record.query_name) {
            Some(query_cluster) if *query_cluster == ref_cluster => {
                let entry = totals.entry(ref_cluster).or_insert((0.0, 0));
                entry.0 += record.ani;
                entry.1 += 1;
            }
            _ => {}
        }
    }

    let mut summaries: Vec<ClusterSummary> = totals
        .into_iter()
        .map(|(cluster, (sum, count))| ClusterSummary {
            cluster,
            mean_ani: sum / count as f64,
        })
        .collect();
    summaries.sort_by(|a, b| {
        a.mean_ani
            .total_cmp(&b.mean_ani)
            .then(a.cluster.cmp(&b.cluster))
    });
    Ok(summaries)
}

pub fn write_cluster_summaries(summaries: &[ClusterSummary], output: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(output)
        .map_err(Error::csv(output))?;
    writer
        .write_record(&["cluster", "avg_ANI"])
        .map_err(Error::csv(output))?;
    for summary in summaries {
        writer
            .write_record(&[summary.cluster.to_string(), summary.mean_ani.to_string()])
            .map_err(Error::csv(output))?;
    }
    writer.flush().map_err(Error::io(output))
}

/// Join cluster membership onto a skani table and write the mean ANI of
/// each cluster to `output`.
pub fn summarize_and_save(
    similarity_table: &Path,
    clusters_file: &Path,
    output: &Path,
    min_cluster_size: usize,
) -> Result<Vec<ClusterSummary>> {
    let clusters = read_clusters(clusters_file, min_cluster_size)?;
    let membership = member_to_cluster(&clusters);

    info!(
        "Calculating ANI per cluster from {} ..",
        similarity_table.display()
    );
    let mut table = SimilarityTable::open(similarity_table)?;
    let summaries = summarize_clusters(table.records(), &membership)?;
    debug!("Found cluster summaries {:?}", summaries);

    write_cluster_summaries(&summaries, output)?;
    info!(
        "Wrote ANI summaries of {} clusters to {}",
        summaries.len(),
        output.display()
    );
    Ok(summaries)
}
