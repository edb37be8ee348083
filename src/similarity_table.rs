use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const ANI_COLUMN: &str = "ANI";
pub const ALIGN_FRACTION_REF_COLUMN: &str = "Align_fraction_ref";
pub const ALIGN_FRACTION_QUERY_COLUMN: &str = "Align_fraction_query";
pub const REF_NAME_COLUMN: &str = "Ref_name";
pub const QUERY_NAME_COLUMN: &str = "Query_name";

/// One directional row of a `skani dist` table. All values are percentages
/// in [0, 100].
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityRecord {
    pub ref_name: String,
    pub query_name: String,
    pub ani: f64,
    pub align_fraction_ref: f64,
    pub align_fraction_query: f64,
}

impl SimilarityRecord {
    pub fn is_self_comparison(&self) -> bool {
        self.ref_name == self.query_name
    }
}

#[derive(Debug)]
struct ColumnIndices {
    ani: usize,
    align_fraction_ref: usize,
    align_fraction_query: usize,
    ref_name: usize,
    query_name: usize,
}

impl ColumnIndices {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<ColumnIndices> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| Error::MissingColumn {
                    path: path.to_path_buf(),
                    column,
                })
        };
        Ok(ColumnIndices {
            ani: find(ANI_COLUMN)?,
            align_fraction_ref: find(ALIGN_FRACTION_REF_COLUMN)?,
            align_fraction_query: find(ALIGN_FRACTION_QUERY_COLUMN)?,
            ref_name: find(REF_NAME_COLUMN)?,
            query_name: find(QUERY_NAME_COLUMN)?,
        })
    }

    fn parse(&self, record: &csv::StringRecord, path: &Path) -> Result<SimilarityRecord> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let percentage = |index: usize, column: &'static str| -> Result<f64> {
            record[index]
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::InvalidValue {
                    path: path.to_path_buf(),
                    line,
                    column,
                    value: record[index].to_string(),
                })
        };
        Ok(SimilarityRecord {
            ref_name: record[self.ref_name].to_string(),
            query_name: record[self.query_name].to_string(),
            ani: percentage(self.ani, ANI_COLUMN)?,
            align_fraction_ref: percentage(self.align_fraction_ref, ALIGN_FRACTION_REF_COLUMN)?,
            align_fraction_query: percentage(
                self.align_fraction_query,
                ALIGN_FRACTION_QUERY_COLUMN,
            )?,
        })
    }
}

/// Streaming reader over a tab-separated `skani dist` table. Columns are
/// located by header name, so extra columns and column order do not matter.
pub struct SimilarityTable {
    path: PathBuf,
    reader: csv::Reader<File>,
    columns: ColumnIndices,
}

impl SimilarityTable {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SimilarityTable> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(path)
            .map_err(Error::csv(path))?;
        let headers = reader.headers().map_err(Error::csv(path))?.clone();
        let columns = ColumnIndices::from_headers(&headers, path)?;
        debug!("Found similarity table columns {:?} in {}", columns, path.display());

        Ok(SimilarityTable {
            path: path.to_path_buf(),
            reader,
            columns,
        })
    }

    pub fn records(&mut self) -> impl Iterator<Item = Result<SimilarityRecord>> + '_ {
        let path = &self.path;
        let columns = &self.columns;
        self.reader.records().map(move |record_res| {
            let record = record_res.map_err(Error::csv(path.as_path()))?;
            columns.parse(&record, path)
        })
    }
}

pub fn read_similarity_table<P: AsRef<Path>>(path: P) -> Result<Vec<SimilarityRecord>> {
    let mut table = SimilarityTable::open(path)?;
    let records = table.records().collect::<Result<Vec<_>>>();
    records
}

/// Concatenate tables that share a header into `output`, keeping only the
/// first table's header line. Returns the number of data rows written.
pub fn concatenate_tables<P: AsRef<Path>>(tables: &[P], output: &Path) -> Result<usize> {
    let out_file = File::create(output).map_err(Error::io(output))?;
    let mut writer = BufWriter::new(out_file);
    let mut rows = 0;

    for (i, table) in tables.iter().enumerate() {
        let table = table.as_ref();
        let reader = BufReader::new(File::open(table).map_err(Error::io(table))?);
        for (j, line) in reader.lines().enumerate() {
            let line = line.map_err(Error::io(table))?;
            if j == 0 {
                if i != 0 {
                    trace!("Skipping header of {}", table.display());
                    continue;
                }
            } else {
                rows += 1;
            }
            writeln!(writer, "{}", line).map_err(Error::io(output))?;
        }
        debug!("Appended {} to {}", table.display(), output.display());
    }
    writer.flush().map_err(Error::io(output))?;

    Ok(rows)
}
