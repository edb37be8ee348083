use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse tab-separated file {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error("Column '{column}' not found in header of {}", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("Failed to parse {column} value '{value}' on line {line} of {}", .path.display())]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("At least one of --contigs or --vmag-dir needs to be supplied for input genomes to query")]
    MissingGenomeInput,
    #[error("No files ending in '{ext}' found in {}", .dir.display())]
    NoGenomesFound { dir: PathBuf, ext: String },
    #[error("Output file name '{0}' is used for an intermediate file in --outdir, choose another")]
    ReservedOutputName(String),
    #[error("Cannot find path to `{0}`. Make sure `{0}` is installed and in $PATH")]
    MissingExecutable(String),
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} failed with {status}")]
    CommandFailed {
        program: String,
        status: std::process::ExitStatus,
    },
}

impl Error {
    pub(crate) fn io<P: Into<PathBuf>>(path: P) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::Io { path, source }
    }

    pub(crate) fn csv<P: Into<PathBuf>>(path: P) -> impl FnOnce(csv::Error) -> Error {
        let path = path.into();
        move |source| Error::Csv { path, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
