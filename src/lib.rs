pub mod cluster_summary;
pub mod command;
pub mod error;
pub mod external_command_checker;
pub mod mcl;
pub mod pipeline_argument_parsing;
pub mod preprocess;
pub mod similarity_table;
pub mod skani;

#[macro_use]
extern crate log;
extern crate clap;

pub const DEFAULT_VMAG_EXTENSION: &str = ".fna";
pub const DEFAULT_SKANI_OUTPUT: &str = "skani_ANI.tsv";
pub const DEFAULT_THREADS: &str = "15";
pub const DEFAULT_COMPRESSION_FACTOR: &str = "125";
pub const DEFAULT_MARKER: &str = "1000";
pub const DEFAULT_SCREEN: &str = "80.0";
pub const DEFAULT_SKANI_MIN_AF: &str = "15.0";
pub const DEFAULT_COMMAND_LOG: &str = "commands.log";
pub const DEFAULT_TOOL_LOG: &str = "skani.log";
pub const DEFAULT_PROCESSED_OUTPUT: &str = "skani_processed.tsv";
pub const DEFAULT_MIN_ANI: &str = "0.95";
pub const DEFAULT_MIN_COVERAGE: &str = "0.5";
pub const DEFAULT_MCL_OUTPUT: &str = "dereplicated_virus.clusters";
pub const DEFAULT_INFLATION: &str = "2.0";
pub const DEFAULT_SUMMARY_OUTPUT: &str = "ani_per_cluster.tsv";
