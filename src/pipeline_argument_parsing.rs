use std::path::{Path, PathBuf};

use bird_tool_utils::clap_utils::*;
use clap::*;

use crate::cluster_summary::{summarize_and_save, DEFAULT_MIN_CLUSTER_SIZE};
use crate::command::{CommandLogs, CommandRunner};
use crate::error::Result;
use crate::external_command_checker;
use crate::mcl::{run_mcl, MclConfig};
use crate::preprocess::{preprocess_similarity_table, PreprocessThresholds};
use crate::skani::{check_output_file_name, run_skani, GenomeInputs, SkaniParameters};
use crate::{
    DEFAULT_COMMAND_LOG, DEFAULT_COMPRESSION_FACTOR, DEFAULT_INFLATION, DEFAULT_MARKER,
    DEFAULT_MCL_OUTPUT, DEFAULT_MIN_ANI, DEFAULT_MIN_COVERAGE, DEFAULT_PROCESSED_OUTPUT,
    DEFAULT_SCREEN, DEFAULT_SKANI_MIN_AF, DEFAULT_SKANI_OUTPUT, DEFAULT_SUMMARY_OUTPUT,
    DEFAULT_THREADS, DEFAULT_TOOL_LOG, DEFAULT_VMAG_EXTENSION,
};

/// Accept a fraction in the inclusive range [0, 1].
pub fn parse_fraction(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{} not in inclusive range [0.0, 1.0]", value))
    }
}

/// Accept a percentage in the inclusive range [0, 100].
pub fn parse_percentage(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{} not in inclusive range [0, 100]", value))
    }
}

fn value<T: Clone + Send + Sync + 'static>(m: &ArgMatches, id: &str) -> T {
    m.get_one::<T>(id)
        .cloned()
        .unwrap_or_else(|| panic!("Programming error: no value for argument {}", id))
}

fn add_io_arguments(cmd: Command) -> Command {
    cmd.next_help_heading("I/O (at least one of --contigs or --vmag-dir required)")
        .arg(
            Arg::new("contigs")
                .short('c')
                .long("contigs")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("FASTA file of unbinned viral scaffolds/contigs, each a separate genome"),
        )
        .arg(
            Arg::new("vmag-dir")
                .short('d')
                .long("vmag-dir")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory of vMAG FASTA files, where each file is a separate vMAG"),
        )
        .arg(
            Arg::new("ext")
                .short('x')
                .long("ext")
                .default_value(DEFAULT_VMAG_EXTENSION)
                .help("File extension of vMAG FASTA files"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .default_value(".")
                .help("Output directory"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_SKANI_OUTPUT)
                .help("Output skani ANI table of all comparisons, within --outdir"),
        )
}

fn add_threads_argument(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("threads")
            .short('t')
            .long("threads")
            .value_parser(value_parser!(u16).range(1..))
            .default_value(DEFAULT_THREADS)
            .help("Number of CPU threads for external tools to use"),
    )
}

/// `-t` for standalone steps that do no parallel work. The value is only
/// logged.
fn add_unused_threads_argument(cmd: Command) -> Command {
    add_threads_argument(cmd).mut_arg("threads", |arg| {
        arg.help("Accepted for consistency with the other subcommands, has no effect")
    })
}

fn add_skani_arguments(cmd: Command) -> Command {
    add_threads_argument(
        cmd.next_help_heading("skani")
            .arg(
                Arg::new("compression-factor")
                    .long("compression-factor")
                    .value_parser(value_parser!(u32).range(1..))
                    .default_value(DEFAULT_COMPRESSION_FACTOR)
                    .help("Memory usage and runtime are inversely proportional to this. Lower values allow ANI comparison of more distant genomes"),
            )
            .arg(
                Arg::new("marker")
                    .short('m')
                    .long("marker")
                    .value_parser(value_parser!(u32).range(1..))
                    .default_value(DEFAULT_MARKER)
                    .help("Marker k-mer compression factor. You want at least ~100 markers, so genome_size/marker > 100 is highly recommended"),
            )
            .arg(
                Arg::new("screen")
                    .short('s')
                    .long("screen")
                    .value_parser(parse_percentage)
                    .default_value(DEFAULT_SCREEN)
                    .help("Screen out pairs with less than this percent identity"),
            )
            .arg(
                Arg::new("min-af")
                    .short('f')
                    .long("min-af")
                    .value_parser(parse_percentage)
                    .default_value(DEFAULT_SKANI_MIN_AF)
                    .help("Only output ANI values where one genome has aligned fraction (percent) >= this value"),
            ),
    )
}

fn add_logging_arguments(cmd: Command) -> Command {
    cmd.next_help_heading("Logging")
        .arg(
            Arg::new("command-log")
                .long("command-log")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_COMMAND_LOG)
                .help("File within --outdir to log external commands to"),
        )
        .arg(
            Arg::new("log")
                .short('l')
                .long("log")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_TOOL_LOG)
                .help("File within --outdir to log external command output to"),
        )
}

fn add_threshold_arguments(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("min-ani")
            .long("min-ani")
            .value_name("FRACTION")
            .value_parser(parse_fraction)
            .default_value(DEFAULT_MIN_ANI)
            .help("Minimum ANI to consider for clustering, in [0.0, 1.0]"),
    )
    .arg(
        Arg::new("min-cov")
            .long("min-cov")
            .value_name("FRACTION")
            .value_parser(parse_fraction)
            .default_value(DEFAULT_MIN_COVERAGE)
            .help("Minimum aligned fraction of either genome to consider for clustering, in [0.0, 1.0]"),
    )
}

fn add_preprocessing_arguments(cmd: Command, standalone: bool) -> Command {
    let cmd = cmd.next_help_heading("Preprocessing after skani before MCL");
    let cmd = if standalone {
        cmd.arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("Tab-separated skani ANI table"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_PROCESSED_OUTPUT)
                .help("Output edge list for MCL clustering"),
        )
    } else {
        cmd.arg(
            Arg::new("output-processed")
                .long("output-processed")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_PROCESSED_OUTPUT)
                .help("Output edge list for MCL clustering"),
        )
    };
    add_threshold_arguments(cmd)
}

fn add_mcl_arguments(cmd: Command, standalone: bool) -> Command {
    let mut cmd = cmd.next_help_heading("MCL");
    if standalone {
        cmd = cmd.arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("Processed tab-separated edge list"),
        );
    }
    cmd = cmd
        .arg(
            Arg::new("mcl-output")
                .long("mcl-output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_MCL_OUTPUT)
                .help("Output clusters file, where each tab-separated row is all the members of one cluster"),
        )
        .arg(
            Arg::new("inflation")
                .short('I')
                .long("inflation")
                .value_parser(value_parser!(f64))
                .default_value(DEFAULT_INFLATION)
                .help("MCL inflation value. Higher is more strict clustering, so clustered genomes have higher ANI"),
        );
    if standalone {
        cmd = add_threads_argument(cmd);
    }
    cmd
}

fn add_summary_arguments(cmd: Command, standalone: bool) -> Command {
    let cmd = cmd.next_help_heading("Summary");
    if standalone {
        cmd.arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("Original skani ANI table (before preprocessing for MCL)"),
        )
        .arg(
            Arg::new("mcl-output")
                .long("mcl-output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("Clusters file, where each tab-separated row is all the members of one cluster"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_SUMMARY_OUTPUT)
                .help("Output ANI per cluster summary file"),
        )
    } else {
        cmd.arg(
            Arg::new("summary-output")
                .long("summary-output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_SUMMARY_OUTPUT)
                .help("Output ANI per cluster summary file"),
        )
    }
}

pub fn add_skani_subcommand(app: Command) -> Command {
    let mut subcommand = add_clap_verbosity_flags(
        Command::new("skani")
            .about("Pairwise ANI calculations using skani, preprocessed for clustering"),
    );
    subcommand = add_io_arguments(subcommand);
    subcommand = add_skani_arguments(subcommand);
    subcommand = add_logging_arguments(subcommand);
    subcommand = add_preprocessing_arguments(subcommand, false);
    app.subcommand(subcommand)
}

pub fn add_preprocess_subcommand(app: Command) -> Command {
    let subcommand = add_clap_verbosity_flags(
        Command::new("preprocess")
            .about("Convert an existing skani ANI table into an edge list for MCL"),
    );
    app.subcommand(add_unused_threads_argument(add_preprocessing_arguments(
        subcommand, true,
    )))
}

pub fn add_mcl_subcommand(app: Command) -> Command {
    let subcommand = add_clap_verbosity_flags(
        Command::new("mcl").about("Graph clustering of pairwise ANI values using MCL"),
    );
    app.subcommand(add_mcl_arguments(subcommand, true))
}

pub fn add_summarize_subcommand(app: Command) -> Command {
    let subcommand = add_clap_verbosity_flags(
        Command::new("summarize").about("Summarize ANI per cluster"),
    );
    app.subcommand(add_unused_threads_argument(add_summary_arguments(
        subcommand, true,
    )))
}

pub fn add_pipeline_subcommand(app: Command) -> Command {
    let mut subcommand = add_clap_verbosity_flags(
        Command::new("all")
            .about("Perform ANI calculations, then cluster and summarize immediately"),
    );
    subcommand = add_io_arguments(subcommand);
    subcommand = add_skani_arguments(subcommand);
    subcommand = add_logging_arguments(subcommand);
    subcommand = add_preprocessing_arguments(subcommand, false);
    subcommand = add_mcl_arguments(subcommand, false);
    subcommand = add_summary_arguments(subcommand, false);
    app.subcommand(subcommand)
}

/// Everything needed to produce the skani table and its edge list.
#[derive(Debug, Clone)]
pub struct SimilarityConfig {
    pub inputs: GenomeInputs,
    pub outdir: PathBuf,
    /// Concatenated skani table, within `outdir`
    pub skani_output: PathBuf,
    pub processed_output: PathBuf,
    pub params: SkaniParameters,
    pub thresholds: PreprocessThresholds,
    pub logs: CommandLogs,
}

impl SimilarityConfig {
    pub fn runner(&self) -> CommandRunner {
        CommandRunner::new(self.params.threads, self.logs.clone())
    }
}

fn parse_thresholds(m: &ArgMatches) -> PreprocessThresholds {
    let thresholds =
        PreprocessThresholds::from_fractions(value(m, "min-ani"), value(m, "min-cov"));
    debug!("Using preprocessing thresholds {:?}", thresholds);
    thresholds
}

pub fn parse_similarity_config(m: &ArgMatches) -> Result<SimilarityConfig> {
    let inputs = GenomeInputs::new(
        m.get_one::<PathBuf>("contigs").cloned(),
        m.get_one::<PathBuf>("vmag-dir").cloned(),
        value(m, "ext"),
    )?;
    let outdir: PathBuf = value(m, "outdir");
    let output: PathBuf = value(m, "output");
    check_output_file_name(&output)?;
    let skani_output = outdir.join(output);
    let logs = CommandLogs {
        command_log: Some(outdir.join(value::<PathBuf>(m, "command-log"))),
        tool_log: Some(outdir.join(value::<PathBuf>(m, "log"))),
    };

    Ok(SimilarityConfig {
        inputs,
        skani_output,
        processed_output: value(m, "output-processed"),
        params: SkaniParameters {
            compression_factor: value(m, "compression-factor"),
            marker: value(m, "marker"),
            screen: value(m, "screen"),
            min_af: value(m, "min-af"),
            threads: value(m, "threads"),
        },
        thresholds: parse_thresholds(m),
        logs,
        outdir,
    })
}

fn run_similarity(config: &SimilarityConfig, runner: &CommandRunner) -> Result<()> {
    run_skani(
        &config.inputs,
        &config.outdir,
        &config.skani_output,
        &config.params,
        runner,
    )?;
    preprocess_similarity_table(
        &config.skani_output,
        &config.processed_output,
        &config.thresholds,
    )?;
    Ok(())
}

pub fn run_skani_subcommand(m: &ArgMatches) -> Result<()> {
    let config = parse_similarity_config(m)?;
    external_command_checker::check_for_skani()?;
    run_similarity(&config, &config.runner())
}

fn log_unused_threads(m: &ArgMatches) {
    debug!(
        "Ignoring --threads {}, this step runs on a single thread",
        value::<u16>(m, "threads")
    );
}

pub fn run_preprocess_subcommand(m: &ArgMatches) -> Result<()> {
    log_unused_threads(m);
    let input: PathBuf = value(m, "input");
    let output: PathBuf = value(m, "output");
    preprocess_similarity_table(&input, &output, &parse_thresholds(m))?;
    Ok(())
}

pub fn run_mcl_subcommand(m: &ArgMatches) -> Result<()> {
    let config = MclConfig {
        input: value(m, "input"),
        output: value(m, "mcl-output"),
        inflation: value(m, "inflation"),
    };
    external_command_checker::check_for_mcl()?;
    run_mcl(
        &config,
        &CommandRunner::new(value(m, "threads"), CommandLogs::default()),
    )
}

pub fn run_summarize_subcommand(m: &ArgMatches) -> Result<()> {
    log_unused_threads(m);
    let input: PathBuf = value(m, "input");
    let clusters: PathBuf = value(m, "mcl-output");
    let output: PathBuf = value(m, "output");
    summarize(&input, &clusters, &output)
}

fn summarize(similarity_table: &Path, clusters: &Path, output: &Path) -> Result<()> {
    summarize_and_save(
        similarity_table,
        clusters,
        output,
        DEFAULT_MIN_CLUSTER_SIZE,
    )?;
    Ok(())
}

pub fn run_pipeline_subcommand(m: &ArgMatches) -> Result<()> {
    let config = parse_similarity_config(m)?;
    let mcl_config = MclConfig {
        input: config.processed_output.clone(),
        output: value(m, "mcl-output"),
        inflation: value(m, "inflation"),
    };
    let summary_output: PathBuf = value(m, "summary-output");

    external_command_checker::check_for_skani()?;
    external_command_checker::check_for_mcl()?;

    let runner = config.runner();
    run_similarity(&config, &runner)?;
    run_mcl(&mcl_config, &runner)?;
    // Summaries use every skani comparison, not only those kept as edges
    summarize(&config.skani_output, &mcl_config.output, &summary_output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> Command {
        let mut app = Command::new("vskani");
        app = add_skani_subcommand(app);
        app = add_preprocess_subcommand(app);
        app = add_mcl_subcommand(app);
        app = add_summarize_subcommand(app);
        add_pipeline_subcommand(app)
    }

    #[test]
    fn test_parse_fraction() {
        assert_eq!(Ok(0.0), parse_fraction("0"));
        assert_eq!(Ok(0.95), parse_fraction("0.95"));
        assert_eq!(Ok(1.0), parse_fraction("1"));
        assert!(parse_fraction("1.01").is_err());
        assert!(parse_fraction("-0.1").is_err());
        assert!(parse_fraction("95").is_err());
        assert!(parse_fraction("x").is_err());
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(Ok(80.0), parse_percentage("80"));
        assert!(parse_percentage("100.5").is_err());
    }

    #[test]
    fn test_cli_is_consistent() {
        app().debug_assert();
    }

    #[test]
    fn test_similarity_defaults() {
        let matches = app()
            .try_get_matches_from(vec!["vskani", "skani", "--contigs", "c.fna", "--outdir", "out"])
            .unwrap();
        let m = matches.subcommand_matches("skani").unwrap();
        let config = parse_similarity_config(m).unwrap();
        assert_eq!(Some(PathBuf::from("c.fna")), config.inputs.contigs);
        assert_eq!(None, config.inputs.vmag_dir);
        assert_eq!(".fna", config.inputs.extension);
        assert_eq!(PathBuf::from("out/skani_ANI.tsv"), config.skani_output);
        assert_eq!(PathBuf::from("skani_processed.tsv"), config.processed_output);
        assert_eq!(
            SkaniParameters {
                compression_factor: 125,
                marker: 1000,
                screen: 80.0,
                min_af: 15.0,
                threads: 15,
            },
            config.params
        );
        assert_eq!(PreprocessThresholds::from_fractions(0.95, 0.5), config.thresholds);
        assert_eq!(
            Some(PathBuf::from("out/commands.log")),
            config.logs.command_log
        );
        assert_eq!(Some(PathBuf::from("out/skani.log")), config.logs.tool_log);
    }

    #[test]
    fn test_missing_genome_input() {
        let matches = app()
            .try_get_matches_from(vec!["vskani", "all"])
            .unwrap();
        let m = matches.subcommand_matches("all").unwrap();
        assert!(matches!(
            parse_similarity_config(m),
            Err(crate::error::Error::MissingGenomeInput)
        ));
    }

    #[test]
    fn test_output_clashing_with_intermediate_rejected() {
        let matches = app()
            .try_get_matches_from(vec![
                "vskani",
                "skani",
                "-c",
                "c.fna",
                "-o",
                "unbinned-unbinned_skani_ANI.tsv",
            ])
            .unwrap();
        let m = matches.subcommand_matches("skani").unwrap();
        assert!(matches!(
            parse_similarity_config(m),
            Err(crate::error::Error::ReservedOutputName(_))
        ));
    }

    #[test]
    fn test_single_threaded_steps_accept_threads() {
        let matches = app()
            .try_get_matches_from(vec![
                "vskani",
                "summarize",
                "-i",
                "in.tsv",
                "--mcl-output",
                "c.clusters",
                "-t",
                "8",
            ])
            .unwrap();
        let m = matches.subcommand_matches("summarize").unwrap();
        assert_eq!(8, value::<u16>(m, "threads"));

        let matches = app()
            .try_get_matches_from(vec!["vskani", "preprocess", "-i", "in.tsv", "--threads", "8"])
            .unwrap();
        let m = matches.subcommand_matches("preprocess").unwrap();
        assert_eq!(8, value::<u16>(m, "threads"));

        assert!(app()
            .try_get_matches_from(vec!["vskani", "preprocess", "-i", "in.tsv", "-t", "0"])
            .is_err());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let res = app().try_get_matches_from(vec![
            "vskani",
            "preprocess",
            "-i",
            "in.tsv",
            "--min-ani",
            "95",
        ]);
        assert!(res.is_err());
        let res = app().try_get_matches_from(vec![
            "vskani",
            "all",
            "-c",
            "c.fna",
            "--min-cov",
            "1.5",
        ]);
        assert!(res.is_err());
    }
}
