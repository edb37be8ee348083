use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::command::CommandRunner;
use crate::error::{Error, Result};
use crate::similarity_table::concatenate_tables;

pub const VMAG_LIST_FILE_NAME: &str = "vMAGs_filenames.txt";
pub const SKETCH_DIRECTORY_NAME: &str = "vMAGs_sketches";
pub const SKETCH_LIST_FILE_NAME: &str = "vMAGs_sketches.txt";

/// Parameters passed through to `skani sketch` and `skani dist`.
#[derive(Debug, Clone, PartialEq)]
pub struct SkaniParameters {
    pub compression_factor: u32,
    pub marker: u32,
    /// Percentage
    pub screen: f64,
    /// Percentage
    pub min_af: f64,
    pub threads: u16,
}

/// Genomes to compare: a FASTA file whose records are each a separate
/// genome, a directory of one-genome FASTA files, or both.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeInputs {
    pub contigs: Option<PathBuf>,
    pub vmag_dir: Option<PathBuf>,
    pub extension: String,
}

impl GenomeInputs {
    pub fn new(
        contigs: Option<PathBuf>,
        vmag_dir: Option<PathBuf>,
        extension: String,
    ) -> Result<GenomeInputs> {
        if contigs.is_none() && vmag_dir.is_none() {
            return Err(Error::MissingGenomeInput);
        }
        Ok(GenomeInputs {
            contigs,
            vmag_dir,
            extension,
        })
    }

    pub fn comparison_modes(&self) -> Vec<ComparisonMode> {
        let mut modes = vec![];
        if self.vmag_dir.is_some() {
            modes.push(ComparisonMode::VmagVsVmag);
        }
        if self.contigs.is_some() {
            modes.push(ComparisonMode::UnbinnedVsUnbinned);
        }
        if self.contigs.is_some() && self.vmag_dir.is_some() {
            modes.push(ComparisonMode::UnbinnedVsVmag);
        }
        modes
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComparisonMode {
    VmagVsVmag,
    UnbinnedVsUnbinned,
    UnbinnedVsVmag,
}

impl ComparisonMode {
    pub const ALL: [ComparisonMode; 3] = [
        ComparisonMode::VmagVsVmag,
        ComparisonMode::UnbinnedVsUnbinned,
        ComparisonMode::UnbinnedVsVmag,
    ];

    pub fn output_file_name(&self) -> &'static str {
        match self {
            ComparisonMode::VmagVsVmag => "vMAGs-vMAGs_skani_ANI.tsv",
            ComparisonMode::UnbinnedVsUnbinned => "unbinned-unbinned_skani_ANI.tsv",
            ComparisonMode::UnbinnedVsVmag => "unbinned-vMAGs_skani_ANI.tsv",
        }
    }
}

/// Reject a concatenated table named like one of the files written next to
/// it in the output directory.
pub fn check_output_file_name(output: &Path) -> Result<()> {
    let name = match output.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return Ok(()),
    };
    let clashes = ComparisonMode::ALL
        .iter()
        .map(|mode| mode.output_file_name())
        .chain([VMAG_LIST_FILE_NAME, SKETCH_LIST_FILE_NAME])
        .any(|reserved| reserved == name);
    if clashes {
        return Err(Error::ReservedOutputName(name.to_string()));
    }
    Ok(())
}

/// Paths of genome files in `dir` ending in `extension`, sorted so the
/// sketching order is reproducible.
pub fn find_genome_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut genomes = vec![];
    for entry in std::fs::read_dir(dir).map_err(Error::io(dir))? {
        let path = entry.map_err(Error::io(dir))?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(extension))
            .unwrap_or(false);
        if matches && path.is_file() {
            genomes.push(path);
        }
    }
    if genomes.is_empty() {
        return Err(Error::NoGenomesFound {
            dir: dir.to_path_buf(),
            ext: extension.to_string(),
        });
    }
    genomes.sort();
    Ok(genomes)
}

fn write_path_list(paths: &[PathBuf], list_file: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(list_file).map_err(Error::io(list_file))?);
    for path in paths {
        writeln!(writer, "{}", path.display()).map_err(Error::io(list_file))?;
    }
    writer.flush().map_err(Error::io(list_file))
}

fn sketch_command(params: &SkaniParameters, sketch_dir: &Path, genome_list: &Path) -> Command {
    let mut cmd = Command::new("skani");
    cmd.arg("sketch")
        .arg("-c")
        .arg(params.compression_factor.to_string())
        .arg("-m")
        .arg(params.marker.to_string())
        .arg("-t")
        .arg(params.threads.to_string())
        .arg("-o")
        .arg(sketch_dir)
        .arg("-l")
        .arg(genome_list);
    cmd
}

/// Sketch every genome in the vMAG directory once, returning the path of
/// a file listing the sketches, for reuse across comparisons.
pub fn sketch_vmags(
    vmag_dir: &Path,
    extension: &str,
    outdir: &Path,
    params: &SkaniParameters,
    runner: &CommandRunner,
) -> Result<PathBuf> {
    let genomes = find_genome_files(vmag_dir, extension)?;
    info!(
        "Sketching {} vMAGs found in {} ..",
        genomes.len(),
        vmag_dir.display()
    );
    let genome_list = outdir.join(VMAG_LIST_FILE_NAME);
    write_path_list(&genomes, &genome_list)?;

    let sketch_dir = outdir.join(SKETCH_DIRECTORY_NAME);
    runner.run(sketch_command(params, &sketch_dir, &genome_list), "skani")?;

    let mut sketches = vec![];
    for entry in std::fs::read_dir(&sketch_dir).map_err(Error::io(&sketch_dir))? {
        let path = entry.map_err(Error::io(&sketch_dir))?.path();
        if path.extension().map(|e| e == "sketch").unwrap_or(false) {
            sketches.push(path);
        }
    }
    sketches.sort();
    debug!("Found {} sketches", sketches.len());

    let sketch_list = outdir.join(SKETCH_LIST_FILE_NAME);
    write_path_list(&sketches, &sketch_list)?;
    Ok(sketch_list)
}

fn dist_command(
    mode: ComparisonMode,
    inputs: &GenomeInputs,
    sketch_list: Option<&Path>,
    params: &SkaniParameters,
    output: &Path,
) -> Command {
    let mut cmd = Command::new("skani");
    cmd.arg("dist");
    match (mode, inputs.contigs.as_deref(), sketch_list) {
        (ComparisonMode::VmagVsVmag, _, Some(sketches)) => {
            cmd.arg("--rl").arg(sketches).arg("--ql").arg(sketches);
        }
        (ComparisonMode::UnbinnedVsUnbinned, Some(contigs), _) => {
            cmd.arg("--ri").arg(contigs).arg("--qi").arg(contigs);
        }
        (ComparisonMode::UnbinnedVsVmag, Some(contigs), Some(sketches)) => {
            cmd.arg("--rl").arg(sketches).arg("--qi").arg(contigs);
        }
        _ => panic!(
            "Programming error: no genome input for {:?} comparisons",
            mode
        ),
    }
    cmd.arg("-o")
        .arg(output)
        .arg("-c")
        .arg(params.compression_factor.to_string())
        .arg("-m")
        .arg(params.marker.to_string())
        .arg("-s")
        .arg(params.screen.to_string())
        .arg("--min-af")
        .arg(params.min_af.to_string())
        .arg("-t")
        .arg(params.threads.to_string());
    cmd
}

/// Run every comparison the inputs call for and concatenate the results
/// into `output`, which keeps a single header line. Per-comparison tables
/// are removed afterwards.
pub fn run_skani(
    inputs: &GenomeInputs,
    outdir: &Path,
    output: &Path,
    params: &SkaniParameters,
    runner: &CommandRunner,
) -> Result<usize> {
    check_output_file_name(output)?;
    std::fs::create_dir_all(outdir).map_err(Error::io(outdir))?;

    let sketch_list = match &inputs.vmag_dir {
        Some(vmag_dir) => Some(sketch_vmags(
            vmag_dir,
            &inputs.extension,
            outdir,
            params,
            runner,
        )?),
        None => None,
    };

    let mut results = vec![];
    for mode in inputs.comparison_modes() {
        info!("Running skani for {:?} comparisons ..", mode);
        let result = outdir.join(mode.output_file_name());
        let cmd = dist_command(mode, inputs, sketch_list.as_deref(), params, &result);
        runner.run(cmd, "skani")?;
        results.push(result);
    }

    let num_rows = concatenate_tables(&results, output)?;
    for result in &results {
        std::fs::remove_file(result).map_err(Error::io(result))?;
    }
    info!(
        "Wrote {} pairwise ANI values to {}",
        num_rows,
        output.display()
    );
    Ok(num_rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn params() -> SkaniParameters {
        SkaniParameters {
            compression_factor: 125,
            marker: 1000,
            screen: 80.0,
            min_af: 15.0,
            threads: 4,
        }
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_missing_inputs() {
        assert!(matches!(
            GenomeInputs::new(None, None, ".fna".to_string()),
            Err(Error::MissingGenomeInput)
        ));
    }

    #[test]
    fn test_comparison_modes() {
        let contigs_only =
            GenomeInputs::new(Some("c.fna".into()), None, ".fna".to_string()).unwrap();
        assert_eq!(
            vec![ComparisonMode::UnbinnedVsUnbinned],
            contigs_only.comparison_modes()
        );
        let vmags_only = GenomeInputs::new(None, Some("d".into()), ".fna".to_string()).unwrap();
        assert_eq!(vec![ComparisonMode::VmagVsVmag], vmags_only.comparison_modes());
        let both =
            GenomeInputs::new(Some("c.fna".into()), Some("d".into()), ".fna".to_string())
                .unwrap();
        assert_eq!(
            vec![
                ComparisonMode::VmagVsVmag,
                ComparisonMode::UnbinnedVsUnbinned,
                ComparisonMode::UnbinnedVsVmag
            ],
            both.comparison_modes()
        );
    }

    #[test]
    fn test_find_genome_files_by_extension() {
        init();
        let genomes = find_genome_files(Path::new("tests/data/vmags"), ".fna").unwrap();
        assert_eq!(
            vec![
                PathBuf::from("tests/data/vmags/vX.fna"),
                PathBuf::from("tests/data/vmags/vY.fna")
            ],
            genomes
        );
        assert!(matches!(
            find_genome_files(Path::new("tests/data/vmags"), ".fasta"),
            Err(Error::NoGenomesFound { .. })
        ));
    }

    #[test]
    fn test_dist_commands() {
        let inputs =
            GenomeInputs::new(Some("c.fna".into()), Some("d".into()), ".fna".to_string())
                .unwrap();
        let sketches = Path::new("out/vMAGs_sketches.txt");
        let out = Path::new("out/x.tsv");

        let cmd = dist_command(
            ComparisonMode::UnbinnedVsVmag,
            &inputs,
            Some(sketches),
            &params(),
            out,
        );
        assert_eq!("skani", cmd.get_program());
        assert_eq!(
            vec![
                "dist",
                "--rl",
                "out/vMAGs_sketches.txt",
                "--qi",
                "c.fna",
                "-o",
                "out/x.tsv",
                "-c",
                "125",
                "-m",
                "1000",
                "-s",
                "80",
                "--min-af",
                "15",
                "-t",
                "4"
            ],
            args(&cmd)
        );

        let cmd = dist_command(
            ComparisonMode::UnbinnedVsUnbinned,
            &inputs,
            None,
            &params(),
            out,
        );
        assert_eq!(&["dist", "--ri", "c.fna", "--qi", "c.fna"], &args(&cmd)[..5]);

        let cmd = dist_command(
            ComparisonMode::VmagVsVmag,
            &inputs,
            Some(sketches),
            &params(),
            out,
        );
        assert_eq!(
            &[
                "dist",
                "--rl",
                "out/vMAGs_sketches.txt",
                "--ql",
                "out/vMAGs_sketches.txt"
            ],
            &args(&cmd)[..5]
        );
    }

    #[test]
    #[should_panic(expected = "Programming error")]
    fn test_dist_command_without_sketches() {
        let inputs =
            GenomeInputs::new(Some("c.fna".into()), None, ".fna".to_string()).unwrap();
        dist_command(
            ComparisonMode::VmagVsVmag,
            &inputs,
            None,
            &params(),
            Path::new("out/x.tsv"),
        );
    }

    #[test]
    fn test_output_name_clashing_with_intermediates() {
        for name in &[
            "vMAGs-vMAGs_skani_ANI.tsv",
            "unbinned-unbinned_skani_ANI.tsv",
            "unbinned-vMAGs_skani_ANI.tsv",
            "vMAGs_filenames.txt",
            "vMAGs_sketches.txt",
        ] {
            assert!(matches!(
                check_output_file_name(&Path::new("out").join(name)),
                Err(Error::ReservedOutputName(n)) if n == *name
            ));
        }
        check_output_file_name(Path::new("out/skani_ANI.tsv")).unwrap();
        check_output_file_name(Path::new("out/unbinned_skani_ANI.tsv")).unwrap();
    }

    #[test]
    fn test_run_skani_rejects_clashing_output() {
        init();
        let td = tempfile::TempDir::new().unwrap();
        let outdir = td.path().join("out");
        let inputs =
            GenomeInputs::new(Some("c.fna".into()), None, ".fna".to_string()).unwrap();
        let runner = CommandRunner::new(1, crate::command::CommandLogs::default());
        let res = run_skani(
            &inputs,
            &outdir,
            &outdir.join("unbinned-unbinned_skani_ANI.tsv"),
            &params(),
            &runner,
        );
        assert!(matches!(res, Err(Error::ReservedOutputName(_))));
        assert!(!outdir.exists());
    }

    #[test]
    fn test_sketch_command() {
        let cmd = sketch_command(&params(), Path::new("o/s"), Path::new("o/l.txt"));
        assert_eq!(
            vec!["sketch", "-c", "125", "-m", "1000", "-t", "4", "-o", "o/s", "-l", "o/l.txt"],
            args(&cmd)
        );
    }
}
