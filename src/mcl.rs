use std::path::{Path, PathBuf};
use std::process::Command;

use crate::command::CommandRunner;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct MclConfig {
    /// Headerless `source<TAB>target<TAB>weight` edge list
    pub input: PathBuf,
    /// One cluster per line, members tab-separated
    pub output: PathBuf,
    pub inflation: f64,
}

impl MclConfig {
    /// Label table written by mcxload, next to the edge list.
    pub fn tab_file(&self) -> PathBuf {
        self.input.with_extension("mcxload")
    }

    /// Matrix written by mcxload, next to the edge list.
    pub fn matrix_file(&self) -> PathBuf {
        self.input.with_extension("mci")
    }
}

fn mcxload_command(edges: &Path, tab_file: &Path, matrix_file: &Path) -> Command {
    let mut cmd = Command::new("mcxload");
    cmd.arg("-abc")
        .arg(edges)
        .arg("-write-tab")
        .arg(tab_file)
        .arg("-o")
        .arg(matrix_file);
    cmd
}

fn mcl_command(config: &MclConfig, threads: u16) -> Command {
    let mut cmd = Command::new("mcl");
    cmd.arg(config.matrix_file())
        .arg("-use-tab")
        .arg(config.tab_file())
        .arg("-I")
        .arg(config.inflation.to_string())
        .arg("-te")
        .arg(threads.to_string())
        .arg("-o")
        .arg(&config.output);
    cmd
}

/// Load the edge list into MCL's native matrix format, then cluster it.
pub fn run_mcl(config: &MclConfig, runner: &CommandRunner) -> Result<()> {
    info!(
        "Clustering {} with MCL, inflation {} ..",
        config.input.display(),
        config.inflation
    );
    runner.run(
        mcxload_command(&config.input, &config.tab_file(), &config.matrix_file()),
        "mcxload",
    )?;
    runner.run(mcl_command(config, runner.threads), "mcl")?;
    info!("Wrote MCL clusters to {}", config.output.display());
    Ok(())
}
