use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Environment variable through which the thread count reaches external
/// tools' thread pools.
pub const THREADS_ENV_VAR: &str = "RAYON_NUM_THREADS";

/// Where external commands and their output are recorded. Without log
/// files, commands inherit this process's stdout and stderr.
#[derive(Debug, Clone, Default)]
pub struct CommandLogs {
    pub command_log: Option<PathBuf>,
    pub tool_log: Option<PathBuf>,
}

fn open_for_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(Error::io(path))
}

/// Runs external commands to completion, one at a time.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    pub threads: u16,
    pub logs: CommandLogs,
}

impl CommandRunner {
    pub fn new(threads: u16, logs: CommandLogs) -> CommandRunner {
        CommandRunner { threads, logs }
    }

    pub fn run(&self, mut cmd: Command, program: &str) -> Result<()> {
        cmd.env(THREADS_ENV_VAR, format!("{}", self.threads));
        info!("Running {} command: {:?}", program, &cmd);

        if let Some(command_log) = &self.logs.command_log {
            let mut fp = open_for_append(command_log)?;
            writeln!(fp, "COMMAND: {:?}", &cmd).map_err(Error::io(command_log))?;
        }
        if let Some(tool_log) = &self.logs.tool_log {
            let stdout = open_for_append(tool_log)?;
            let stderr = stdout.try_clone().map_err(Error::io(tool_log))?;
            cmd.stdout(Stdio::from(stdout)).stderr(Stdio::from(stderr));
        }

        let mut process = cmd.spawn().map_err(|source| Error::Spawn {
            program: program.to_string(),
            source,
        })?;
        let status = process.wait().map_err(|source| Error::Spawn {
            program: program.to_string(),
            source,
        })?;
        if !status.success() {
            if let Some(tool_log) = &self.logs.tool_log {
                error!("Output of {} is in {}", program, tool_log.display());
            }
            return Err(Error::CommandFailed {
                program: program.to_string(),
                status,
            });
        }
        debug!("Finished running {}", program);
        Ok(())
    }
}
