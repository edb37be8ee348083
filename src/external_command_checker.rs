use bird_tool_utils::external_command_checker::*;

use crate::error::{Error, Result};

fn check_for_executable(executable_name: &str) -> Result<()> {
    self::check_for_external_command_presence(
        executable_name,
        &format!("which {}", executable_name),
    )
    .map_err(|e| {
        debug!("Presence check for {} failed: {:?}", executable_name, e);
        Error::MissingExecutable(executable_name.to_string())
    })
}

pub fn check_for_skani() -> Result<()> {
    check_for_executable("skani")
}

pub fn check_for_mcl() -> Result<()> {
    check_for_executable("mcxload")?;
    check_for_executable("mcl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable() {
        assert!(matches!(
            check_for_executable("vskani-test-no-such-tool"),
            Err(Error::MissingExecutable(name)) if name == "vskani-test-no-such-tool"
        ));
    }
}
