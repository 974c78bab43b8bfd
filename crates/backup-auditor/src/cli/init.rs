use std::{fs, io::Write, path::Path};

use tracing::info;

use super::{CommandError, ExitCode};
use crate::config::Config;

/// The `init` command. Writes the default config to `path`, refusing to
/// overwrite an existing file.
pub fn init(path: &Path, out: &mut dyn Write) -> Result<ExitCode, CommandError> {
    if path.exists() {
        return Err(CommandError::ConfigExists(path.to_path_buf()));
    }

    let contents = Config::default_toml()?;
    fs::write(path, contents).map_err(|error| CommandError::WriteConfig(path.to_path_buf(), error))?;

    info!("Wrote default config to {path:?}");
    writeln!(out, "Wrote default config to {}", path.display())?;
    Ok(ExitCode::Success)
}
