//! Small parsing helpers shared by the config loaders.

use std::env;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

/// Read an environment variable, treating empty values as unset.
pub(super) fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Read and parse an environment variable.
pub(super) fn env_parse<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: Display,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name} ({raw:?}): {e}").into()),
        None => Ok(None),
    }
}

/// Load system instructions from a text file.
pub(super) fn read_instructions_file(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read instructions file {}: {e}", path.display()))?;
    if contents.trim().is_empty() {
        return Err(format!("Instructions file {} is empty", path.display()).into());
    }
    Ok(contents)
}
