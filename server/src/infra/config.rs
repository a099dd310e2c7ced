//! Loading of the `hibernate-common` configuration structs from the
//! environment, and resolution of secrets that may live in files.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

pub const ENV_PREFIX: &str = "HIBERNATE_";

/// Deserialize `T` from `HIBERNATE_*` environment variables.
///
/// # Errors
///
/// Returns an error naming `what` if a required variable is missing or a
/// value does not parse.
pub fn from_env<T: DeserializeOwned>(what: &str) -> Result<T> {
    from_vars(what, std::env::vars())
}

/// Same as [`from_env`] over an explicit set of variables.
pub(crate) fn from_vars<T, I>(what: &str, vars: I) -> Result<T>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = (String, String)>,
{
    envy::prefixed(ENV_PREFIX)
        .from_iter::<_, T>(vars)
        .with_context(|| format!("failed to load {what} config from {ENV_PREFIX}* env vars"))
}

/// Pick a secret from its inline value or its `_FILE` variant.
///
/// The inline value wins when both are set. File contents are trimmed.
/// An empty result counts as unset.
///
/// # Errors
///
/// Returns an error if the file is named but cannot be read.
pub fn resolve_secret(value: Option<&str>, file: Option<&str>) -> Result<Option<String>> {
    let raw = match (value, file) {
        (Some(v), _) => v.to_string(),
        (None, Some(path)) => read_secret_file(Path::new(path))?,
        (None, None) => return Ok(None),
    };
    let trimmed = raw.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Like [`resolve_secret`] but the secret must be present.
///
/// # Errors
///
/// Returns an error mentioning `key` when neither variant yields a value.
pub fn require_secret(value: Option<&str>, file: Option<&str>, key: &str) -> Result<String> {
    resolve_secret(value, file)?
        .with_context(|| format!("{ENV_PREFIX}{key} or {ENV_PREFIX}{key}_FILE must be set"))
}

fn read_secret_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read secret from {}", path.display()))
}
