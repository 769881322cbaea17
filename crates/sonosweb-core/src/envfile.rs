use crate::CoreError;
use std::path::Path;

/// Parse dotenv-style `KEY=VALUE` lines.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is accepted,
/// and matching single or double quotes around a value are removed. Unquoted
/// values lose a trailing ` # comment`.
pub fn parse_env(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|raw| {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_owned(), unquote(value.trim())))
        })
        .collect()
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_owned();
        }
    }
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end().to_owned(),
        None => value.to_owned(),
    }
}

/// The `PORT` the application will listen on, as declared in its `.env`.
///
/// A missing file counts as a missing entry. When `PORT` appears more than
/// once the last assignment wins.
pub fn read_port(env_file: &Path) -> Result<u16, CoreError> {
    let content = match std::fs::read_to_string(env_file) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoreError::MissingPort(env_file.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let value = parse_env(&content)
        .into_iter()
        .filter(|(k, _)| k == "PORT")
        .map(|(_, v)| v)
        .last()
        .ok_or_else(|| CoreError::MissingPort(env_file.to_path_buf()))?;
    match value.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(CoreError::InvalidPort {
            path: env_file.to_path_buf(),
            value,
        }),
    }
}
