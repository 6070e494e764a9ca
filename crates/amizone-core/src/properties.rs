//! Java-style `.properties` files as a figment provider.
//!
//! The Android build keeps the Supabase credentials in `local.properties`
//! (`supabase_url=...`, one pair per line). Reading the same file lets the
//! CLI and the app share a single source of truth.

use std::path::{Path, PathBuf};

use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};

/// A figment [`Provider`] for `key=value` / `key: value` files.
///
/// A missing file yields an empty dictionary, matching `Toml::file`.
pub struct Properties {
    source: Source,
}

enum Source {
    File(PathBuf),
    Text(String),
}

impl Properties {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            source: Source::File(path.as_ref().to_path_buf()),
        }
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self {
            source: Source::Text(text.into()),
        }
    }
}

impl Provider for Properties {
    fn metadata(&self) -> Metadata {
        match &self.source {
            Source::File(path) => Metadata::named(format!("properties file {}", path.display())),
            Source::Text(_) => Metadata::named("properties source string"),
        }
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let text = match &self.source {
            Source::Text(text) => text.clone(),
            Source::File(path) => match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(Map::new());
                }
                Err(e) => {
                    return Err(Error::from(format!("{}: {e}", path.display())));
                }
            },
        };

        let dict: Dict = parse(&text)
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect();
        Ok(Profile::Default.collect(dict))
    }
}

/// Parse properties text into lowercase keys and raw string values.
///
/// Blank lines and lines starting with `#` or `!` are skipped. The first
/// `=` or `:` separates key from value; both sides are trimmed. Values are
/// never interpreted, so `12345` stays a string.
pub fn parse(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(&['=', ':'][..])?;
            let key = line[..split].trim();
            if key.is_empty() {
                return None;
            }
            let value = line[split + 1..].trim();
            Some((key.to_lowercase(), value.to_string()))
        })
        .collect()
}
