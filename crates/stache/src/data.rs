//! Loading template data from JSON and YAML.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde_json::Value as Json;

/// Data file formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
    /// Unknown origin (stdin): JSON is tried first, then YAML.
    Detect,
}

impl DataFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => DataFormat::Yaml,
            _ => DataFormat::Json,
        }
    }
}

/// Parses data text in the given format.
pub fn parse(text: &str, format: DataFormat) -> Result<Json> {
    match format {
        DataFormat::Json => serde_json::from_str(text).context("invalid JSON data"),
        DataFormat::Yaml => serde_yaml::from_str(text).context("invalid YAML data"),
        DataFormat::Detect => match serde_json::from_str(text) {
            Ok(value) => Ok(value),
            Err(json_err) => serde_yaml::from_str(text)
                .with_context(|| format!("data is neither JSON ({}) nor YAML", json_err)),
        },
    }
}

/// Loads render data from a file, from stdin when the path is `-`, or an
/// empty object when no path is given.
pub fn load(path: Option<&Path>) -> Result<Json> {
    let Some(path) = path else {
        return Ok(Json::Object(Default::default()));
    };

    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read data from stdin")?;
        return parse(&text, DataFormat::Detect);
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read data file {}", path.display()))?;
    parse(&text, DataFormat::from_path(path))
        .with_context(|| format!("failed to parse {}", path.display()))
}
