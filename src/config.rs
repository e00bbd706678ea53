use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

use crate::layout::SLOT_COUNT;

pub const DEFAULT_TITLE: &str = "all";

/// One configured pane. Position in the config array decides the grid slot.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaneSpec {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl PaneSpec {
    /// The filter to hand to the tail binary, if any. Blank filters count as unset.
    pub fn active_filter(&self) -> Option<&str> {
        self.filter.as_deref().filter(|filter| !filter.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("config {path} lists {count} panes but the grid only has {} slots", SLOT_COUNT)]
    TooManyPanes { path: String, count: usize },
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Vec<PaneSpec>, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    parse_config(&contents).map_err(|err| match err {
        ParseFailure::Json(source) => ConfigError::Parse {
            path: display,
            source,
        },
        ParseFailure::TooMany(count) => ConfigError::TooManyPanes {
            path: display,
            count,
        },
    })
}

#[derive(Debug)]
enum ParseFailure {
    Json(serde_json::Error),
    TooMany(usize),
}

fn parse_config(contents: &str) -> Result<Vec<PaneSpec>, ParseFailure> {
    let specs: Vec<PaneSpec> = serde_json::from_str(contents).map_err(ParseFailure::Json)?;
    if specs.len() > SLOT_COUNT {
        return Err(ParseFailure::TooMany(specs.len()));
    }
    Ok(specs)
}
