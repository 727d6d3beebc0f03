//! Script normalization: traditional → simplified Chinese
//!
//! By default text is converted to zh-Hans with the OpenCC and MediaWiki
//! dictionaries bundled in `zhconv`, which include phrase-level mappings.
//! A dictionary file in OpenCC text format can replace them; it is loaded on
//! first use and kept for the life of the process.

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use zhconv::{zhconv, Variant};

/// Normalizer errors
#[derive(Debug, Clone, Error)]
pub enum NormalizeError {
    #[error("conversion table unavailable: {0}")]
    Table(String),
}

/// Where the conversion dictionary comes from
#[derive(Debug, Clone)]
pub enum TableSource {
    /// OpenCC/MediaWiki dictionaries compiled into the binary
    Bundled,
    /// OpenCC-format dictionary file (`TSCharacters.txt`, `TSPhrases.txt`, ...)
    File(PathBuf),
}

/// Parsed OpenCC-format dictionary
///
/// Lines are `<traditional><TAB><simplified> [<alternative> ...]`; the first
/// candidate wins. Keys may be phrases. Conversion uses longest match.
#[derive(Debug)]
pub struct ConversionTable {
    map: HashMap<String, String>,
    longest_key: usize,
}

impl ConversionTable {
    pub fn parse(source: &str) -> Result<Self, NormalizeError> {
        let mut map = HashMap::new();
        let mut longest_key = 0;

        for (index, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let (Some(from), Some(to)) = (fields.next(), fields.next()) else {
                return Err(NormalizeError::Table(format!(
                    "line {}: expected a key and at least one candidate",
                    index + 1
                )));
            };

            if map.insert(from.to_string(), to.to_string()).is_some() {
                return Err(NormalizeError::Table(format!(
                    "line {}: duplicate entry for {}",
                    index + 1,
                    from
                )));
            }
            longest_key = longest_key.max(from.chars().count());
        }

        if map.is_empty() {
            return Err(NormalizeError::Table("table has no entries".to_string()));
        }

        Ok(Self { map, longest_key })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Single left-to-right pass; converted output is never re-scanned
    pub fn convert(&self, text: &str) -> String {
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        while pos < char_count {
            let max_len = self.longest_key.min(char_count - pos);
            let matched = (1..=max_len).rev().find_map(|len| {
                let key = &text[boundaries[pos]..boundaries[pos + len]];
                self.map.get(key).map(|value| (len, value))
            });

            match matched {
                Some((len, value)) => {
                    out.push_str(value);
                    pos += len;
                }
                None => {
                    out.push_str(&text[boundaries[pos]..boundaries[pos + 1]]);
                    pos += 1;
                }
            }
        }
        out
    }
}

enum Dictionary {
    Bundled,
    Table(ConversionTable),
}

impl Dictionary {
    fn convert(&self, text: &str) -> String {
        match self {
            Dictionary::Bundled => zhconv(text, Variant::ZhHans),
            Dictionary::Table(table) => table.convert(text),
        }
    }
}

/// Lazily initialized normalizer
pub struct ScriptNormalizer {
    source: TableSource,
    dictionary: OnceCell<Result<Arc<Dictionary>, NormalizeError>>,
}

impl ScriptNormalizer {
    pub fn new(source: TableSource) -> Self {
        Self {
            source,
            dictionary: OnceCell::new(),
        }
    }

    pub fn from_config(table_path: Option<PathBuf>) -> Self {
        match table_path {
            Some(path) => Self::new(TableSource::File(path)),
            None => Self::new(TableSource::Bundled),
        }
    }

    /// Loaded dictionary; the first load result (success or failure) is kept
    fn dictionary(&self) -> Result<Arc<Dictionary>, NormalizeError> {
        self.dictionary
            .get_or_init(|| {
                let result = self.load();
                match &result {
                    Ok(_) => tracing::info!(source = ?self.source, "Conversion dictionary ready"),
                    Err(e) => {
                        tracing::error!(source = ?self.source, "Conversion table failed: {}", e)
                    }
                }
                result
            })
            .clone()
    }

    fn load(&self) -> Result<Arc<Dictionary>, NormalizeError> {
        let dictionary = match &self.source {
            TableSource::Bundled => Dictionary::Bundled,
            TableSource::File(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    NormalizeError::Table(format!("read {} failed: {}", path.display(), e))
                })?;
                let table = ConversionTable::parse(&content)?;
                tracing::debug!(entries = table.len(), path = %path.display(), "Table parsed");
                Dictionary::Table(table)
            }
        };
        Ok(Arc::new(dictionary))
    }

    /// Convert traditional characters to simplified
    ///
    /// Text without convertible characters is returned unchanged.
    pub fn normalize(&self, text: &str) -> Result<String, NormalizeError> {
        Ok(self.dictionary()?.convert(text))
    }
}
