//! Front-matter parsing

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::FrontMatterError;

/// Marker line delimiting the front-matter block
pub const MARKER: &str = "---";

/// Front-matter data from a post: ordered `key: value` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontMatter {
    fields: IndexMap<String, String>,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), FrontMatterError> {
        let start = content
            .find(MARKER)
            .ok_or(FrontMatterError::MissingStart)?;
        let block_start = start + MARKER.len();

        let end = content[block_start..]
            .find(MARKER)
            .map(|pos| block_start + pos)
            .ok_or(FrontMatterError::MissingEnd)?;

        let mut fields = IndexMap::new();
        for (i, line) in content[block_start..end].lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            // Only the first colon splits; values such as URLs keep theirs
            let (key, value) = line
                .split_once(':')
                .map(|(k, v)| (k.trim(), v.trim()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| FrontMatterError::MalformedLine {
                    line: i + 1,
                    content: line.to_string(),
                })?;

            fields.insert(key.to_string(), value.to_string());
        }

        let body = &content[end + MARKER.len()..];
        Ok((Self { fields }, body))
    }

    /// Look up a field by its exact (case-sensitive) key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").filter(|t| !t.is_empty())
    }

    pub fn date(&self) -> Option<&str> {
        self.get("date").filter(|d| !d.is_empty())
    }

    /// All fields in source order
    pub fn fields(&self) -> &IndexMap<String, String> {
        &self.fields
    }

    /// Serialize back into a marker-delimited block
    pub fn to_block(&self) -> String {
        let mut block = String::from(MARKER);
        block.push('\n');
        for (key, value) in &self.fields {
            block.push_str(key);
            block.push_str(": ");
            block.push_str(value);
            block.push('\n');
        }
        block.push_str(MARKER);
        block
    }
}

/// Parse a front-matter date. Only zero-padded `YYYY-MM-DD` is accepted so that
/// calendar order and lexicographic order agree.
pub fn parse_date(value: &str) -> Option<chrono::NaiveDate> {
    let value = value.trim();
    if value.len() != 10 {
        return None;
    }
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
