//! Post model

use chrono::NaiveDate;
use std::path::PathBuf;

use super::FrontMatter;

/// A blog post. Built once per source file and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Post {
    /// Source file name without its extension
    pub slug: String,

    /// Post title
    pub title: String,

    /// Publication date
    pub date: NaiveDate,

    /// Raw markdown content
    pub body: String,

    /// Every front-matter field, including the ones above
    pub meta: FrontMatter,

    /// Full source file path
    pub source: PathBuf,
}

impl Post {
    /// Optional summary used for the page description
    pub fn description(&self) -> Option<&str> {
        self.meta.get("description").filter(|d| !d.is_empty())
    }
}
