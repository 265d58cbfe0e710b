//! Site configuration (site.yml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    /// Site owner, used in page titles and the footer
    pub author: String,
    pub description: String,
    pub language: String,

    // URL
    pub root: String,

    // Directory
    pub posts_dir: String,
    pub pages_dir: String,
    pub output_dir: String,
    /// Copied verbatim into the output directory after a build
    pub assets: Vec<String>,

    // Writing
    pub date_format: String,
    pub external_links_new_tab: bool,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Page chrome
    pub analytics_id: Option<String>,
    #[serde(default)]
    pub links: Vec<LinkConfig>,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,

    #[serde(default)]
    pub server: ServerConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            author: "Site Owner".to_string(),
            description: String::new(),
            language: "en".to_string(),

            root: "/".to_string(),

            posts_dir: "posts".to_string(),
            pages_dir: "pages".to_string(),
            output_dir: "dist".to_string(),
            assets: vec![
                "public".to_string(),
                "favicon.ico".to_string(),
                "CNAME".to_string(),
            ],

            date_format: "%B %-d, %Y".to_string(),
            external_links_new_tab: true,
            highlight: HighlightConfig::default(),

            analytics_id: None,
            links: Vec::new(),
            projects: Vec::new(),

            server: ServerConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from YAML text. An empty document yields the defaults.
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// URL of a page relative to the site root
    pub fn url_for(&self, page_id: &str) -> String {
        let root = if self.root.ends_with('/') {
            self.root.clone()
        } else {
            format!("{}/", self.root)
        };
        if page_id == "index" {
            root
        } else {
            format!("{}{}.html", root, page_id)
        }
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Highlight on the server with syntect instead of leaving it to the browser
    pub enable: bool,
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: false,
            theme: "base16-ocean.dark".to_string(),
            line_number: false,
        }
    }
}

/// Footer link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub name: String,
    pub url: String,
}

/// A curated project card shown on the home page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub img: Option<String>,
    pub github: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default = "default_project_color")]
    pub color: String,
    #[serde(default = "default_project_dark_color")]
    pub dark_color: String,
}

fn default_project_color() -> String {
    "#334155".to_string()
}

fn default_project_dark_color() -> String {
    "#1e293b".to_string()
}

/// Development server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 8181,
        }
    }
}
