//! postpress: a small static site generator for a personal blog
//!
//! Posts are Markdown files with a `key: value` front-matter block. They are
//! rendered into Tera templates and wrapped in a shared layout, either all at
//! once into an output directory or one page at a time by the development
//! server.

pub mod commands;
pub mod composer;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod templates;

use std::path::{Path, PathBuf};

pub use error::{Error, FrontMatterError, Result};

use composer::PageComposer;
use content::{MarkdownRenderer, PostRepository};
use templates::TemplateRenderer;

/// Name of the site configuration file in the base directory
pub const CONFIG_FILE: &str = "site.yml";

/// A site on disk
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Post sources
    pub posts_dir: PathBuf,
    /// Static page templates
    pub pages_dir: PathBuf,
    /// Build output
    pub output_dir: PathBuf,
}

impl Site {
    /// Open the site in a directory, reading `site.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Open the site in a directory with an explicit configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let posts_dir = base_dir.join(&config.posts_dir);
        let pages_dir = base_dir.join(&config.pages_dir);
        let output_dir = base_dir.join(&config.output_dir);

        Self {
            config,
            base_dir,
            posts_dir,
            pages_dir,
            output_dir,
        }
    }

    /// Load posts and templates. Fails on the first broken post.
    pub fn load(&self) -> Result<LoadedSite> {
        let posts = PostRepository::load(&self.posts_dir)?;
        let templates = TemplateRenderer::with_pages_dir(&self.pages_dir)?;
        let markdown = MarkdownRenderer::from_config(&self.config);

        tracing::info!(
            "Loaded {} posts and {} static pages",
            posts.len(),
            templates.page_names().count()
        );

        Ok(LoadedSite {
            config: self.config.clone(),
            posts,
            templates,
            markdown,
        })
    }

    /// Generate the static site
    pub fn build(&self) -> anyhow::Result<generator::BuildReport> {
        commands::build::run(self)
    }

    /// Remove the output directory
    pub fn clean(&self) -> anyhow::Result<()> {
        commands::clean::run(self)
    }

    /// Create a new post
    pub fn new_post(&self, title: &str, slug: Option<&str>) -> anyhow::Result<PathBuf> {
        commands::new::create_post(self, title, slug)
    }
}

/// Everything needed to compose pages. Read-only once loaded; the server
/// replaces it wholesale on reload.
pub struct LoadedSite {
    pub config: config::SiteConfig,
    pub posts: PostRepository,
    pub templates: TemplateRenderer,
    pub markdown: MarkdownRenderer,
}

impl LoadedSite {
    pub fn composer(&self) -> PageComposer<'_> {
        PageComposer::new(&self.config, &self.posts, &self.templates, &self.markdown)
    }
}
