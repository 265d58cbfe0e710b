//! Page templates using the Tera template engine
//!
//! The built-in layout, index and post templates are embedded in the binary.
//! A site can add static pages (and override the built-ins) with files in its
//! pages directory:
//!
//! - `pages/{name}.html` registers the static page `name`
//!   (`pages/index.html` replaces the built-in home page)
//! - `pages/_layout.html` and `pages/_post.html` replace the master layout and
//!   the post template
//! - any other `pages/_*.html` file is a partial, available to
//!   `{% include "pages/_name.html" %}`

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use walkdir::WalkDir;

use crate::config::{LinkConfig, SiteConfig};
use crate::content::{FrontMatter, Post};
use crate::error::Result;
use crate::helpers::{format_date, ISO_DATE};

const LAYOUT: &str = "layout.html";
const POST: &str = "post.html";
const INDEX: &str = "index.html";

/// Template renderer: built-in templates plus the site's own pages
pub struct TemplateRenderer {
    tera: Tera,
    /// static page name -> template name
    pages: BTreeMap<String, String>,
}

impl TemplateRenderer {
    /// Create a new renderer with only the built-in templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Autoescaping stays on for .html: plain-text fields are escaped, and
        // already rendered HTML is marked `| safe` in the templates
        tera.add_raw_templates(vec![
            (LAYOUT, include_str!("builtin/layout.html")),
            (INDEX, include_str!("builtin/index.html")),
            (POST, include_str!("builtin/post.html")),
        ])?;

        tera.register_filter("date_format", date_format_filter);

        let mut pages = BTreeMap::new();
        pages.insert("index".to_string(), INDEX.to_string());

        Ok(Self { tera, pages })
    }

    /// Create a renderer that also loads the templates in `pages_dir`.
    /// A missing directory just means the site has no extra pages.
    pub fn with_pages_dir<P: AsRef<Path>>(pages_dir: P) -> Result<Self> {
        let mut renderer = Self::new()?;
        let pages_dir = pages_dir.as_ref();
        if !pages_dir.is_dir() {
            return Ok(renderer);
        }

        let mut files: Vec<(PathBuf, Option<String>)> = Vec::new();
        for entry in WalkDir::new(pages_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_template_file(path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let template_name = match stem {
                "_layout" => LAYOUT.to_string(),
                "_post" => POST.to_string(),
                "index" => INDEX.to_string(),
                partial if partial.starts_with('_') => format!("pages/{}.html", partial),
                name => {
                    let template_name = format!("pages/{}.html", name);
                    renderer
                        .pages
                        .insert(name.to_string(), template_name.clone());
                    template_name
                }
            };
            tracing::debug!("Loading template {:?} as {}", path, template_name);
            files.push((path.to_path_buf(), Some(template_name)));
        }

        // Added together so that templates may include or extend each other
        renderer.tera.add_template_files(files)?;

        Ok(renderer)
    }

    /// Whether a static page with this name exists
    pub fn has_page(&self, name: &str) -> bool {
        self.pages.contains_key(name)
    }

    /// Names of all static pages, sorted
    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    /// Render the unique content of a static page.
    /// Returns `None` when no such page exists.
    pub fn render_page(&self, name: &str, context: &Context) -> Result<Option<String>> {
        match self.pages.get(name) {
            Some(template) => Ok(Some(self.tera.render(template, context)?)),
            None => Ok(None),
        }
    }

    /// Render the content of a single post
    pub fn render_post(&self, context: &Context) -> Result<String> {
        Ok(self.tera.render(POST, context)?)
    }

    /// Render the master document around a page's content
    pub fn render_layout(&self, context: &Context) -> Result<String> {
        Ok(self.tera.render(LAYOUT, context)?)
    }
}

fn is_template_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    !hidden
        && path
            .extension()
            .map(|ext| ext == "html" || ext == "htm")
            .unwrap_or(false)
}

/// Tera filter: format an ISO date string
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "%B %-d, %Y".to_string(),
    };

    match chrono::NaiveDate::parse_from_str(&s, ISO_DATE) {
        Ok(date) => Ok(tera::Value::String(format_date(date, &format))),
        // Not a date we understand: leave it as written
        Err(_) => Ok(tera::Value::String(s)),
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub author: String,
    pub description: String,
    pub language: String,
    pub root: String,
    pub analytics_id: Option<String>,
    pub server_highlight: bool,
    pub links: Vec<LinkConfig>,
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl SiteData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            author: config.author.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            root: config.url_for("index"),
            analytics_id: config.analytics_id.clone(),
            server_highlight: config.highlight.enable,
            links: config.links.clone(),
            extra: config.extra.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub slug: String,
    pub title: String,
    /// ISO 8601 date
    pub date: String,
    /// Date formatted for display
    pub date_display: String,
    pub url: String,
    /// Every front-matter field of the post
    pub meta: FrontMatter,
}

impl PostData {
    pub fn from_post(post: &Post, config: &SiteConfig) -> Self {
        Self {
            slug: post.slug.clone(),
            title: post.title.clone(),
            date: post.date.format(ISO_DATE).to_string(),
            date_display: format_date(post.date, &config.date_format),
            url: config.url_for(&post.slug),
            meta: post.meta.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_pages() {
        let renderer = TemplateRenderer::new().unwrap();
        assert!(renderer.has_page("index"));
        assert!(!renderer.has_page("about"));
        assert_eq!(renderer.page_names().collect::<Vec<_>>(), vec!["index"]);
    }

    #[test]
    fn test_render_page_unknown_is_none() {
        let renderer = TemplateRenderer::new().unwrap();
        assert!(renderer
            .render_page("about", &Context::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_pages_dir_registers_pages_and_overrides() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("about.html"),
            r#"<p>About {{ site.author }}</p>{% include "pages/_card.html" %}"#,
        )
        .unwrap();
        fs::write(dir.path().join("_card.html"), "<div>card</div>").unwrap();
        fs::write(dir.path().join("_post.html"), "<article>{{ post.title }}</article>").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

        let renderer = TemplateRenderer::with_pages_dir(dir.path()).unwrap();
        assert_eq!(
            renderer.page_names().collect::<Vec<_>>(),
            vec!["about", "index"]
        );
        assert!(!renderer.has_page("_card"));

        let mut context = Context::new();
        context.insert("site", &SiteData::from_config(&SiteConfig::default()));
        let html = renderer.render_page("about", &context).unwrap().unwrap();
        assert_eq!(html, "<p>About Site Owner</p><div>card</div>");

        let mut context = Context::new();
        context.insert("post", &serde_json::json!({ "title": "<b>Hi</b>" }));
        let html = renderer.render_post(&context).unwrap();
        assert_eq!(html, "<article>&lt;b&gt;Hi&lt;&#x2F;b&gt;</article>");
    }

    #[test]
    fn test_missing_pages_dir_is_fine() {
        let dir = TempDir::new().unwrap();
        let renderer = TemplateRenderer::with_pages_dir(dir.path().join("pages")).unwrap();
        assert!(renderer.has_page("index"));
    }

    #[test]
    fn test_date_format_filter() {
        let mut tera = Tera::default();
        tera.register_filter("date_format", date_format_filter);
        tera.add_raw_template("t", r#"{{ d | date_format }}|{{ d | date_format(format="%Y") }}|{{ x | date_format }}"#)
            .unwrap();
        let mut context = Context::new();
        context.insert("d", "2022-11-30");
        context.insert("x", "someday");
        assert_eq!(
            tera.render("t", &context).unwrap(),
            "November 30, 2022|2022|someday"
        );
    }
}
