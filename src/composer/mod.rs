//! Page composition - turns a page identifier into a complete HTML document
//!
//! A page identifier resolves to a post (by slug) or, failing that, to a static
//! page template. Each page renders only its own content into a
//! [`PageContent`]; the master layout then wraps that content with the shared
//! head and footer.

use tera::Context;

use crate::config::SiteConfig;
use crate::content::{MarkdownRenderer, Post, PostRepository};
use crate::error::Result;
use crate::templates::{PostData, SiteData, TemplateRenderer};

/// Identifier of the home page
pub const INDEX: &str = "index";

/// Where the composed document is going
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Written to disk by a batch build
    #[default]
    Build,
    /// Served on request by the development server
    Serve,
}

/// Caller-supplied variables for a composition
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub mode: RenderMode,
}

impl PageContext {
    pub fn build() -> Self {
        Self {
            mode: RenderMode::Build,
        }
    }

    pub fn serve() -> Self {
        Self {
            mode: RenderMode::Serve,
        }
    }
}

/// What a page identifier refers to
#[derive(Debug)]
pub enum Resolution<'a> {
    Post(&'a Post),
    Static(&'a str),
    NotFound,
}

/// Result of composing a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composed {
    Document(String),
    NotFound,
}

impl Composed {
    pub fn into_document(self) -> Option<String> {
        match self {
            Composed::Document(html) => Some(html),
            Composed::NotFound => None,
        }
    }
}

/// The unique part of a page, before the layout is applied
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: String,
}

/// Composes pages from the loaded posts and templates
pub struct PageComposer<'a> {
    config: &'a SiteConfig,
    posts: &'a PostRepository,
    templates: &'a TemplateRenderer,
    markdown: &'a MarkdownRenderer,
}

impl<'a> PageComposer<'a> {
    pub fn new(
        config: &'a SiteConfig,
        posts: &'a PostRepository,
        templates: &'a TemplateRenderer,
        markdown: &'a MarkdownRenderer,
    ) -> Self {
        Self {
            config,
            posts,
            templates,
            markdown,
        }
    }

    /// Posts win over static pages of the same name
    pub fn resolve<'s>(&'s self, page_id: &'s str) -> Resolution<'s> {
        if let Some(post) = self.posts.find_by_slug(page_id) {
            Resolution::Post(post)
        } else if self.templates.has_page(page_id) {
            Resolution::Static(page_id)
        } else {
            Resolution::NotFound
        }
    }

    /// Compose the complete document for `page_id`
    pub fn compose(&self, page_id: &str, context: &PageContext) -> Result<Composed> {
        let content = match self.resolve(page_id) {
            Resolution::Post(post) => {
                tracing::debug!("Composing post {}", page_id);
                self.render_post(post)?
            }
            Resolution::Static(name) => {
                tracing::debug!("Composing static page {}", name);
                match self.render_static(name)? {
                    Some(content) => content,
                    None => return Ok(Composed::NotFound),
                }
            }
            Resolution::NotFound => return Ok(Composed::NotFound),
        };

        let document = self.render_layout(page_id, content, context)?;
        Ok(Composed::Document(document))
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &SiteData::from_config(self.config));
        context
    }

    fn render_post(&self, post: &Post) -> Result<PageContent> {
        let mut context = self.base_context();
        context.insert("post", &PostData::from_post(post, self.config));
        context.insert("content", &self.markdown.render(&post.body));

        Ok(PageContent {
            title: Some(post.title.clone()),
            description: post.description().map(str::to_string),
            body: self.templates.render_post(&context)?,
        })
    }

    fn render_static(&self, name: &str) -> Result<Option<PageContent>> {
        let posts: Vec<PostData> = self
            .posts
            .posts()
            .iter()
            .map(|p| PostData::from_post(p, self.config))
            .collect();

        let mut context = self.base_context();
        context.insert("page", name);
        context.insert("posts", &posts);
        context.insert("projects", &self.config.projects);

        Ok(self
            .templates
            .render_page(name, &context)?
            .map(|body| PageContent {
                title: None,
                description: None,
                body,
            }))
    }

    fn render_layout(
        &self,
        page_id: &str,
        content: PageContent,
        page_context: &PageContext,
    ) -> Result<String> {
        let page_title = match &content.title {
            Some(title) => format!("{} | {}", title, self.config.author),
            None => self.config.author.clone(),
        };
        let description = content
            .description
            .unwrap_or_else(|| self.config.description.clone());

        let mut context = self.base_context();
        context.insert("page_id", page_id);
        context.insert("page_title", &page_title);
        context.insert("description", &description);
        context.insert("content", &content.body);
        context.insert("is_home", &(page_id == INDEX));
        context.insert("is_static", &(page_context.mode == RenderMode::Build));

        self.templates.render_layout(&context)
    }
}
