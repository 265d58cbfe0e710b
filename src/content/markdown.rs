//! Markdown rendering with optional syntax highlighting

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::config::SiteConfig;
use crate::helpers::html_escape;

/// Server-side highlighting state, only loaded when enabled
struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
}

/// Markdown renderer. Produces an HTML fragment, never a full document.
pub struct MarkdownRenderer {
    highlighter: Option<Highlighter>,
    external_links_new_tab: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer: code blocks are left for client-side
    /// highlighting and links are untouched
    pub fn new() -> Self {
        Self {
            highlighter: None,
            external_links_new_tab: false,
        }
    }

    /// Create with the site's settings
    pub fn from_config(config: &SiteConfig) -> Self {
        let highlighter = config.highlight.enable.then(|| Highlighter {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: config.highlight.theme.clone(),
            line_numbers: config.highlight.line_number,
        });
        Self {
            highlighter,
            external_links_new_tab: config.external_links_new_tab,
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut code_block: Option<(Option<String>, String)> = None;
        // One entry per open link: whether we emitted its tags ourselves
        let mut links: Vec<bool> = Vec::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) if self.highlighter.is_some() => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => {
                            Some(lang.to_string())
                        }
                        _ => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) if code_block.is_some() => {
                    if let Some((lang, code)) = code_block.take() {
                        let highlighted = self.highlight_code(&code, lang.as_deref());
                        events.push(Event::Html(CowStr::from(highlighted)));
                    }
                }
                Event::Text(text) if code_block.is_some() => {
                    if let Some((_, code)) = code_block.as_mut() {
                        code.push_str(&text);
                    }
                }
                Event::Start(Tag::Link {
                    dest_url, title, ..
                }) if self.external_links_new_tab && is_external(&dest_url) => {
                    let mut tag = format!(r#"<a href="{}""#, html_escape(&dest_url));
                    if !title.is_empty() {
                        tag.push_str(&format!(r#" title="{}""#, html_escape(&title)));
                    }
                    tag.push_str(r#" target="_blank" rel="noopener">"#);
                    events.push(Event::Html(CowStr::from(tag)));
                    links.push(true);
                }
                Event::Start(Tag::Link { .. }) => {
                    links.push(false);
                    events.push(event);
                }
                Event::End(TagEnd::Link) => {
                    if links.pop().unwrap_or(false) {
                        events.push(Event::Html(CowStr::Borrowed("</a>")));
                    } else {
                        events.push(event);
                    }
                }
                _ => events.push(event),
            }
        }

        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");
        let Some(hl) = &self.highlighter else {
            return plain_code_block(code, lang);
        };

        let syntax = hl
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| hl.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| hl.syntax_set.find_syntax_plain_text());

        let Some(theme) = hl
            .theme_set
            .themes
            .get(&hl.theme_name)
            .or_else(|| hl.theme_set.themes.values().next())
        else {
            return plain_code_block(code, lang);
        };

        match highlighted_html_for_string(code, &hl.syntax_set, syntax, theme) {
            Ok(highlighted) if hl.line_numbers => add_line_numbers(&highlighted, lang),
            Ok(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                html_escape(lang),
                highlighted
            ),
            Err(e) => {
                tracing::warn!("Failed to highlight {} code block: {}", lang, e);
                plain_code_block(code, lang)
            }
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_external(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn plain_code_block(code: &str, lang: &str) -> String {
    format!(
        r#"<pre><code class="language-{}">{}</code></pre>"#,
        html_escape(lang),
        html_escape(code)
    )
}

/// Add line numbers to highlighted code
fn add_line_numbers(code: &str, lang: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();

    let gutter = (1..=lines.len())
        .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
        html_escape(lang),
        gutter,
        lines.join("\n")
    )
}
