//! Content module - posts, front-matter and markdown processing

mod frontmatter;
pub mod loader;
mod markdown;
mod post;

pub use frontmatter::{parse_date, FrontMatter, MARKER};
pub use loader::PostRepository;
pub use markdown::MarkdownRenderer;
pub use post::Post;
