//! Post repository - loads posts from the posts directory

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::frontmatter::parse_date;
use super::{FrontMatter, Post};
use crate::error::{Error, Result};

/// Slug reserved for the home page
pub const RESERVED_SLUG: &str = "index";

/// All posts of a site, newest first
#[derive(Debug, Clone, Default)]
pub struct PostRepository {
    posts: Vec<Post>,
    by_slug: HashMap<String, usize>,
}

impl PostRepository {
    /// Load every post in `posts_dir`.
    ///
    /// Any unreadable or malformed post aborts the whole load: a broken post
    /// must not silently disappear from the site.
    pub fn load<P: AsRef<Path>>(posts_dir: P) -> Result<Self> {
        let posts_dir = posts_dir.as_ref();
        if !posts_dir.is_dir() {
            return Err(Error::Load {
                path: posts_dir.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "posts directory does not exist",
                ),
            });
        }

        let mut posts = Vec::new();

        // Sorted so that discovery order, the tie-breaker for equal dates, is stable
        for entry in WalkDir::new(posts_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| Error::Load {
                path: e.path().unwrap_or(posts_dir).to_path_buf(),
                source: e.into(),
            })?;
            let path = entry.path();

            if !entry.file_type().is_file() || is_hidden(path) {
                tracing::debug!("Skipping non-post entry {:?}", path);
                continue;
            }

            let post = load_post(path)?;
            tracing::debug!("Loaded post {} ({})", post.slug, post.date);
            posts.push(post);
        }

        Self::from_posts(posts)
    }

    /// Build a repository from already parsed posts
    pub fn from_posts(mut posts: Vec<Post>) -> Result<Self> {
        // Stable: posts sharing a date keep their discovery order
        posts.sort_by(|a, b| b.date.cmp(&a.date));

        let mut by_slug: HashMap<String, usize> = HashMap::with_capacity(posts.len());
        for (i, post) in posts.iter().enumerate() {
            if post.slug == RESERVED_SLUG {
                return Err(Error::ReservedSlug {
                    path: post.source.clone(),
                    slug: post.slug.clone(),
                });
            }
            if let Some(&first) = by_slug.get(&post.slug) {
                return Err(Error::DuplicateSlug {
                    slug: post.slug.clone(),
                    first: posts[first].source.clone(),
                    second: post.source.clone(),
                });
            }
            by_slug.insert(post.slug.clone(), i);
        }

        Ok(Self { posts, by_slug })
    }

    /// Exact, case-sensitive lookup
    pub fn find_by_slug(&self, slug: &str) -> Option<&Post> {
        self.by_slug.get(slug).map(|&i| &self.posts[i])
    }

    /// Posts sorted by date, newest first
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Load a single post from a file
pub fn load_post(path: &Path) -> Result<Post> {
    let content = fs::read_to_string(path).map_err(|source| Error::Load {
        path: path.to_path_buf(),
        source,
    })?;
    parse_post(path, &content)
}

/// Build a post from the source text of `path`
pub fn parse_post(path: &Path, content: &str) -> Result<Post> {
    let (meta, body) = FrontMatter::parse(content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let title = meta
        .title()
        .ok_or_else(|| Error::MissingField {
            path: path.to_path_buf(),
            field: "title",
        })?
        .to_string();

    let raw_date = meta.date().ok_or_else(|| Error::MissingField {
        path: path.to_path_buf(),
        field: "date",
    })?;
    let date = parse_date(raw_date).ok_or_else(|| Error::InvalidDate {
        path: path.to_path_buf(),
        value: raw_date.to_string(),
    })?;

    Ok(Post {
        slug: slug_for(path),
        title,
        date,
        body: body.to_string(),
        meta,
        source: PathBuf::from(path),
    })
}

/// Slug from a file name: everything before the last extension
pub fn slug_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_post(dir: &Path, name: &str, title: &str, date: &str) {
        let content = format!("---\ntitle: {}\ndate: {}\n---\n\nBody of {}.\n", title, date, name);
        fs::write(dir.join(name), content).unwrap();
    }

    fn slugs(repo: &PostRepository) -> Vec<&str> {
        repo.posts().iter().map(|p| p.slug.as_str()).collect()
    }

    #[test]
    fn test_load_sorts_newest_first() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "coroutines.md", "Lua Coroutines By Example", "2022-04-06");
        write_post(dir.path(), "cpp-style.md", "C++ Coding Style", "2023-01-06");
        write_post(dir.path(), "metatables-in-c.md", "Using Lua Metatables", "2022-11-30");

        let repo = PostRepository::load(dir.path()).unwrap();
        assert_eq!(slugs(&repo), vec!["cpp-style", "metatables-in-c", "coroutines"]);
        assert_eq!(repo.len(), 3);

        let first = &repo.posts()[0];
        assert_eq!(first.title, "C++ Coding Style");
        assert_eq!(first.date, chrono::NaiveDate::from_ymd_opt(2023, 1, 6).unwrap());
        assert_eq!(first.body, "\n\nBody of cpp-style.md.\n");
    }

    #[test]
    fn test_equal_dates_keep_discovery_order() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "b-second.md", "Second", "2022-01-03");
        write_post(dir.path(), "a-first.md", "First", "2022-01-03");
        write_post(dir.path(), "c-newer.md", "Newer", "2022-01-04");

        let repo = PostRepository::load(dir.path()).unwrap();
        assert_eq!(slugs(&repo), vec!["c-newer", "a-first", "b-second"]);
    }

    #[test]
    fn test_find_by_slug() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "cpp-style.md", "C++ Coding Style", "2023-01-06");

        let repo = PostRepository::load(dir.path()).unwrap();
        assert_eq!(repo.find_by_slug("cpp-style").unwrap().title, "C++ Coding Style");
        assert!(repo.find_by_slug("does-not-exist").is_none());
        assert!(repo.find_by_slug("CPP-STYLE").is_none());
        assert!(repo.find_by_slug("cpp").is_none());
    }

    #[test]
    fn test_slug_strips_last_extension_only() {
        assert_eq!(slug_for(Path::new("posts/cpp-style.md")), "cpp-style");
        assert_eq!(slug_for(Path::new("posts/v1.2-notes.markdown")), "v1.2-notes");
        assert_eq!(slug_for(Path::new("posts/README")), "README");
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let post = parse_post(
            Path::new("posts/batch-renderer.md"),
            "---\ntitle: A Tiny Batch Renderer\ndate: 2022-01-04\ndescription: Sprites, fast\n---\nhi",
        )
        .unwrap();
        assert_eq!(post.description(), Some("Sprites, fast"));
        assert_eq!(post.meta.get("title"), Some("A Tiny Batch Renderer"));
    }

    #[test]
    fn test_malformed_post_aborts_load() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "good.md", "Good", "2022-01-03");
        fs::write(dir.path().join("broken.md"), "---\ntitle: Broken\n\nno end marker").unwrap();

        let err = PostRepository::load(dir.path()).unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("broken.md"));
        assert!(err.to_string().contains("missing front-matter end"));
    }

    #[test]
    fn test_missing_required_fields() {
        let err = parse_post(Path::new("x.md"), "---\ndate: 2022-01-03\n---\n").unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "title", .. }));

        let err = parse_post(Path::new("x.md"), "---\ntitle: No date\n---\n").unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "date", .. }));

        let err = parse_post(Path::new("x.md"), "---\ntitle: \ndate: 2022-01-03\n---\n").unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "title", .. }));
    }

    #[test]
    fn test_non_iso_date_rejected() {
        let err = parse_post(Path::new("x.md"), "---\ntitle: T\ndate: 1/3/2022\n---\n").unwrap_err();
        assert!(matches!(err, Error::InvalidDate { ref value, .. } if value == "1/3/2022"));
    }

    #[test]
    fn test_duplicate_and_reserved_slugs() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "notes.md", "Notes", "2022-01-03");
        write_post(dir.path(), "notes.markdown", "Notes again", "2022-01-04");
        let err = PostRepository::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::DuplicateSlug { ref slug, .. } if slug == "notes"));

        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "index.md", "Home?", "2022-01-03");
        let err = PostRepository::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ReservedSlug { .. }));
    }

    #[test]
    fn test_skips_directories_and_hidden_files() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "real.md", "Real", "2022-01-03");
        fs::write(dir.path().join(".real.md.swp"), "binary junk").unwrap();
        fs::create_dir(dir.path().join("drafts")).unwrap();

        let repo = PostRepository::load(dir.path()).unwrap();
        assert_eq!(slugs(&repo), vec!["real"]);
    }

    #[test]
    fn test_missing_directory_is_load_error() {
        let dir = TempDir::new().unwrap();
        let err = PostRepository::load(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }
}
