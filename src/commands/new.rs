//! Create a new post

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::content::loader::RESERVED_SLUG;
use crate::content::FrontMatter;
use crate::helpers::ISO_DATE;
use crate::Site;

/// Create `posts/{slug}.md` with a title and today's date.
/// The slug defaults to the slugified title.
pub fn create_post(site: &Site, title: &str, slug: Option<&str>) -> Result<PathBuf> {
    let title = title.trim();
    if title.is_empty() || title.contains('\n') {
        anyhow::bail!("Title must be a single non-empty line");
    }

    let slug = match slug {
        Some(s) => slug::slugify(s),
        None => slug::slugify(title),
    };
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a file name from {:?}", title);
    }
    if slug == RESERVED_SLUG {
        anyhow::bail!("The slug {:?} is reserved for the home page", slug);
    }

    fs::create_dir_all(&site.posts_dir)?;
    let file_path = site.posts_dir.join(format!("{}.md", slug));

    // Check if file already exists
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let mut front_matter = FrontMatter::default();
    front_matter.insert("title", title);
    front_matter.insert(
        "date",
        chrono::Local::now().date_naive().format(ISO_DATE).to_string(),
    );

    fs::write(&file_path, format!("{}\n\n", front_matter.to_block()))?;

    println!("Created: {:?}", file_path);

    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::loader::load_post;
    use tempfile::TempDir;

    #[test]
    fn test_create_post() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();

        let path = create_post(&site, "Using Lua Metatables: The C API", None).unwrap();
        assert_eq!(path, site.posts_dir.join("using-lua-metatables-the-c-api.md"));

        let post = load_post(&path).unwrap();
        assert_eq!(post.title, "Using Lua Metatables: The C API");
        assert_eq!(post.date, chrono::Local::now().date_naive());
        assert_eq!(post.body.trim(), "");
    }

    #[test]
    fn test_create_post_with_slug() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();

        let path = create_post(&site, "C++ Coding Style", Some("cpp-style")).unwrap();
        assert!(path.ends_with("posts/cpp-style.md"));
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();

        create_post(&site, "Hello", None).unwrap();
        assert!(create_post(&site, "Hello", None).is_err());
    }

    #[test]
    fn test_rejects_reserved_and_empty_slugs() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();

        assert!(create_post(&site, "Index", None).is_err());
        assert!(create_post(&site, "???", None).is_err());
        assert!(create_post(&site, "  ", None).is_err());
    }
}
