//! Generator module - writes every route of the site to the output directory

use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::composer::{Composed, PageContext, INDEX};
use crate::error::{Error, Result};
use crate::LoadedSite;

/// Outcome of a build
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// (page id, written file) in build order
    pub routes: Vec<(String, PathBuf)>,
    /// Number of asset files copied
    pub assets: usize,
}

/// Batch builder for a loaded site
pub struct SiteBuilder<'a> {
    site: &'a LoadedSite,
    base_dir: &'a Path,
}

impl<'a> SiteBuilder<'a> {
    /// `base_dir` is where asset paths are resolved from
    pub fn new(site: &'a LoadedSite, base_dir: &'a Path) -> Self {
        Self { site, base_dir }
    }

    /// Every page id the build writes: the home page, the other static pages,
    /// then the posts newest first
    pub fn routes(&self) -> Vec<String> {
        let mut routes = vec![INDEX.to_string()];

        for name in self.site.templates.page_names() {
            if name == INDEX {
                continue;
            }
            if self.site.posts.find_by_slug(name).is_some() {
                tracing::warn!("Static page {} is shadowed by a post with the same slug", name);
                continue;
            }
            routes.push(name.to_string());
        }

        routes.extend(self.site.posts.posts().iter().map(|p| p.slug.clone()));
        routes
    }

    /// Generate the entire site into `output_dir`.
    ///
    /// Every page is composed before anything is touched on disk, so a failure
    /// leaves the previous output in place. The directory is then removed and
    /// regenerated from scratch.
    pub fn build_all(&self, output_dir: &Path) -> Result<BuildReport> {
        let composer = self.site.composer();
        let context = PageContext::build();

        let mut documents = Vec::new();
        for page_id in self.routes() {
            match composer.compose(&page_id, &context)? {
                Composed::Document(html) => documents.push((page_id, html)),
                Composed::NotFound => return Err(Error::Build(page_id)),
            }
        }

        self.check_output_dir(output_dir)?;

        if output_dir.exists() {
            fs::remove_dir_all(output_dir).map_err(|source| Error::Write {
                path: output_dir.to_path_buf(),
                source,
            })?;
        }
        fs::create_dir_all(output_dir).map_err(|source| Error::Write {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let mut report = BuildReport::default();
        for (page_id, html) in documents {
            let output_path = output_dir.join(format!("{}.html", page_id));
            fs::write(&output_path, html).map_err(|source| Error::Write {
                path: output_path.clone(),
                source,
            })?;
            println!("{} -> {}", page_id, output_path.display());
            tracing::debug!("Generated: {:?}", output_path);
            report.routes.push((page_id, output_path));
        }

        report.assets = self.copy_assets(output_dir)?;

        Ok(report)
    }

    /// Refuse an output directory that would delete the site's own sources:
    /// the base directory itself, or anything overlapping the posts, pages or
    /// asset paths
    fn check_output_dir(&self, output_dir: &Path) -> Result<()> {
        let config = &self.site.config;
        let output = normalize(output_dir);
        let base = normalize(self.base_dir);

        let conflict = |conflict: &Path| Error::OutputDir {
            path: output_dir.to_path_buf(),
            conflict: conflict.to_path_buf(),
        };

        if base.starts_with(&output) {
            return Err(conflict(self.base_dir));
        }

        let sources = [&config.posts_dir, &config.pages_dir]
            .into_iter()
            .chain(config.assets.iter())
            .map(|dir| self.base_dir.join(dir));
        for source in sources {
            let normalized = normalize(&source);
            if normalized.starts_with(&output) || output.starts_with(&normalized) {
                return Err(conflict(&source));
            }
        }

        Ok(())
    }

    /// Copy configured assets (files or whole directories) verbatim
    fn copy_assets(&self, output_dir: &Path) -> Result<usize> {
        let mut copied = 0;

        for asset in &self.site.config.assets {
            let source = self.base_dir.join(asset);
            if !source.exists() {
                tracing::debug!("Asset {:?} not found, skipping", source);
                continue;
            }

            for entry in WalkDir::new(&source).follow_links(true) {
                let entry = entry.map_err(|e| Error::Load {
                    path: e.path().unwrap_or(&source).to_path_buf(),
                    source: e.into(),
                })?;
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }

                // Assets outside the site directory land at the top of the output
                let relative = path
                    .strip_prefix(self.base_dir)
                    .or_else(|_| path.strip_prefix(source.parent().unwrap_or(&source)))
                    .unwrap_or(path);
                let dest = output_dir.join(relative);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent).map_err(|source| Error::Write {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
                fs::copy(path, &dest).map_err(|source| Error::Write {
                    path: dest.clone(),
                    source,
                })?;
                copied += 1;
            }
        }

        tracing::debug!("Copied {} asset files", copied);
        Ok(copied)
    }
}

/// Lexically clean a path: drop `.` components and fold `..` into their parent
fn normalize(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(component);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Site;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn write_post(site: &Path, slug: &str, title: &str, date: &str) {
        let posts = site.join("posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(
            posts.join(format!("{}.md", slug)),
            format!("---\ntitle: {}\ndate: {}\n---\n\nPost {} body.\n", title, date, slug),
        )
        .unwrap();
    }

    fn file_names(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect()
    }

    fn three_post_site() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "B", "Metatables", "2022-11-30");
        write_post(dir.path(), "C", "Coroutines", "2022-04-06");
        write_post(dir.path(), "A", "Coding Style", "2023-01-06");
        dir
    }

    #[test]
    fn test_build_all_writes_every_route() {
        let dir = three_post_site();
        let site = Site::new(dir.path()).unwrap();
        let loaded = site.load().unwrap();
        let builder = SiteBuilder::new(&loaded, &site.base_dir);

        assert_eq!(builder.routes(), vec!["index", "A", "B", "C"]);

        let report = builder.build_all(&site.output_dir).unwrap();
        assert_eq!(report.routes.len(), 4);
        assert_eq!(report.assets, 0);
        assert_eq!(
            file_names(&site.output_dir),
            ["index.html", "A.html", "B.html", "C.html"]
                .iter()
                .map(|s| s.to_string())
                .collect::<BTreeSet<String>>()
        );

        let index = fs::read_to_string(site.output_dir.join("index.html")).unwrap();
        let a = index.find("Coding Style").unwrap();
        let b = index.find("Metatables").unwrap();
        let c = index.find("Coroutines").unwrap();
        assert!(a < b && b < c);

        let post = fs::read_to_string(site.output_dir.join("B.html")).unwrap();
        assert!(post.contains("<p>Post B body.</p>"));
    }

    #[test]
    fn test_rebuild_removes_stale_output() {
        let dir = three_post_site();
        let site = Site::new(dir.path()).unwrap();
        fs::create_dir_all(&site.output_dir).unwrap();
        fs::write(site.output_dir.join("old-post.html"), "stale").unwrap();

        let loaded = site.load().unwrap();
        SiteBuilder::new(&loaded, &site.base_dir)
            .build_all(&site.output_dir)
            .unwrap();

        assert!(!site.output_dir.join("old-post.html").exists());
        assert!(site.output_dir.join("index.html").exists());
    }

    #[test]
    fn test_static_pages_and_assets() {
        let dir = three_post_site();
        let pages = dir.path().join("pages");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join("about.html"), "<p>{{ posts | length }} posts</p>").unwrap();
        fs::write(pages.join("A.html"), "<p>shadowed</p>").unwrap();
        fs::create_dir_all(dir.path().join("public/images")).unwrap();
        fs::write(dir.path().join("public/style.css"), "body {}").unwrap();
        fs::write(dir.path().join("public/images/logo.png"), [0u8, 1, 2]).unwrap();
        fs::write(dir.path().join("CNAME"), "example.com").unwrap();

        let site = Site::new(dir.path()).unwrap();
        let loaded = site.load().unwrap();
        let builder = SiteBuilder::new(&loaded, &site.base_dir);
        assert_eq!(builder.routes(), vec!["index", "about", "A", "B", "C"]);

        let report = builder.build_all(&site.output_dir).unwrap();
        assert_eq!(report.assets, 3);

        let about = fs::read_to_string(site.output_dir.join("about.html")).unwrap();
        assert!(about.contains("<p>3 posts</p>"));
        let a = fs::read_to_string(site.output_dir.join("A.html")).unwrap();
        assert!(!a.contains("shadowed"));
        assert_eq!(
            fs::read(site.output_dir.join("public/images/logo.png")).unwrap(),
            vec![0u8, 1, 2]
        );
        assert_eq!(
            fs::read_to_string(site.output_dir.join("CNAME")).unwrap(),
            "example.com"
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/site/./dist")), PathBuf::from("/site/dist"));
        assert_eq!(normalize(Path::new("/site/posts/..")), PathBuf::from("/site"));
        assert_eq!(normalize(Path::new("/site/")), PathBuf::from("/site"));
    }

    #[test]
    fn test_output_dir_overlapping_sources_is_rejected() {
        for output_dir in ["posts", "pages", "public", ".", "", "..", "posts/out", "dist/.."] {
            let dir = three_post_site();
            let mut config = crate::config::SiteConfig::default();
            config.output_dir = output_dir.to_string();
            let site = Site::with_config(dir.path().to_path_buf(), config);

            let loaded = site.load().unwrap();
            let err = SiteBuilder::new(&loaded, &site.base_dir)
                .build_all(&site.output_dir)
                .unwrap_err();
            assert!(
                matches!(err, Error::OutputDir { .. }),
                "{:?} was accepted: {}",
                output_dir,
                err
            );

            assert!(dir.path().join("posts/A.md").exists());
            assert!(site.load().is_ok());
        }
    }

    #[test]
    fn test_output_dir_beside_sources_is_accepted() {
        let dir = three_post_site();
        let mut config = crate::config::SiteConfig::default();
        config.output_dir = "build/site".to_string();
        let site = Site::with_config(dir.path().to_path_buf(), config);

        let loaded = site.load().unwrap();
        SiteBuilder::new(&loaded, &site.base_dir)
            .build_all(&site.output_dir)
            .unwrap();
        assert!(dir.path().join("build/site/index.html").exists());
    }

    #[test]
    fn test_template_error_leaves_previous_output() {
        let dir = three_post_site();
        let pages = dir.path().join("pages");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join("broken.html"), "{{ missing_variable }}").unwrap();

        let site = Site::new(dir.path()).unwrap();
        fs::create_dir_all(&site.output_dir).unwrap();
        fs::write(site.output_dir.join("index.html"), "previous").unwrap();

        let loaded = site.load().unwrap();
        let err = SiteBuilder::new(&loaded, &site.base_dir)
            .build_all(&site.output_dir)
            .unwrap_err();
        assert!(matches!(err, Error::Template(_)));
        assert_eq!(
            fs::read_to_string(site.output_dir.join("index.html")).unwrap(),
            "previous"
        );
    }
}
