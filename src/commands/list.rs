//! List site content

use anyhow::Result;
use serde::Serialize;

use crate::generator::SiteBuilder;
use crate::helpers::ISO_DATE;
use crate::{LoadedSite, Site};

#[derive(Debug, Serialize)]
struct PostEntry {
    slug: String,
    title: String,
    date: String,
    source: String,
}

/// List site content by type: posts, static pages or build routes
pub fn run(site: &Site, content_type: &str, json: bool) -> Result<()> {
    let loaded = site.load()?;
    let output = render(&loaded, &site.base_dir, content_type, json)?;
    print!("{}", output);
    Ok(())
}

fn render(
    loaded: &LoadedSite,
    base_dir: &std::path::Path,
    content_type: &str,
    json: bool,
) -> Result<String> {
    let mut out = String::new();

    match content_type {
        "post" | "posts" => {
            let posts: Vec<PostEntry> = loaded
                .posts
                .posts()
                .iter()
                .map(|p| PostEntry {
                    slug: p.slug.clone(),
                    title: p.title.clone(),
                    date: p.date.format(ISO_DATE).to_string(),
                    source: p.source.display().to_string(),
                })
                .collect();

            if json {
                out.push_str(&serde_json::to_string_pretty(&posts)?);
                out.push('\n');
            } else {
                out.push_str(&format!("Posts ({}):\n", posts.len()));
                for post in posts {
                    out.push_str(&format!(
                        "  {} - {} [{}]\n",
                        post.date, post.title, post.slug
                    ));
                }
            }
        }
        "page" | "pages" => {
            let pages: Vec<&str> = loaded.templates.page_names().collect();
            if json {
                out.push_str(&serde_json::to_string_pretty(&pages)?);
                out.push('\n');
            } else {
                out.push_str(&format!("Pages ({}):\n", pages.len()));
                for page in pages {
                    out.push_str(&format!("  {}\n", page));
                }
            }
        }
        "route" | "routes" => {
            let routes = SiteBuilder::new(loaded, base_dir).routes();
            if json {
                out.push_str(&serde_json::to_string_pretty(&routes)?);
                out.push('\n');
            } else {
                out.push_str(&format!("Routes ({}):\n", routes.len()));
                for route in routes {
                    out.push_str(&format!("  {}.html\n", route));
                }
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, page, route",
                content_type
            );
        }
    }

    Ok(out)
}
