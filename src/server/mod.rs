//! Development server with live reload
//!
//! Pages are composed on request from an in-memory snapshot of the site.
//! With live reload on, the snapshot is rebuilt whenever posts, pages, public
//! assets or the configuration change, and connected browsers refresh.

use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::composer::{Composed, PageContext, INDEX};
use crate::config::SiteConfig;
use crate::helpers::inject_live_reload;
use crate::{LoadedSite, Site, CONFIG_FILE};

/// Server state
struct ServerState {
    base_dir: PathBuf,
    site: RwLock<Arc<LoadedSite>>,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

impl ServerState {
    fn new(base_dir: PathBuf, site: LoadedSite, live_reload: bool) -> Self {
        let (reload_tx, _) = broadcast::channel::<()>(16);
        Self {
            base_dir,
            site: RwLock::new(Arc::new(site)),
            reload_tx,
            live_reload,
        }
    }

    /// Current snapshot. Requests keep theirs even if a reload swaps it.
    fn snapshot(&self) -> Arc<LoadedSite> {
        let guard = self.site.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Reload configuration, templates and posts into a fresh snapshot.
    /// On failure the previous snapshot stays in place.
    fn reload(&self) -> crate::Result<()> {
        let fresh = Site::new(&self.base_dir)?.load()?;
        let mut guard = self.site.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(fresh);
        Ok(())
    }
}

/// URL prefix every page lives under: `""` for a site served at `/`,
/// otherwise e.g. `/blog`
fn mount_prefix(config: &SiteConfig) -> String {
    config.url_for(INDEX).trim_end_matches('/').to_string()
}

/// Map a request path to a page identifier: `{prefix}/` is the home page, and
/// `{prefix}/{id}`, `{prefix}/{id}/` and `{prefix}/{id}.html` all name page
/// `id`. Paths outside the prefix name no page.
pub fn page_id_for_path(path: &str, prefix: &str) -> Option<String> {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let id: &str = &decoded;

    let id = match id.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return None,
    };
    let id = id.strip_prefix('/').unwrap_or(id);
    let id = id.strip_suffix('/').unwrap_or(id);

    let id = match id.rfind('.') {
        Some(dot) if !id[dot..].contains('/') => &id[..dot],
        _ => id,
    };

    if id.is_empty() {
        Some(INDEX.to_string())
    } else {
        Some(id.to_string())
    }
}

/// Response for a page request
#[derive(Debug, PartialEq, Eq)]
pub enum PageResponse {
    Page(String),
    NotFound,
    Error(String),
}

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        match self {
            PageResponse::Page(html) => Html(html).into_response(),
            PageResponse::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            PageResponse::Error(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

/// Compose the page a request path refers to
pub fn respond(site: &LoadedSite, path: &str) -> PageResponse {
    let Some(page_id) = page_id_for_path(path, &mount_prefix(&site.config)) else {
        tracing::debug!("{} is outside the site root", path);
        return PageResponse::NotFound;
    };
    match site.composer().compose(&page_id, &PageContext::serve()) {
        Ok(Composed::Document(html)) => PageResponse::Page(html),
        Ok(Composed::NotFound) => {
            tracing::debug!("No page for {}", path);
            PageResponse::NotFound
        }
        Err(e) => {
            tracing::error!("Failed to compose {}: {}", page_id, e);
            PageResponse::Error(e.to_string())
        }
    }
}

/// Start the development server
pub async fn start(site: &Site, ip: &str, port: u16, watch: bool) -> Result<()> {
    let loaded = site.load()?;
    let state = Arc::new(ServerState::new(site.base_dir.clone(), loaded, watch));

    let public_dir = site.base_dir.join("public");
    let app = Router::new()
        .route("/__livereload", get(livereload_handler))
        .route("/favicon.ico", get(favicon_handler))
        .nest_service(
            &format!("{}/public", mount_prefix(&site.config)),
            ServeDir::new(&public_dir),
        )
        .fallback(page_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::clone(&state));

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if watch {
        let watched = watched_paths(site);
        let state = Arc::clone(&state);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_reload(watched, state) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Everything whose change should refresh connected browsers
fn watched_paths(site: &Site) -> Vec<(PathBuf, RecursiveMode)> {
    vec![
        (site.posts_dir.clone(), RecursiveMode::Recursive),
        (site.pages_dir.clone(), RecursiveMode::Recursive),
        (site.base_dir.join("public"), RecursiveMode::Recursive),
        (site.base_dir.join(CONFIG_FILE), RecursiveMode::NonRecursive),
    ]
}

/// Watch for file changes and reload the snapshot. Blocks the calling thread.
fn watch_and_reload(
    watched: Vec<(PathBuf, RecursiveMode)>,
    state: Arc<ServerState>,
) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Create debouncer to avoid multiple rapid reloads
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    for (path, mode) in &watched {
        if path.exists() {
            debouncer.watcher().watch(path, *mode)?;
            tracing::debug!("Watching: {:?}", path);
        }
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                // Filter out editor and OS noise
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        let name = e
                            .path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_default();
                        !name.starts_with('.') && !name.ends_with('~')
                    })
                    .collect();

                if relevant.is_empty() {
                    continue;
                }

                for event in &relevant {
                    tracing::info!("File changed: {}", event.path.display());
                }

                match state.reload() {
                    Ok(()) => {
                        tracing::info!("Reloaded site");
                        // No receivers just means no browser is connected
                        let _ = state.reload_tx.send(());
                    }
                    Err(e) => {
                        tracing::error!("Reload failed, keeping previous version: {}", e);
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Serve `favicon.ico` from the site directory, or nothing
async fn favicon_handler(State(state): State<Arc<ServerState>>) -> Response {
    match tokio::fs::read(state.base_dir.join("favicon.ico")).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/x-icon")], bytes).into_response(),
        Err(_) => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Every other path is a page
async fn page_handler(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    let site = state.snapshot();
    match respond(&site, uri.path()) {
        PageResponse::Page(html) if state.live_reload => {
            Html(inject_live_reload(&html)).into_response()
        }
        response => response.into_response(),
    }
}
