//! Local preview server
//!
//! Serves the output directory. With watching on, the site is rebuilt on
//! change and open pages reload over a websocket at `/__livereload`.

use anyhow::{Context as _, Result};
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::helpers::decode_uri_component;
use crate::watch;
use crate::Blog;

const LIVE_RELOAD_PATH: &str = "/__livereload";

/// Appended to every HTML page while watching
const LIVE_RELOAD_SNIPPET: &str = r#"<script>
(function () {
  var socket = new WebSocket('ws://' + location.host + '/__livereload');
  socket.onmessage = function (event) {
    if (event.data === 'reload') location.reload();
  };
  socket.onclose = function () {
    setTimeout(function () { location.reload(); }, 1000);
  };
})();
</script>"#;

struct AppState {
    output_dir: PathBuf,
    reloads: Option<broadcast::Sender<()>>,
}

/// Serve the built site until interrupted
pub async fn start(blog: &Blog, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    let reloads = watch.then(|| broadcast::channel::<()>(16).0);

    let state = Arc::new(AppState {
        output_dir: blog.output_dir.clone(),
        reloads: reloads.clone(),
    });

    let app = Router::new()
        .route(LIVE_RELOAD_PATH, get(livereload_handler))
        .fallback(serve_output)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = bind_addr(ip, port)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let url = format!("http://{}:{}", ip, port);
    println!("Serving {} at {}", blog.output_dir.display(), url);
    println!("Press Ctrl+C to stop.");

    if let Some(tx) = reloads {
        let blog = blog.clone();
        tokio::task::spawn_blocking(move || {
            let notify_pages = || {
                // no open pages is fine
                let _ = tx.send(());
            };
            if let Err(e) = watch::rebuild_on_change(&blog, None, notify_pages) {
                tracing::error!("File watcher stopped: {:#}", e);
            }
        });
    }

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    axum::serve(listener, app).await?;
    Ok(())
}

/// `localhost` binds the IPv4 loopback
fn bind_addr(ip: &str, port: u16) -> Result<SocketAddr> {
    let host = if ip == "localhost" { "127.0.0.1" } else { ip };
    format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid address {}:{}", ip, port))
}

async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    match &state.reloads {
        Some(tx) => {
            let rx = tx.subscribe();
            ws.on_upgrade(move |socket| push_reloads(socket, rx))
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Forward rebuild notifications to one browser tab
async fn push_reloads(mut socket: WebSocket, mut rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            signal = rx.recv() => match signal {
                Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    if socket.send(Message::Text("reload".to_string())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// HTML pages get the reload snippet while watching; everything else is
/// handed to `ServeDir`
async fn serve_output(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let Some(file) = resolve_path(&state.output_dir, request.uri().path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if state.reloads.is_some() && is_html(&file) {
        return match tokio::fs::read_to_string(&file).await {
            Ok(page) => Html(with_live_reload(&page)).into_response(),
            Err(_) => StatusCode::NOT_FOUND.into_response(),
        };
    }

    let mut files = ServeDir::new(&state.output_dir).append_index_html_on_directories(true);
    match files.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!("Failed to serve {:?}: {}", file, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

/// Map a request path onto a file in the output directory.
///
/// The path is percent-decoded; `..` segments are rejected.
fn resolve_path(output_dir: &Path, uri_path: &str) -> Option<PathBuf> {
    let decoded = decode_uri_component(uri_path);
    let relative = decoded.trim_start_matches('/');

    if relative.split('/').any(|seg| seg == "..") {
        return None;
    }
    if relative.is_empty() {
        return Some(output_dir.join("index.html"));
    }

    let candidate = output_dir.join(relative);
    if candidate.is_dir() {
        return Some(candidate.join("index.html"));
    }
    if candidate.exists() {
        return Some(candidate);
    }

    // `/about` may be `about.html`
    let with_html = output_dir.join(format!("{}.html", relative));
    Some(if with_html.exists() { with_html } else { candidate })
}

/// Insert the reload snippet before `</body>`, or append it
fn with_live_reload(page: &str) -> String {
    match page.rfind("</body>") {
        Some(pos) => format!("{}{}\n{}", &page[..pos], LIVE_RELOAD_SNIPPET, &page[pos..]),
        None => format!("{}{}", page, LIVE_RELOAD_SNIPPET),
    }
}

fn open_browser(url: &str) -> Result<()> {
    let (program, args): (&str, Vec<&str>) = if cfg!(target_os = "macos") {
        ("open", vec![url])
    } else if cfg!(target_os = "windows") {
        ("cmd", vec!["/c", "start", url])
    } else {
        ("xdg-open", vec![url])
    };

    std::process::Command::new(program)
        .args(args)
        .spawn()
        .with_context(|| format!("Failed to run {}", program))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_with_live_reload() {
        let page = with_live_reload("<html><body><p>x</p></body></html>");
        assert!(page.contains(LIVE_RELOAD_PATH));
        assert!(page.ends_with("</body></html>"));
        assert!(page.find("__livereload") < page.find("</body>"));

        let bare = with_live_reload("<p>x</p>");
        assert!(bare.starts_with("<p>x</p>"));
        assert!(bare.contains(LIVE_RELOAD_PATH));
    }

    #[test]
    fn test_bind_addr() {
        assert_eq!(bind_addr("localhost", 4000).unwrap().to_string(), "127.0.0.1:4000");
        assert_eq!(bind_addr("0.0.0.0", 8080).unwrap().to_string(), "0.0.0.0:8080");
        assert!(bind_addr("not an ip", 80).is_err());
    }

    #[test]
    fn test_is_html() {
        assert!(is_html(Path::new("out/index.html")));
        assert!(is_html(Path::new("out/old.HTM")));
        assert!(!is_html(Path::new("out/atom.xml")));
    }

    #[test]
    fn test_resolve_path() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        let post_dir = out.join("posts").join("엘든링 공략");
        fs::create_dir_all(&post_dir).unwrap();
        fs::write(post_dir.join("index.html"), "post").unwrap();
        fs::write(out.join("about.html"), "about").unwrap();

        assert_eq!(resolve_path(out, "/"), Some(out.join("index.html")));
        assert_eq!(
            resolve_path(out, &crate::helpers::post_url("엘든링 공략")),
            Some(post_dir.join("index.html"))
        );
        assert_eq!(resolve_path(out, "/about"), Some(out.join("about.html")));
        assert_eq!(resolve_path(out, "/../secret"), None);
        assert_eq!(resolve_path(out, "/%2E%2E/secret"), None);
    }
}
