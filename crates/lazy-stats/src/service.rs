//! Request routing
//!
//! `POST /record-stat` and `GET /get-stats` hit the counter store; every
//! other `GET` is a static file under the configured root.

use crate::http::{Request, Response};
use crate::store::{StatDate, StatError, StatKind, StatStore};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Routes requests to the store or the static root
#[derive(Debug)]
pub struct StatService {
    store: StatStore,
    static_root: PathBuf,
}

impl StatService {
    /// Open the store and resolve the static root
    pub async fn bootstrap(
        stats_dir: impl Into<PathBuf>,
        static_root: impl AsRef<Path>,
    ) -> Result<Self, StatError> {
        let store = StatStore::bootstrap(stats_dir).await?;
        let static_root = smol::fs::canonicalize(static_root.as_ref()).await?;
        Ok(Self { store, static_root })
    }

    pub fn store(&self) -> &StatStore {
        &self.store
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    /// Produce the response for one request
    pub async fn handle(&self, request: &Request) -> Response {
        let method = request.method.as_str();
        let response = match request.path.as_str() {
            "/record-stat" if method == "POST" => self.record_stat(request).await,
            "/get-stats" if method == "GET" => self.get_stats(request).await,
            "/record-stat" | "/get-stats" => {
                Response::error(405, format!("{} not allowed on {}", method, request.path))
            }
            _ if method == "GET" || method == "HEAD" => self.serve_static(request).await,
            _ => Response::error(404, format!("No route for {} {}", method, request.path)),
        };
        tracing::debug!("{} {} -> {}", request.method, request.path, response.status);
        response
    }

    async fn record_stat(&self, request: &Request) -> Response {
        let result = async {
            let kind = StatKind::parse(request.query_param("type").unwrap_or_default())?;
            let date = StatDate::parse(request.query_param("date").unwrap_or_default())?;
            let count = self.store.increment(kind, &date).await?;
            Ok::<_, StatError>(serde_json::json!({
                "type": kind.as_str(),
                "date": date.as_str(),
                "count": count,
            }))
        }
        .await;
        stat_response(result)
    }

    async fn get_stats(&self, request: &Request) -> Response {
        let result = async {
            let date = StatDate::parse(request.query_param("date").unwrap_or_default())?;
            let stats = self.store.snapshot(&date).await?;
            serde_json::to_value(stats)
                .map_err(|e| StatError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
        }
        .await;
        stat_response(result)
    }

    async fn serve_static(&self, request: &Request) -> Response {
        let Some(relative) = sanitize_path(&request.path) else {
            tracing::warn!("refusing path {}", request.path);
            return Response::error(403, "Forbidden");
        };
        let mut path = self.static_root.join(relative);
        if smol::fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) {
            path.push("index.html");
        }

        // Symlinks may still point outside the root
        let resolved = match smol::fs::canonicalize(&path).await {
            Ok(resolved) if resolved.starts_with(&self.static_root) => resolved,
            Ok(_) => return Response::error(403, "Forbidden"),
            Err(_) => return Response::error(404, format!("Not found: {}", request.path)),
        };

        match smol::fs::read(&resolved).await {
            Ok(body) => {
                let body = if request.method == "HEAD" { Vec::new() } else { body };
                Response::new(200, content_type(&resolved), body)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Response::error(404, format!("Not found: {}", request.path))
            }
            Err(e) => {
                tracing::error!("reading {}: {}", resolved.display(), e);
                Response::error(500, "Internal server error")
            }
        }
    }
}

fn stat_response(result: Result<serde_json::Value, StatError>) -> Response {
    match result {
        Ok(body) => Response::json(200, &body),
        Err(e) => {
            if e.status() >= 500 {
                tracing::error!("stat request failed: {}", e);
            } else {
                tracing::debug!("stat request rejected: {}", e);
            }
            Response::error(e.status(), e)
        }
    }
}

/// Decode a request path into a root-relative path, refusing `..`
fn sanitize_path(path: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let decoded = percent_encoding::percent_decode_str(segment).decode_utf8().ok()?.into_owned();
        if decoded.contains('/') || decoded.contains('\\') || decoded.contains('\0') {
            return None;
        }
        match Path::new(&decoded).components().next() {
            Some(Component::Normal(_)) => out.push(&decoded),
            Some(Component::CurDir) => {}
            _ => return None,
        }
    }
    Some(out)
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/"), Some(PathBuf::new()));
        assert_eq!(sanitize_path("/css/site.css"), Some(PathBuf::from("css/site.css")));
        assert_eq!(sanitize_path("/a%20b.png"), Some(PathBuf::from("a b.png")));
        assert_eq!(sanitize_path("/./x"), Some(PathBuf::from("x")));
        assert_eq!(sanitize_path("/%2e%2e/secret"), None);
        assert_eq!(sanitize_path("/a%2f..%2fb"), None);
        assert_eq!(sanitize_path("/.."), None);
        assert_eq!(sanitize_path("/a&b.txt"), Some(PathBuf::from("a&b.txt")));
        assert_eq!(sanitize_path("/x=1&y+z.txt"), Some(PathBuf::from("x=1&y+z.txt")));
        assert_eq!(sanitize_path("/%ff.png"), None);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("index.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("a.svg")), "image/svg+xml");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }
}
