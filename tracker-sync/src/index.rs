//! Helm repository index loader.
//!
//! Remote repositories (`http://`, `https://`) are fetched from
//! `<url>/index.yaml`; `file://` URLs and plain paths are read from disk,
//! either as a directory holding `index.yaml` or as the index file itself.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use tracker_core::types::{Index, RepositoryDescriptor, RepositoryKind};

use crate::error::{io_err, SyncError};
use crate::source::IndexLoader;

pub const INDEX_FILE: &str = "index.yaml";

/// Where a repository's index lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexLocation {
    Remote(String),
    Local(PathBuf),
}

impl IndexLocation {
    pub fn for_url(url: &str) -> Self {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Self::Remote(format!("{}/{INDEX_FILE}", url.trim_end_matches('/')));
        }
        Self::Local(PathBuf::from(url.strip_prefix("file://").unwrap_or(url)))
    }
}

/// [`IndexLoader`] for Helm chart repositories.
#[derive(Clone)]
pub struct ManifestIndexLoader {
    agent: ureq::Agent,
}

impl ManifestIndexLoader {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

#[async_trait]
impl IndexLoader for ManifestIndexLoader {
    async fn load(&self, repository: &RepositoryDescriptor) -> Result<Index, SyncError> {
        if repository.kind != RepositoryKind::Helm {
            return Err(SyncError::UnsupportedKind(repository.kind));
        }
        match IndexLocation::for_url(&repository.url) {
            IndexLocation::Remote(url) => {
                let agent = self.agent.clone();
                let fetched = url.clone();
                let body = tokio::task::spawn_blocking(move || fetch(&agent, &fetched))
                    .await
                    .map_err(|err| SyncError::Join(err.to_string()))??;
                parse_index(&url, &body)
            }
            IndexLocation::Local(path) => {
                let (file, body) = read_local(path).await?;
                parse_index(&file.display().to_string(), &body)
            }
        }
    }
}

/// Parse an index manifest; `location` only labels errors.
pub fn parse_index(location: &str, body: &str) -> Result<Index, SyncError> {
    serde_yaml::from_str(body).map_err(|source| SyncError::IndexParse {
        location: location.to_string(),
        source,
    })
}

fn fetch(agent: &ureq::Agent, url: &str) -> Result<String, SyncError> {
    let http_err = |message: String| SyncError::Http {
        url: url.to_string(),
        message,
    };
    let response = agent.get(url).call().map_err(|e| http_err(e.to_string()))?;
    response.into_string().map_err(|e| http_err(e.to_string()))
}

async fn read_local(path: PathBuf) -> Result<(PathBuf, String), SyncError> {
    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|e| io_err(&path, e))?;
    let file = if meta.is_dir() {
        path.join(INDEX_FILE)
    } else {
        path
    };
    let body = tokio::fs::read_to_string(&file)
        .await
        .map_err(|e| io_err(&file, e))?;
    Ok((file, body))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tracker_core::types::RepositoryId;

    use super::*;

    const INDEX: &str = r#"
apiVersion: v1
entries:
  nginx:
    - name: nginx
      version: 1.2.0
      digest: abc
"#;

    fn repo(url: &str, kind: RepositoryKind) -> RepositoryDescriptor {
        RepositoryDescriptor {
            id: RepositoryId::from("r1"),
            name: "r1".to_string(),
            url: url.to_string(),
            kind,
            created_at: Utc::now(),
        }
    }

    fn loader() -> ManifestIndexLoader {
        ManifestIndexLoader::new(Duration::from_secs(5))
    }

    /// Serve one canned HTTP response and report the request line.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, Arc<tokio::sync::Mutex<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let seen = Arc::new(tokio::sync::Mutex::new(String::new()));
        let record = seen.clone();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await.expect("read");
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            *record.lock().await = request.lines().next().unwrap_or_default().to_string();
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.expect("write");
        });
        (format!("http://{addr}"), seen)
    }

    #[test]
    fn location_for_remote_and_local_urls() {
        assert_eq!(
            IndexLocation::for_url("https://charts.example.com/stable/"),
            IndexLocation::Remote("https://charts.example.com/stable/index.yaml".to_string())
        );
        assert_eq!(
            IndexLocation::for_url("file:///srv/charts"),
            IndexLocation::Local(PathBuf::from("/srv/charts"))
        );
        assert_eq!(
            IndexLocation::for_url("/srv/charts"),
            IndexLocation::Local(PathBuf::from("/srv/charts"))
        );
    }

    #[tokio::test]
    async fn loads_index_from_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), INDEX).unwrap();

        let index = loader()
            .load(&repo(&dir.path().display().to_string(), RepositoryKind::Helm))
            .await
            .expect("load");
        assert_eq!(index.entries["nginx"][0].digest, "abc");
    }

    #[tokio::test]
    async fn loads_index_from_file_url() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("custom.yaml");
        std::fs::write(&file, INDEX).unwrap();

        let url = format!("file://{}", file.display());
        let index = loader()
            .load(&repo(&url, RepositoryKind::Helm))
            .await
            .expect("load");
        assert_eq!(index.version_count(), 1);
    }

    #[tokio::test]
    async fn missing_index_is_io_error_with_path() {
        let dir = TempDir::new().unwrap();
        let err = loader()
            .load(&repo(&dir.path().display().to_string(), RepositoryKind::Helm))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }), "got: {err}");
        assert!(err.to_string().contains(INDEX_FILE));
    }

    #[tokio::test]
    async fn malformed_index_is_parse_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "entries: [unclosed").unwrap();
        let err = loader()
            .load(&repo(&dir.path().display().to_string(), RepositoryKind::Helm))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::IndexParse { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn non_helm_kinds_are_rejected() {
        let err = loader()
            .load(&repo("/srv/rules", RepositoryKind::Falco))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::UnsupportedKind(RepositoryKind::Falco)));
    }

    #[tokio::test]
    async fn fetches_remote_index_over_http() {
        let (base, seen) = serve_once("200 OK", INDEX).await;
        let index = loader()
            .load(&repo(&base, RepositoryKind::Helm))
            .await
            .expect("load");
        assert_eq!(index.entries["nginx"][0].version, "1.2.0");
        assert!(seen.lock().await.starts_with("GET /index.yaml"));
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let (base, _) = serve_once("404 Not Found", "missing").await;
        let err = loader()
            .load(&repo(&base, RepositoryKind::Helm))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Http { .. }), "got: {err}");
        assert!(err.to_string().contains("index.yaml"));
    }
}
