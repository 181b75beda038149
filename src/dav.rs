use std::sync::Arc;

use reqwest_dav::list_cmd::ListEntity;
use reqwest_dav::{Auth, ClientBuilder, Depth};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::entry::{DirEntry, EntryKind};
use crate::store::Settings;

/// Failure of a remote operation. Listing errors carry the HTTP status when
/// the server produced one, so callers can tell a missing collection apart
/// from everything else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DavError {
    #[error("no server configured")]
    NotConfigured,
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl DavError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DavError::Status { status: 404, .. })
    }
}

impl From<reqwest_dav::Error> for DavError {
    fn from(err: reqwest_dav::Error) -> Self {
        match err {
            reqwest_dav::Error::Decode(reqwest_dav::DecodeError::Server(server)) => {
                DavError::Status {
                    status: server.response_code as u16,
                    message: server.message,
                }
            }
            reqwest_dav::Error::Reqwest(err) => match err.status() {
                Some(status) => DavError::Status {
                    status: status.as_u16(),
                    message: err.to_string(),
                },
                None => DavError::Transport(err.to_string()),
            },
            other => DavError::UnexpectedResponse(other.to_string()),
        }
    }
}

/// Handle on one configured server. Everything protocol-shaped lives in
/// `reqwest_dav`; this wrapper only maps paths and response shapes into the
/// crate's own types.
#[derive(Clone)]
pub struct DavClient {
    inner: Arc<reqwest_dav::Client>,
    host: String,
    prefix: String,
}

impl std::fmt::Debug for DavClient {
    // credentials stay out of logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DavClient")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl PartialEq for DavClient {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
    }
}

impl DavClient {
    /// Builds a client from saved settings. An empty URL means the user has
    /// not configured a server yet and is reported as such, not half-built.
    pub fn connect(settings: &Settings) -> Result<Self, DavError> {
        let host = settings.url.trim();
        if host.is_empty() {
            return Err(DavError::NotConfigured);
        }
        let parsed = Url::parse(host).map_err(|err| DavError::InvalidUrl(err.to_string()))?;
        let prefix = decode(parsed.path().trim_end_matches('/'));

        let auth = if settings.username.is_empty() {
            Auth::Anonymous
        } else {
            Auth::Basic(settings.username.clone(), settings.password.clone())
        };
        let inner = ClientBuilder::new()
            .set_host(host.to_string())
            .set_auth(auth)
            .build()
            .map_err(DavError::from)?;

        Ok(Self {
            inner: Arc::new(inner),
            host: host.to_string(),
            prefix,
        })
    }

    /// One PROPFIND of depth 1. The collection lists itself first; that self
    /// entry is dropped so only children remain.
    pub async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, DavError> {
        debug!(path, "listing directory");
        let raw = self
            .inner
            .list(path, Depth::Number(1))
            .await
            .map_err(DavError::from)?;

        let wanted = normalize_dir(path);
        let mut entries = Vec::with_capacity(raw.len().saturating_sub(1));
        for item in raw {
            let (href, kind, size, modified) = match item {
                ListEntity::Folder(folder) => (
                    folder.href,
                    EntryKind::Directory,
                    0,
                    Some(folder.last_modified),
                ),
                ListEntity::File(file) => (
                    file.href,
                    EntryKind::File,
                    file.content_length.max(0) as u64,
                    Some(file.last_modified),
                ),
            };
            let filename = self.filename_from_href(&href);
            if normalize_dir(&filename) == wanted {
                continue;
            }
            let basename = basename_of(&filename);
            entries.push(DirEntry {
                filename,
                basename,
                kind,
                size,
                modified,
            });
        }
        Ok(entries)
    }

    /// Streams one file into memory, reporting (loaded, total) after every
    /// chunk. Falls back to `size_hint` when the response has no length.
    pub async fn fetch_file<F>(
        &self,
        path: &str,
        size_hint: u64,
        mut on_progress: F,
    ) -> Result<Vec<u8>, DavError>
    where
        F: FnMut(u64, u64),
    {
        debug!(path, "fetching file");
        let mut response = self.inner.get(path).await.map_err(DavError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DavError::Status {
                status: status.as_u16(),
                message: status.to_string(),
            });
        }

        let total = response.content_length().unwrap_or(size_hint);
        let mut bytes = Vec::new();
        let mut loaded = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| DavError::Transport(err.to_string()))?
        {
            loaded += chunk.len() as u64;
            bytes.extend_from_slice(&chunk);
            on_progress(loaded, total.max(loaded));
        }
        Ok(bytes)
    }

    /// Maps a server href back into a path rooted at the share: percent
    /// decoding, then stripping the base path the server was mounted under.
    fn filename_from_href(&self, href: &str) -> String {
        let decoded = decode(href);
        let path = decoded.strip_prefix(&self.prefix).unwrap_or(&decoded);
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }
}

fn decode(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Collection hrefs come with a trailing slash, requested paths usually
/// without one. Compare them in a single form, keeping `/` itself intact.
fn normalize_dir(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    trimmed.to_string()
}

fn basename_of(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn settings(url: &str) -> Settings {
        Settings {
            url: url.to_string(),
            username: "user".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn empty_url_is_not_configured() {
        assert_eq!(
            DavClient::connect(&settings("")).unwrap_err(),
            DavError::NotConfigured
        );
        assert_eq!(
            DavClient::connect(&settings("   ")).unwrap_err(),
            DavError::NotConfigured
        );
    }

    #[test]
    fn garbage_url_is_rejected() {
        assert!(matches!(
            DavClient::connect(&settings("not a url")),
            Err(DavError::InvalidUrl(_))
        ));
    }

    #[test]
    fn hrefs_lose_the_mount_prefix() {
        let client = DavClient::connect(&settings("http://localhost:7086/webdav")).unwrap();
        assert_eq!(client.filename_from_href("/webdav/docs/a.txt"), "/docs/a.txt");
        assert_eq!(client.filename_from_href("/webdav/"), "/");
    }

    #[test]
    fn hrefs_are_percent_decoded() {
        let client = DavClient::connect(&settings("http://localhost:7086/")).unwrap();
        assert_eq!(
            client.filename_from_href("/with%20space.txt"),
            "/with space.txt"
        );
    }

    #[test]
    fn collection_self_entry_compares_equal() {
        assert_eq!(normalize_dir("/docs/"), normalize_dir("/docs"));
        assert_eq!(normalize_dir("/"), "/");
    }

    #[test]
    fn basenames_are_last_segments() {
        assert_eq!(basename_of("/docs/a.txt"), "a.txt");
        assert_eq!(basename_of("/docs/"), "docs");
        assert_eq!(basename_of("/"), "");
    }

    #[test]
    fn only_404_counts_as_not_found() {
        let not_found = DavError::Status {
            status: 404,
            message: "not found".to_string(),
        };
        let forbidden = DavError::Status {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert!(not_found.is_not_found());
        assert!(!forbidden.is_not_found());
        assert!(!DavError::NotConfigured.is_not_found());
    }
}
