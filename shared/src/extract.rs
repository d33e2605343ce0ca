/// Archive bundle extraction and media discovery.
///
/// Individual-stream archives are delivered by the platform as a zip bundle
/// holding one `.webm` track per stream. The extractor downloads a bundle,
/// unpacks it under its own directory inside the shared extraction root and
/// reports every media file as a `/extracted/...` URL that the static file
/// responder can serve.
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::ExtractError;
use crate::models::ExtractedFile;

/// Extension (compared case-insensitively) of the platform's media container.
pub const MEDIA_EXTENSION: &str = ".webm";

/// URL prefix under which the extraction root is served.
pub const STATIC_PREFIX: &str = "/extracted";

/// Source of bundle bytes.
#[async_trait]
pub trait BundleFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ExtractError>;
}

/// Fetches bundles over HTTP with a bounded request time.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BundleFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ExtractError> {
        let resp = self.client.get(url).send().await.map_err(|e| ExtractError::Fetch {
            status: e.status().map(|s| s.as_u16()),
            message: if e.is_timeout() {
                format!("Timed out fetching {}", url)
            } else {
                e.to_string()
            },
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.trim().chars().take(200).collect();
            warn!("Bundle fetch returned {}: {}", status, detail);
            return Err(ExtractError::Fetch {
                status: Some(status.as_u16()),
                message: if detail.is_empty() {
                    format!("Request failed with status code {}", status.as_u16())
                } else {
                    format!("Request failed with status code {}: {}", status.as_u16(), detail)
                },
            });
        }

        let bytes = resp.bytes().await.map_err(|e| ExtractError::Fetch {
            status: Some(status.as_u16()),
            message: format!("Failed to read bundle body: {}", e),
        })?;
        Ok(bytes.to_vec())
    }
}

/// Unpacks bundles into per-archive directories under a shared root.
pub struct BundleExtractor {
    root: PathBuf,
    fetcher: Arc<dyn BundleFetcher>,
    /// Per-folder locks so two requests for the same archive do not interleave.
    locks: FolderLocks,
}

type FolderLocks = Arc<parking_lot::Mutex<HashMap<String, FolderSlot>>>;

/// A folder's lock plus the number of requests currently holding a lease on it.
struct FolderSlot {
    lock: Arc<Mutex<()>>,
    leases: usize,
}

/// Keeps a folder's slot alive; the slot is dropped with its last lease,
/// whether the request finished or was cancelled.
struct FolderLease {
    locks: FolderLocks,
    folder: String,
    lock: Arc<Mutex<()>>,
}

impl FolderLease {
    fn acquire(locks: &FolderLocks, folder: &str) -> Self {
        let mut map = locks.lock();
        let slot = map.entry(folder.to_string()).or_insert_with(|| FolderSlot {
            lock: Arc::new(Mutex::new(())),
            leases: 0,
        });
        slot.leases += 1;
        Self {
            locks: locks.clone(),
            folder: folder.to_string(),
            lock: slot.lock.clone(),
        }
    }
}

impl Drop for FolderLease {
    fn drop(&mut self) {
        let mut map = self.locks.lock();
        if let Some(slot) = map.get_mut(&self.folder) {
            slot.leases -= 1;
            if slot.leases == 0 {
                map.remove(&self.folder);
            }
        }
    }
}

impl BundleExtractor {
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn BundleFetcher>) -> Self {
        Self {
            root: root.into(),
            fetcher,
            locks: Arc::new(parking_lot::Mutex::new(HashMap::new())),
        }
    }

    /// Directory that `/extracted/` URLs resolve against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fetch, unpack and scan one bundle.
    ///
    /// Any previous extraction under the same folder is deleted first. Fails
    /// with `NotFound` when the bundle unpacks cleanly but holds no media.
    pub async fn extract(
        &self,
        url: Option<&str>,
        archive_id: Option<&str>,
    ) -> Result<Vec<ExtractedFile>, ExtractError> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ExtractError::Validation("Archive URL is required".to_string()))?;
        let folder = folder_name(archive_id)?;

        let bytes = self.fetcher.fetch(url).await?;
        info!("Fetched bundle for {} ({} bytes)", folder, bytes.len());

        // The guard and lease move into the blocking task so the folder stays
        // locked until unpacking ends, even if this request is dropped.
        let lease = FolderLease::acquire(&self.locks, &folder);
        let guard = lease.lock.clone().lock_owned().await;
        let root = self.root.clone();
        let target = folder.clone();
        let files = tokio::task::spawn_blocking(move || {
            let files = unpack_and_discover(&root, &target, &bytes);
            drop(guard);
            drop(lease);
            files
        })
        .await
        .map_err(|e| ExtractError::Unpack(format!("Extraction task failed: {}", e)))??;

        if files.is_empty() {
            warn!("Bundle {} contained no {} files", folder, MEDIA_EXTENSION);
            return Err(ExtractError::NotFound);
        }

        info!("Extracted {} media files into {}", files.len(), folder);
        Ok(files)
    }
}

/// Folder for a bundle: the caller's archive id, or a fresh time-based name.
fn folder_name(archive_id: Option<&str>) -> Result<String, ExtractError> {
    match archive_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => {
            if id == "." || id == ".." || id.contains('/') || id.contains('\\') {
                return Err(ExtractError::Validation(format!("Invalid archiveId: {}", id)));
            }
            Ok(id.to_string())
        }
        None => {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            Ok(format!("archive_{}_{}", Utc::now().timestamp_millis(), &suffix[..8]))
        }
    }
}

/// Reset the destination, unpack the zip into it and collect media files.
fn unpack_and_discover(
    root: &Path,
    folder: &str,
    bytes: &[u8],
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let dest = root.join(folder);
    if dest.exists() {
        debug!("Replacing existing extraction at {}", dest.display());
        std::fs::remove_dir_all(&dest)?;
    }
    std::fs::create_dir_all(&dest)?;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Unpack(e.to_string()))?;
    archive
        .extract(&dest)
        .map_err(|e| ExtractError::Unpack(e.to_string()))?;

    discover(root, &dest)
}

/// Walk `dir` depth-first, sorted by name within each directory, collecting
/// media files with URLs relative to `root`.
fn discover(root: &Path, dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        if !is_media_file(&filename) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| ExtractError::Unpack(e.to_string()))?;
        let url = format!("{}/{}", STATIC_PREFIX, url_path(relative));
        debug!("Found media file {}", url);
        files.push(ExtractedFile { filename, url });
    }
    Ok(files)
}

fn is_media_file(name: &str) -> bool {
    name.to_lowercase().ends_with(MEDIA_EXTENSION)
}

/// Join path components with `/` whatever the host separator is.
fn url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
