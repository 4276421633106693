//! Thumbnail Pipeline - Cache-first Album Art for View Items
//!
//! Album covers are cached as `<root>/<category dir>/<identifier tail>.jpg`.
//! A cache hit is attached to the item right away; a miss starts an image
//! fetch whose completion writes the file and attaches it.
//!
//! ## Overview
//!
//! ```text
//! resolve(image, uri, item, category)
//!     │
//!     ├── file exists ──────────────> item.thumbnail = path
//!     │
//!     └── image ref ──fetch_image──> on completion:
//!                                      write <path>, item.thumbnail = path
//!                                      publish ThumbnailReady
//! ```
//!
//! Fetches are keyed by cache file: items asking for a file that is already
//! being fetched wait for that fetch. A completed fetch releases its request
//! handle; fetches of a category still pending at reset are released there.
//! Fetch failures are logged and never reach the caller. A panic inside the
//! completion handler is caught.

use crate::error::{ArtworkError, Result};
use crate::items::ViewItem;
use bridge_traits::{FileSystemAccess, ImageFetcher, ImageId, RemoteError, RemoteRequest};
use bytes::Bytes;
use core_runtime::events::{ArtworkEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

const THUMB_EXTENSION: &str = "jpg";

/// Purpose-scoped cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThumbnailCategory {
    Search,
    Playlist,
    Toplist,
    NowPlaying,
}

impl ThumbnailCategory {
    pub const ALL: [ThumbnailCategory; 4] = [
        ThumbnailCategory::Search,
        ThumbnailCategory::Playlist,
        ThumbnailCategory::Toplist,
        ThumbnailCategory::NowPlaying,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            ThumbnailCategory::Search => "thumbs",
            ThumbnailCategory::Playlist => "playlistthumbs",
            ThumbnailCategory::Toplist => "toplistthumbs",
            ThumbnailCategory::NowPlaying => "currentplayingthumbs",
        }
    }
}

/// Where a resolved thumbnail comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Cached(PathBuf),
    /// A fetch was started; the path is attached when it completes.
    Requested(PathBuf),
}

/// The on-disk layout of the thumbnail cache.
#[derive(Clone)]
pub struct ThumbnailCache {
    root: PathBuf,
    fs: Arc<dyn FileSystemAccess>,
}

impl ThumbnailCache {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystemAccess>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: ThumbnailCategory) -> PathBuf {
        self.root.join(category.dir_name())
    }

    /// Cache file for `identifier`: the URI scheme is stripped and the last
    /// segment names the file.
    pub fn cache_path(&self, identifier: &str, category: ThumbnailCategory) -> PathBuf {
        let tail = identifier
            .rsplit([':', '/'])
            .next()
            .filter(|tail| !tail.is_empty())
            .unwrap_or(identifier);
        self.category_dir(category)
            .join(format!("{}.{}", tail, THUMB_EXTENSION))
    }

    pub fn contains(&self, path: &Path) -> Result<bool> {
        Ok(self.fs.exists(path)?)
    }

    /// Empty one category directory, creating it if missing.
    pub fn wipe(&self, category: ThumbnailCategory) -> Result<()> {
        let dir = self.category_dir(category);
        self.fs.wipe_dir(&dir)?;
        debug!(dir = %dir.display(), "Wiped thumbnail directory");
        Ok(())
    }

    /// Copy a cached thumbnail to another category.
    pub fn copy(&self, from: &Path, identifier: &str, to: ThumbnailCategory) -> Result<PathBuf> {
        let target = self.cache_path(identifier, to);
        if target == from || self.fs.exists(&target)? {
            return Ok(target);
        }
        let data = self.fs.read_file(from)?;
        self.write(&target, &data)?;
        Ok(target)
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let written = self.fs.write_file(path, data)?;
        if written != data.len() {
            if let Err(e) = self.fs.delete_file(path) {
                debug!(path = %path.display(), error = %e, "Failed to delete partial thumbnail");
            }
            return Err(ArtworkError::ShortWrite {
                path: path.display().to_string(),
                written,
                expected: data.len(),
            });
        }
        Ok(())
    }
}

/// One outstanding fetch and the items waiting for its file.
struct PendingFetch {
    id: u64,
    category: ThumbnailCategory,
    request: Option<Box<dyn RemoteRequest>>,
    waiting: Vec<Arc<ViewItem>>,
}

/// State shared between the pipeline and its completion handlers.
struct Shared {
    cache: ThumbnailCache,
    events: EventBus,
    next_fetch: AtomicU64,
    pending: Mutex<HashMap<PathBuf, PendingFetch>>,
}

impl Shared {
    /// Take the pending entry of fetch `id`, release its handle and store
    /// the image for every waiting item.
    fn complete(&self, path: &Path, id: u64, result: std::result::Result<Bytes, RemoteError>) -> Result<()> {
        let fetch = {
            let mut pending = self.pending.lock();
            match pending.get(path) {
                Some(fetch) if fetch.id == id => pending.remove(path),
                _ => None,
            }
        };
        let Some(fetch) = fetch else {
            debug!(path = %path.display(), "Discarding released thumbnail fetch");
            return Ok(());
        };
        if let Some(request) = fetch.request {
            request.release();
        }

        let data =
            result.map_err(|e| ArtworkError::ThumbnailFetchFailed(format!("{}: {}", path.display(), e)))?;
        let path_str = path.display().to_string();

        if !path.starts_with(self.cache.root()) || self.cache.contains(path)? {
            debug!(path = %path_str, "Discarding fetched thumbnail");
            attach(&fetch.waiting, &path_str);
            return Ok(());
        }

        self.cache.write(path, &data)?;
        attach(&fetch.waiting, &path_str);
        debug!(path = %path_str, bytes = data.len(), items = fetch.waiting.len(), "Thumbnail cached");
        self.events
            .publish(CoreEvent::Artwork(ArtworkEvent::ThumbnailReady { path: path_str }));
        Ok(())
    }

    /// Store the handle of fetch `id`, unless its completion already ran.
    fn attach_request(&self, path: &Path, id: u64, request: Box<dyn RemoteRequest>) {
        let unclaimed = {
            let mut pending = self.pending.lock();
            match pending.get_mut(path) {
                Some(fetch) if fetch.id == id => {
                    fetch.request = Some(request);
                    None
                }
                _ => Some(request),
            }
        };
        if let Some(request) = unclaimed {
            request.release();
        }
    }

    fn forget(&self, path: &Path, id: u64) {
        let mut pending = self.pending.lock();
        if pending.get(path).is_some_and(|fetch| fetch.id == id) {
            pending.remove(path);
        }
    }
}

fn attach(items: &[Arc<ViewItem>], path: &str) {
    for item in items {
        item.set_thumbnail(path.to_string());
    }
}

pub struct ThumbnailPipeline {
    shared: Arc<Shared>,
    fetcher: Arc<dyn ImageFetcher>,
}

impl ThumbnailPipeline {
    pub fn new(cache: ThumbnailCache, fetcher: Arc<dyn ImageFetcher>, events: EventBus) -> Self {
        Self {
            shared: Arc::new(Shared {
                cache,
                events,
                next_fetch: AtomicU64::new(0),
                pending: Mutex::new(HashMap::new()),
            }),
            fetcher,
        }
    }

    pub fn cache(&self) -> &ThumbnailCache {
        &self.shared.cache
    }

    pub fn cache_path(&self, identifier: &str, category: ThumbnailCategory) -> PathBuf {
        self.shared.cache.cache_path(identifier, category)
    }

    /// Attach a thumbnail to `item`, fetching it when not cached.
    ///
    /// Returns `false` only when nothing is cached and there is no image to
    /// fetch. `true` after a fetch means the fetch was started.
    pub fn resolve(
        &self,
        image: Option<&ImageId>,
        identifier: &str,
        item: &Arc<ViewItem>,
        category: ThumbnailCategory,
    ) -> bool {
        match self.request(image, identifier, item, category) {
            Ok(_) => true,
            Err(ArtworkError::NoImageReference(_)) => false,
            Err(e) => {
                warn!(uri = %identifier, error = %e, "Thumbnail request failed");
                false
            }
        }
    }

    /// Like [`ThumbnailPipeline::resolve`], reporting where the file comes
    /// from. An item whose cache file is already being fetched waits for
    /// that fetch instead of starting another.
    pub fn request(
        &self,
        image: Option<&ImageId>,
        identifier: &str,
        item: &Arc<ViewItem>,
        category: ThumbnailCategory,
    ) -> Result<ResolveOutcome> {
        let path = self.cache_path(identifier, category);

        if self.shared.cache.contains(&path)? {
            item.set_thumbnail(path.display().to_string());
            return Ok(ResolveOutcome::Cached(path));
        }

        let image = image.ok_or_else(|| ArtworkError::NoImageReference(identifier.to_string()))?;

        let id = {
            let mut pending = self.shared.pending.lock();
            if let Some(fetch) = pending.get_mut(&path) {
                fetch.waiting.push(item.clone());
                return Ok(ResolveOutcome::Requested(path));
            }
            let id = self.shared.next_fetch.fetch_add(1, Ordering::SeqCst);
            pending.insert(
                path.clone(),
                PendingFetch {
                    id,
                    category,
                    request: None,
                    waiting: vec![item.clone()],
                },
            );
            id
        };

        let shared = Arc::downgrade(&self.shared);
        let expected = path.clone();
        let done = Box::new(move |result: std::result::Result<Bytes, RemoteError>| {
            let Some(shared) = Weak::upgrade(&shared) else {
                return;
            };
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                shared.complete(&expected, id, result)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(path = %expected.display(), error = %e, "Failed to store thumbnail"),
                Err(_) => error!(path = %expected.display(), "Thumbnail handler panicked"),
            }
        });

        match self.fetcher.fetch_image(image, done) {
            Ok(handle) => {
                self.shared.attach_request(&path, id, handle);
                Ok(ResolveOutcome::Requested(path))
            }
            Err(e) => {
                self.shared.forget(&path, id);
                Err(ArtworkError::ThumbnailFetchFailed(e.to_string()))
            }
        }
    }

    /// Release pending fetches for `category` and empty its directory.
    pub fn reset(&self, category: ThumbnailCategory) -> Result<()> {
        let released: Vec<PendingFetch> = {
            let mut pending = self.shared.pending.lock();
            let paths: Vec<PathBuf> = pending
                .iter()
                .filter(|(_, fetch)| fetch.category == category)
                .map(|(path, _)| path.clone())
                .collect();
            paths.iter().filter_map(|path| pending.remove(path)).collect()
        };
        let count = released.len();
        for fetch in released {
            if let Some(request) = fetch.request {
                request.release();
            }
        }
        if count > 0 {
            debug!(?category, count, "Released image requests");
        }
        self.shared.cache.wipe(category)
    }

    pub fn reset_all(&self) -> Result<()> {
        for category in ThumbnailCategory::ALL {
            self.reset(category)?;
        }
        Ok(())
    }

    /// Fetches of `category` whose completion has not run yet.
    pub fn pending_requests(&self, category: ThumbnailCategory) -> usize {
        self.shared
            .pending
            .lock()
            .values()
            .filter(|fetch| fetch.category == category)
            .count()
    }
}
