//! Reference-counted texture cache
//!
//! Entries are keyed by normalised name plus color key. Every successful
//! [`TextureManager::load`] adds a reference; every [`TextureManager::release`]
//! removes one. An entry at zero references stays cached until
//! [`TextureManager::cleanup`] runs and its grace period has passed, so a
//! control that hides and shows again on consecutive frames never pays for a
//! second decode.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::image_loader::{DecodedTexture, ImageData, ImageFileLoader, TextureLoader};
use super::preload::PreloadBatch;
use super::TextureError;
use crate::config::TextureConfig;

/// Handle identifying one uploaded texture frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Cache key: normalised texture name plus color key.
///
/// Equality and hashing ignore case and path separator style; the original
/// spelling is kept for filesystem lookups.
#[derive(Debug, Clone)]
pub struct TextureKey {
    normalized: String,
    source: String,
    color_key: u32,
}

impl TextureKey {
    /// Key for `name` with a color key
    pub fn new(name: &str, color_key: u32) -> Self {
        let source = name.trim().replace('\\', "/");
        Self {
            normalized: source.to_lowercase(),
            source,
            color_key,
        }
    }

    /// Key for `name` without a color key
    pub fn from_name(name: &str) -> Self {
        Self::new(name, 0)
    }

    /// Normalised name (lowercase, forward slashes)
    pub fn name(&self) -> &str {
        &self.normalized
    }

    /// Name as written in the skin
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Color key
    pub fn color_key(&self) -> u32 {
        self.color_key
    }

    /// True if no texture is named
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

impl PartialEq for TextureKey {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized && self.color_key == other.color_key
    }
}

impl Eq for TextureKey {}

impl Hash for TextureKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
        self.color_key.hash(state);
    }
}

/// Per-frame information returned by [`TextureManager::get_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Backend texture handle
    pub handle: TextureHandle,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Display time of the frame in milliseconds
    pub delay_ms: u32,
}

struct CachedFrame {
    info: FrameInfo,
    image: Arc<ImageData>,
}

struct TextureEntry {
    frames: Vec<CachedFrame>,
    loops: u32,
    ref_count: u32,
    /// Set while `ref_count == 0`; cleanup reclaims once the grace period passes
    released_at: Option<Instant>,
}

struct SearchPath {
    path: PathBuf,
    users: usize,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<TextureKey, TextureEntry>,
    pending_preload: Vec<TextureKey>,
    search_paths: Vec<SearchPath>,
    warned: HashSet<String>,
    next_handle: u32,
    decode_count: usize,
}

/// Process-wide texture cache
pub struct TextureManager {
    state: Mutex<CacheState>,
    loader: Box<dyn TextureLoader>,
    unused_grace: Duration,
}

impl TextureManager {
    /// Create a texture manager with a custom loader
    pub fn new(config: &TextureConfig, loader: Box<dyn TextureLoader>) -> Self {
        let mut state = CacheState {
            next_handle: 1, // Start from 1, reserve 0 for "no texture"
            ..CacheState::default()
        };
        for path in &config.extra_paths {
            state.search_paths.push(SearchPath {
                path: path.clone(),
                users: 1,
            });
        }

        Self {
            state: Mutex::new(state),
            loader,
            unused_grace: Duration::from_millis(config.unused_grace_ms),
        }
    }

    /// Create a texture manager reading images from disk
    pub fn with_file_loader(config: &TextureConfig) -> Self {
        Self::new(config, Box::new(ImageFileLoader))
    }

    /// Load (or re-reference) a texture and return its frame count.
    ///
    /// Returns 0 if the texture cannot be found or decoded; the failure is
    /// logged once per name and no reference is taken.
    pub fn load(&self, key: &TextureKey) -> usize {
        if key.is_empty() {
            return 0;
        }
        let mut state = self.state.lock();

        if let Some(entry) = state.entries.get_mut(key) {
            entry.ref_count += 1;
            entry.released_at = None;
            log::trace!("Texture '{}' referenced ({} refs)", key.name(), entry.ref_count);
            return entry.frames.len();
        }

        state.pending_preload.retain(|pending| pending != key);
        match self.decode_into(&mut state, key) {
            Ok(entry) => {
                let frames = entry.frames.len();
                state.entries.insert(
                    key.clone(),
                    TextureEntry {
                        ref_count: 1,
                        released_at: None,
                        ..entry
                    },
                );
                frames
            }
            Err(err) => {
                Self::warn_once(&mut state, key, &err);
                0
            }
        }
    }

    /// Frame handle and size; `None` if the texture or frame is not cached.
    ///
    /// Does not take a reference; callers must hold one from [`Self::load`].
    pub fn get_frame(&self, key: &TextureKey, index: usize) -> Option<FrameInfo> {
        let state = self.state.lock();
        state
            .entries
            .get(key)
            .and_then(|entry| entry.frames.get(index))
            .map(|frame| frame.info)
    }

    /// Pixels of one frame, for backends uploading textures
    pub fn frame_image(&self, key: &TextureKey, index: usize) -> Option<Arc<ImageData>> {
        let state = self.state.lock();
        state
            .entries
            .get(key)
            .and_then(|entry| entry.frames.get(index))
            .map(|frame| Arc::clone(&frame.image))
    }

    /// Number of times an animated texture loops (0 = forever)
    pub fn loop_count(&self, key: &TextureKey) -> u32 {
        self.state.lock().entries.get(key).map_or(0, |entry| entry.loops)
    }

    /// Drop one reference.
    ///
    /// At zero the entry becomes eligible for reclamation by [`Self::cleanup`].
    /// Releasing without a matching load is a programming error: it is
    /// logged and ignored, and `false` is returned.
    pub fn release(&self, key: &TextureKey) -> bool {
        let mut state = self.state.lock();
        match state.entries.get_mut(key) {
            Some(entry) if entry.ref_count > 0 => {
                entry.ref_count -= 1;
                if entry.ref_count == 0 {
                    entry.released_at = Some(Instant::now());
                    log::trace!("Texture '{}' unreferenced, awaiting cleanup", key.name());
                }
                true
            }
            _ => {
                log::error!("Release of texture '{}' without a matching load", key.name());
                false
            }
        }
    }

    /// Reclaim unreferenced entries whose grace period has passed at `now`.
    ///
    /// Returns the number of entries reclaimed.
    pub fn cleanup(&self, now: Instant) -> usize {
        let grace = self.unused_grace;
        self.reclaim(|released_at| now.saturating_duration_since(released_at) >= grace)
    }

    /// Reclaim every unreferenced entry regardless of grace period
    pub fn cleanup_all(&self) -> usize {
        self.reclaim(|_| true)
    }

    fn reclaim(&self, expired: impl Fn(Instant) -> bool) -> usize {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|key, entry| {
            let reclaim = entry.ref_count == 0 && entry.released_at.is_some_and(&expired);
            if reclaim {
                log::debug!("Freeing unused texture '{}'", key.name());
            }
            !reclaim
        });
        before - state.entries.len()
    }

    /// Begin collecting texture names for a batch preload
    pub fn start_preload(&self) -> PreloadBatch {
        PreloadBatch::new()
    }

    /// Queue the names of a finished batch (called by [`PreloadBatch::commit`]).
    pub(super) fn queue_preload(&self, keys: Vec<TextureKey>) {
        let mut state = self.state.lock();
        for key in keys {
            if !state.entries.contains_key(&key) && !state.pending_preload.contains(&key) {
                state.pending_preload.push(key);
            }
        }
        log::debug!("{} textures queued for preload", state.pending_preload.len());
    }

    /// Decode every queued preload name that is not cached yet.
    ///
    /// Preloaded entries start unreferenced, so names that no control ends up
    /// loading are reclaimed by the next cleanup. Returns the number decoded.
    pub fn flush_preload(&self) -> usize {
        let mut state = self.state.lock();
        let pending = std::mem::take(&mut state.pending_preload);
        let now = Instant::now();
        let mut decoded = 0;

        for key in pending {
            if state.entries.contains_key(&key) {
                continue;
            }
            match self.decode_into(&mut state, &key) {
                Ok(entry) => {
                    state.entries.insert(
                        key,
                        TextureEntry {
                            ref_count: 0,
                            released_at: Some(now),
                            ..entry
                        },
                    );
                    decoded += 1;
                }
                Err(err) => Self::warn_once(&mut state, &key, &err),
            }
        }
        decoded
    }

    /// Number of names waiting in the preload queue
    pub fn pending_preload_count(&self) -> usize {
        self.state.lock().pending_preload.len()
    }

    /// Add a texture search path; paths are reference counted
    pub fn add_texture_path(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state.lock();
        if let Some(existing) = state.search_paths.iter_mut().find(|p| p.path == path) {
            existing.users += 1;
        } else {
            state.search_paths.push(SearchPath {
                path: path.to_path_buf(),
                users: 1,
            });
        }
    }

    /// Remove one use of a texture search path
    pub fn remove_texture_path(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state.lock();
        if let Some(index) = state.search_paths.iter().position(|p| p.path == path) {
            state.search_paths[index].users -= 1;
            if state.search_paths[index].users == 0 {
                state.search_paths.remove(index);
            }
        }
    }

    /// Current reference count, `None` if not cached
    pub fn ref_count(&self, key: &TextureKey) -> Option<u32> {
        self.state.lock().entries.get(key).map(|entry| entry.ref_count)
    }

    /// True if the texture is cached (referenced or not)
    pub fn is_cached(&self, key: &TextureKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Number of cached entries
    pub fn entry_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Total number of decodes performed since creation
    pub fn decode_count(&self) -> usize {
        self.state.lock().decode_count
    }

    fn resolve(&self, state: &CacheState, key: &TextureKey) -> Option<PathBuf> {
        let name = Path::new(key.source());
        if name.is_absolute() {
            return self.loader.exists(name).then(|| name.to_path_buf());
        }
        state
            .search_paths
            .iter()
            .rev()
            .map(|search| search.path.join(name))
            .chain(std::iter::once(name.to_path_buf()))
            .find(|candidate| self.loader.exists(candidate))
    }

    fn decode_into(&self, state: &mut CacheState, key: &TextureKey) -> Result<TextureEntry, TextureError> {
        let path = self
            .resolve(state, key)
            .ok_or_else(|| TextureError::NotFound(key.source().to_string()))?;
        let DecodedTexture { frames, loops } = self.loader.decode(&path)?;
        if frames.is_empty() {
            return Err(TextureError::Decode {
                name: key.source().to_string(),
                reason: "no frames".to_string(),
            });
        }
        state.decode_count += 1;

        let frames = frames
            .into_iter()
            .map(|frame| {
                let handle = TextureHandle(state.next_handle);
                state.next_handle += 1;
                CachedFrame {
                    info: FrameInfo {
                        handle,
                        width: frame.image.width,
                        height: frame.image.height,
                        delay_ms: frame.delay_ms,
                    },
                    image: Arc::new(frame.image),
                }
            })
            .collect::<Vec<_>>();

        log::debug!("Decoded texture '{}' ({} frames) from {:?}", key.name(), frames.len(), path);
        Ok(TextureEntry {
            frames,
            loops,
            ref_count: 0,
            released_at: None,
        })
    }

    fn warn_once(state: &mut CacheState, key: &TextureKey, err: &TextureError) {
        if state.warned.insert(key.name().to_string()) {
            log::warn!("Texture '{}' unavailable: {}", key.source(), err);
        }
    }
}

impl std::fmt::Debug for TextureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureManager")
            .field("entries", &self.entry_count())
            .field("unused_grace", &self.unused_grace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::textures::DecodedFrame;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory loader: every name in `files` exists and decodes to `frames` frames
    pub(crate) struct MemoryLoader {
        files: HashMap<String, usize>,
        pub(crate) decodes: AtomicUsize,
    }

    impl MemoryLoader {
        pub(crate) fn new(files: &[(&str, usize)]) -> Self {
            Self {
                files: files.iter().map(|(name, frames)| ((*name).to_string(), *frames)).collect(),
                decodes: AtomicUsize::new(0),
            }
        }
    }

    impl TextureLoader for MemoryLoader {
        fn exists(&self, path: &Path) -> bool {
            self.files.contains_key(path.to_string_lossy().as_ref())
        }

        fn decode(&self, path: &Path) -> Result<DecodedTexture, TextureError> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            let frames = *self
                .files
                .get(path.to_string_lossy().as_ref())
                .ok_or_else(|| TextureError::NotFound(path.display().to_string()))?;
            Ok(DecodedTexture {
                frames: (0..frames)
                    .map(|_| DecodedFrame {
                        image: ImageData::solid_color(2, 2, [255, 255, 255, 255]),
                        delay_ms: 100,
                    })
                    .collect(),
                loops: 0,
            })
        }
    }

    pub(crate) fn manager_with(files: &[(&str, usize)]) -> TextureManager {
        let config = TextureConfig {
            unused_grace_ms: 0,
            extra_paths: Vec::new(),
        };
        TextureManager::new(&config, Box::new(MemoryLoader::new(files)))
    }

    #[test]
    fn test_load_release_balances_ref_count() {
        let manager = manager_with(&[("bg.png", 1)]);
        let key = TextureKey::from_name("bg.png");

        for _ in 0..3 {
            assert_eq!(manager.load(&key), 1);
        }
        assert_eq!(manager.ref_count(&key), Some(3));
        for _ in 0..3 {
            assert!(manager.release(&key));
        }
        assert_eq!(manager.ref_count(&key), Some(0));
        assert_eq!(manager.decode_count(), 1);

        // Eligible, and reclaimed only by an explicit cleanup
        assert!(manager.is_cached(&key));
        assert_eq!(manager.cleanup_all(), 1);
        assert!(!manager.is_cached(&key));
    }

    #[test]
    fn test_unmatched_release_is_rejected() {
        let manager = manager_with(&[("bg.png", 1)]);
        let key = TextureKey::from_name("bg.png");
        assert!(!manager.release(&key));

        manager.load(&key);
        assert!(manager.release(&key));
        assert!(!manager.release(&key));
        assert_eq!(manager.ref_count(&key), Some(0));
    }

    #[test]
    fn test_names_are_case_and_separator_insensitive() {
        let manager = manager_with(&[("media/BG.png", 1)]);
        let a = TextureKey::from_name("media/BG.png");
        let b = TextureKey::from_name("MEDIA\\bg.PNG");
        assert_eq!(a, b);

        manager.load(&a);
        assert_eq!(manager.load(&b), 1);
        assert_eq!(manager.ref_count(&a), Some(2));
    }

    #[test]
    fn test_color_key_distinguishes_entries() {
        let manager = manager_with(&[("bg.png", 1)]);
        manager.load(&TextureKey::new("bg.png", 0));
        manager.load(&TextureKey::new("bg.png", 0xff00_ff00));
        assert_eq!(manager.entry_count(), 2);
    }

    #[test]
    fn test_missing_texture_returns_zero_frames() {
        let manager = manager_with(&[]);
        let key = TextureKey::from_name("missing.png");
        assert_eq!(manager.load(&key), 0);
        assert_eq!(manager.load(&key), 0);
        assert!(manager.get_frame(&key, 0).is_none());
        assert_eq!(manager.ref_count(&key), None);
    }

    #[test]
    fn test_animated_frames() {
        let manager = manager_with(&[("spinner.gif", 4)]);
        let key = TextureKey::from_name("spinner.gif");
        assert_eq!(manager.load(&key), 4);

        let first = manager.get_frame(&key, 0).unwrap();
        let last = manager.get_frame(&key, 3).unwrap();
        assert_ne!(first.handle, last.handle);
        assert_eq!(last.delay_ms, 100);
        assert!(manager.get_frame(&key, 4).is_none());
    }

    #[test]
    fn test_cleanup_respects_grace_period() {
        let config = TextureConfig {
            unused_grace_ms: 60_000,
            extra_paths: Vec::new(),
        };
        let manager = TextureManager::new(&config, Box::new(MemoryLoader::new(&[("bg.png", 1)])));
        let key = TextureKey::from_name("bg.png");

        manager.load(&key);
        manager.release(&key);
        assert_eq!(manager.cleanup(Instant::now()), 0);
        assert!(manager.is_cached(&key));

        // Re-referencing inside the grace period reuses the cached decode
        assert_eq!(manager.load(&key), 1);
        assert_eq!(manager.decode_count(), 1);

        manager.release(&key);
        assert_eq!(manager.cleanup(Instant::now() + Duration::from_secs(61)), 1);
    }

    #[test]
    fn test_referenced_textures_are_never_reclaimed() {
        let manager = manager_with(&[("bg.png", 1)]);
        let key = TextureKey::from_name("bg.png");
        manager.load(&key);
        assert_eq!(manager.cleanup_all(), 0);
        assert_eq!(manager.ref_count(&key), Some(1));
    }

    #[test]
    fn test_search_paths_are_reference_counted() {
        let manager = manager_with(&[("addon/media/icon.png", 1)]);
        let key = TextureKey::from_name("icon.png");

        assert_eq!(manager.load(&key), 0);

        manager.add_texture_path("addon/media");
        manager.add_texture_path("addon/media");
        manager.remove_texture_path("addon/media");
        assert_eq!(manager.load(&key), 1);

        manager.remove_texture_path("addon/media");
        let other = TextureKey::from_name("ICON.png");
        // Still cached under the same key even though the path is gone
        assert_eq!(manager.load(&other), 1);
    }

    #[test]
    fn test_preload_batch_decodes_once_before_load() {
        let manager = manager_with(&[("a.png", 1), ("b.png", 1)]);

        let mut batch = manager.start_preload();
        batch.register(TextureKey::from_name("a.png"));
        batch.register(TextureKey::from_name("A.png"));
        batch.register(TextureKey::from_name("b.png"));
        batch.register(TextureKey::from_name("missing.png"));
        assert_eq!(batch.len(), 3);

        batch.commit(&manager);
        assert_eq!(manager.decode_count(), 0, "commit only registers intent");
        assert_eq!(manager.pending_preload_count(), 3);

        assert_eq!(manager.flush_preload(), 2);
        assert_eq!(manager.decode_count(), 2);

        let a = TextureKey::from_name("a.png");
        assert_eq!(manager.load(&a), 1);
        assert_eq!(manager.decode_count(), 2, "load reuses the preloaded decode");
        assert_eq!(manager.ref_count(&a), Some(1));

        // b was preloaded but never claimed, so cleanup reclaims it
        assert_eq!(manager.cleanup_all(), 1);
        assert!(manager.is_cached(&a));
    }
}
