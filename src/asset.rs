use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Scheme prefix for assets shipped with the engine install; resolved
/// against the built-in asset directory.
const BUILTIN_SCHEME: &str = "rbxasset://";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("empty asset identifier")]
    EmptyIdentifier,
    #[error("unsupported asset identifier scheme in {0:?}")]
    UnsupportedScheme(String),
    #[error("asset {id:?} not found")]
    NotFound { id: String },
    #[error("failed to read asset {id:?}: {source}")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

/// A successfully fetched asset payload plus retrieval metadata.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub content_hash: String,
    pub origin_url: String,
    pub timestamp: i64,
    pub status_code: u16,
    pub byte_length: usize,
    pub payload: Vec<u8>,
}

impl FetchedAsset {
    /// Wraps a raw payload, deriving the content hash and byte length.
    pub fn from_payload(origin_url: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            content_hash: format!("{:x}", Sha256::digest(&payload)),
            origin_url: origin_url.into(),
            timestamp: 0,
            status_code: 200,
            byte_length: payload.len(),
            payload,
        }
    }
}

/// Synchronous asset retrieval keyed by an opaque identifier string.
///
/// The conversion core only cares whether a payload came back; retry and
/// backoff policy belong to implementations.
pub trait AssetSource {
    fn fetch(&self, identifier: &str) -> Result<FetchedAsset, FetchError>;
}

/// File-backed source: `rbxasset://` identifiers resolve against the
/// built-in asset directory, bare identifiers resolve as filesystem paths.
/// Other schemes (CDN identifiers and the like) are not handled here.
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    builtin_dir: PathBuf,
}

impl FileAssetSource {
    pub fn new(builtin_dir: impl Into<PathBuf>) -> Self {
        Self {
            builtin_dir: builtin_dir.into(),
        }
    }
}

impl AssetSource for FileAssetSource {
    fn fetch(&self, identifier: &str) -> Result<FetchedAsset, FetchError> {
        if identifier.is_empty() {
            return Err(FetchError::EmptyIdentifier);
        }

        let path = if let Some(rest) = identifier.strip_prefix(BUILTIN_SCHEME) {
            self.builtin_dir.join(rest)
        } else if identifier.contains("://") {
            return Err(FetchError::UnsupportedScheme(identifier.to_string()));
        } else {
            PathBuf::from(identifier)
        };

        let payload = fs::read(&path).map_err(|source| FetchError::Io {
            id: identifier.to_string(),
            source,
        })?;

        Ok(FetchedAsset::from_payload(
            path.to_string_lossy().into_owned(),
            payload,
        ))
    }
}

/// Map-backed source for tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    assets: HashMap<String, Vec<u8>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: impl Into<String>, payload: Vec<u8>) {
        self.assets.insert(identifier.into(), payload);
    }
}

impl AssetSource for MemoryAssetSource {
    fn fetch(&self, identifier: &str) -> Result<FetchedAsset, FetchError> {
        if identifier.is_empty() {
            return Err(FetchError::EmptyIdentifier);
        }
        self.assets
            .get(identifier)
            .map(|payload| FetchedAsset::from_payload(identifier, payload.clone()))
            .ok_or_else(|| FetchError::NotFound {
                id: identifier.to_string(),
            })
    }
}

/// Request-scoped fetch memoization.
///
/// Entries live for one conversion; failures are cached as well so a broken
/// identifier is only attempted once per request. There is no eviction.
#[derive(Default)]
pub struct AssetCache {
    entries: HashMap<String, Option<Arc<FetchedAsset>>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches through the cache, returning `None` for identifiers that
    /// could not be resolved.
    pub fn fetch(&mut self, source: &dyn AssetSource, identifier: &str) -> Option<Arc<FetchedAsset>> {
        if let Some(cached) = self.entries.get(identifier) {
            info!("cached asset: {identifier}");
            return cached.clone();
        }

        info!("fetch asset: {identifier}");
        let fetched = match source.fetch(identifier) {
            Ok(asset) => Some(Arc::new(asset)),
            Err(err) => {
                warn!("can't fetch asset {identifier:?}: {err}");
                None
            }
        };
        self.entries.insert(identifier.to_string(), fetched.clone());
        fetched
    }
}

/// Sniffs a payload's kind from its leading bytes and returns a file
/// extension for it: mesh payloads and KTX containers are recognized by
/// their magic, image formats are delegated to the image crate, and
/// everything else is `raw`.
pub fn detect_payload_extension(payload: &[u8]) -> &'static str {
    const KTX_MAGIC: &[u8] = b"\xabKTX 11\xbb";

    if payload.len() >= 12 && payload.starts_with(b"version ") {
        return "mesh";
    }
    if payload.starts_with(KTX_MAGIC) {
        return "ktx";
    }
    if let Ok(format) = image::guess_format(payload) {
        return format.extensions_str().first().copied().unwrap_or("raw");
    }
    "raw"
}
