//! Platform abstraction layer
//!
//! Asset fetching is the one place themes suspend. Sources hand back boxed
//! futures so a browser fetch and a native file read share one interface.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Asset fetch errors
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("failed to read asset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("asset is empty: {0}")]
    Empty(String),
}

/// Future returned by an asset fetch
pub type AssetFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, AssetError>> + 'a>>;

/// Where theme assets come from
pub trait AssetSource {
    fn fetch<'a>(&'a self, path: &'a str) -> AssetFuture<'a>;
}

/// Assets held in memory, keyed by path
#[derive(Debug, Default, Clone)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&mut self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.to_string(), bytes.into());
    }
}

impl AssetSource for MemoryAssets {
    fn fetch<'a>(&'a self, path: &'a str) -> AssetFuture<'a> {
        Box::pin(async move {
            match self.files.get(path) {
                Some(bytes) if bytes.is_empty() => Err(AssetError::Empty(path.to_string())),
                Some(bytes) => Ok(bytes.clone()),
                None => Err(AssetError::NotFound(path.to_string())),
            }
        })
    }
}

/// Assets read from a directory on disk
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl DirAssets {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetSource for DirAssets {
    fn fetch<'a>(&'a self, path: &'a str) -> AssetFuture<'a> {
        Box::pin(async move {
            let full = self.root.join(path);
            match std::fs::read(&full) {
                Ok(bytes) if bytes.is_empty() => Err(AssetError::Empty(path.to_string())),
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(AssetError::NotFound(path.to_string()))
                }
                Err(source) => Err(AssetError::Io {
                    path: path.to_string(),
                    source,
                }),
            }
        })
    }
}

/// Install the platform logger
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    env_logger::init();
}

/// Install the platform logger and panic hook
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}
