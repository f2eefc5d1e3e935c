use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AssetError;

/// 64-bit content fingerprint of the raw bytes an asset was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetDigest(pub u64);

impl AssetDigest {
    pub fn of(bytes: &[u8]) -> Self {
        let result = Sha256::digest(bytes);
        let mut head = [0u8; 8];
        head.copy_from_slice(&result[..8]);
        Self(u64::from_le_bytes(head))
    }
}

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decoded asset payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetData {
    Image(ImageData),
    Text(String),
    Json(serde_json::Value),
}

/// Result of a completed load, shared with event receivers.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAsset {
    pub path: String,
    pub digest: AssetDigest,
    pub data: AssetData,
}

/// Decoder for one family of file extensions.
///
/// Loaders may run on a worker thread, hence `Send + Sync`.
pub trait AssetLoader: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower-case extensions without the dot.
    fn extensions(&self) -> &[&'static str];

    fn decode(&self, path: &str, bytes: &[u8]) -> Result<AssetData, AssetError>;

    fn handles(&self, extension: &str) -> bool {
        self.extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// Decode `bytes` with `loader` and fingerprint them.
pub fn load_with(
    loader: &dyn AssetLoader,
    path: &str,
    bytes: &[u8],
) -> Result<LoadedAsset, AssetError> {
    let data = loader.decode(path, bytes)?;
    Ok(LoadedAsset {
        path: path.to_string(),
        digest: AssetDigest::of(bytes),
        data,
    })
}

/// PNG images via the `image` crate.
#[derive(Debug, Default)]
pub struct ImageLoader;

impl AssetLoader for ImageLoader {
    fn name(&self) -> &'static str {
        "image"
    }

    fn extensions(&self) -> &[&'static str] {
        &["png"]
    }

    fn decode(&self, _path: &str, bytes: &[u8]) -> Result<AssetData, AssetError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        Ok(AssetData::Image(ImageData {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        }))
    }
}

/// Shader sources, kept as UTF-8 text.
#[derive(Debug, Default)]
pub struct ShaderSourceLoader;

impl AssetLoader for ShaderSourceLoader {
    fn name(&self) -> &'static str {
        "shader-source"
    }

    fn extensions(&self) -> &[&'static str] {
        &["glsl", "vert", "frag", "wgsl"]
    }

    fn decode(&self, _path: &str, bytes: &[u8]) -> Result<AssetData, AssetError> {
        Ok(AssetData::Text(String::from_utf8(bytes.to_vec())?))
    }
}

#[derive(Debug, Default)]
pub struct JsonLoader;

impl AssetLoader for JsonLoader {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn decode(&self, _path: &str, bytes: &[u8]) -> Result<AssetData, AssetError> {
        Ok(AssetData::Json(serde_json::from_slice(bytes)?))
    }
}
