/// Errors from the single-instance registry lifecycle.
///
/// Both variants signal a construction-order defect and are never recovered
/// locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{0} registry already initialized")]
    AlreadyInitialized(&'static str),
    #[error("{0} registry used before initialization")]
    Uninitialized(&'static str),
}

/// Errors from loading asset data.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("asset is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("unsupported asset: {0}")]
    Unsupported(String),
}
