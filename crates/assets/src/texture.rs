use crate::loader::ImageData;
use crate::registry::{Resource, ResourceRegistry};

/// A 2D texture.
///
/// Starts as a 1×1 opaque white placeholder and is filled in place once its
/// image arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major.
    pub pixels: Vec<u8>,
    loaded: bool,
    freed: bool,
}

impl Texture {
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_freed(&self) -> bool {
        self.freed
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Replace the placeholder with decoded image data. Ignored once freed.
    pub fn apply_image(&mut self, image: &ImageData) -> bool {
        if self.freed {
            return false;
        }
        self.width = image.width;
        self.height = image.height;
        self.pixels.clone_from(&image.pixels);
        self.loaded = true;
        true
    }
}

impl Resource for Texture {
    const KIND: &'static str = "texture";

    fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            width: 1,
            height: 1,
            pixels: vec![255; 4],
            loaded: false,
            freed: false,
        }
    }

    fn free(&mut self) {
        self.pixels = Vec::new();
        self.width = 0;
        self.height = 0;
        self.freed = true;
    }
}

pub type TextureRegistry = ResourceRegistry<Texture>;
