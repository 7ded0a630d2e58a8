use crate::storage::StorageDriver;

#[cfg(feature = "image")]
use image::GenericImageView;
#[cfg(feature = "image")]
use image::imageops::FilterType;

/// Display area of the image viewer page.
pub const DEFAULT_VIEW_SIZE: [u32; 2] = [480, 272];

/// RGBA8 image ready for the viewer page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

/// Image decoding seam. Runs on the filesystem owner thread.
pub trait ImageDecoder: Send {
    /// Read `path` from `storage` and decode it.
    fn decode(&mut self, storage: &mut dyn StorageDriver, path: &str)
    -> Result<DecodedImage, String>;
}

/// Decoder for builds without image support.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedImageDecoder;

impl ImageDecoder for UnsupportedImageDecoder {
    fn decode(
        &mut self,
        _storage: &mut dyn StorageDriver,
        path: &str,
    ) -> Result<DecodedImage, String> {
        Err(format!("decode {path}: image support not enabled"))
    }
}

/// Decoder using the `image` crate (PNG + JPEG).
///
/// Images larger than `max_size` are scaled down to fit, never up.
#[cfg(feature = "image")]
#[derive(Clone, Debug)]
pub struct ImageCrateDecoder {
    /// Bounding box of the decoded image.
    pub max_size: [u32; 2],
    /// Downscale filter.
    pub filter: FilterType,
}

#[cfg(feature = "image")]
impl Default for ImageCrateDecoder {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_VIEW_SIZE,
            filter: FilterType::Triangle,
        }
    }
}

#[cfg(feature = "image")]
impl ImageDecoder for ImageCrateDecoder {
    fn decode(
        &mut self,
        storage: &mut dyn StorageDriver,
        path: &str,
    ) -> Result<DecodedImage, String> {
        let bytes = storage
            .read_file(path)
            .map_err(|e| format!("read {path}: {e}"))?;
        let mut img =
            image::load_from_memory(&bytes).map_err(|e| format!("decode {path}: {e}"))?;

        let max_w = self.max_size[0].max(1);
        let max_h = self.max_size[1].max(1);
        let (w, h) = img.dimensions();
        if w > max_w || h > max_h {
            img = img.resize(max_w, max_h, self.filter);
        }

        let rgba = img.to_rgba8();
        Ok(DecodedImage {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    }
}

/// Decoder selected by the enabled cargo features.
pub fn default_decoder() -> Box<dyn ImageDecoder> {
    #[cfg(feature = "image")]
    {
        Box::new(ImageCrateDecoder::default())
    }
    #[cfg(not(feature = "image"))]
    {
        Box::new(UnsupportedImageDecoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_storage::MemStorage;

    #[test]
    fn unsupported_decoder_reports_path() {
        let mut storage = MemStorage::new();
        let err = UnsupportedImageDecoder
            .decode(&mut storage, "/a.jpg")
            .unwrap_err();
        assert!(err.contains("/a.jpg"));
    }

    #[cfg(feature = "image")]
    #[test]
    fn decodes_and_downscales_png() {
        use image::codecs::png::PngEncoder;
        use image::{ColorType, ImageEncoder, RgbaImage};

        let mut img = RgbaImage::new(16, 8);
        for p in img.pixels_mut() {
            *p = image::Rgba([10, 20, 30, 40]);
        }
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(&img, img.width(), img.height(), ColorType::Rgba8.into())
            .unwrap();

        let mut storage = MemStorage::new();
        storage.insert_file_with_data("/pic.png", bytes, 0, 0);
        let mut decoder = ImageCrateDecoder {
            max_size: [8, 8],
            ..Default::default()
        };
        let out = decoder.decode(&mut storage, "/pic.png").unwrap();
        assert!(out.width <= 8);
        assert!(out.height <= 8);
        assert_eq!(out.rgba.len() as u32, out.width * out.height * 4);

        storage.insert_file("/broken.jpg", 12, 0, 0);
        assert!(decoder.decode(&mut storage, "/broken.jpg").is_err());
    }
}
