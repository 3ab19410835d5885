// src/services/image_processor.rs
use crate::errors::TryOnError;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat, Rgba, RgbImage};
use log::info;

/// Longest side accepted by the generation model without downscaling.
pub const MAX_DIMENSION: u32 = 2048;
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, data: &[u8]) -> Result<DynamicImage, TryOnError> {
        if data.is_empty() {
            return Err(TryOnError::ImageProcessing("Uploaded photo is empty".to_string()));
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(TryOnError::ImageProcessing(format!(
                "Uploaded photo is {} bytes, limit is {}",
                data.len(),
                MAX_UPLOAD_BYTES
            )));
        }

        image::load_from_memory(data)
            .map_err(|e| TryOnError::ImageProcessing(format!("Invalid image format: {}", e)))
    }

    /// Converts to RGB8 and caps the longest side at [`MAX_DIMENSION`].
    pub fn optimize(&self, photo: DynamicImage) -> DynamicImage {
        let photo = to_rgb(photo);
        let (width, height) = photo.dimensions();
        let longest = width.max(height);

        if longest <= MAX_DIMENSION {
            return photo;
        }

        let ratio = MAX_DIMENSION as f64 / longest as f64;
        let new_width = ((width as f64 * ratio).round() as u32).max(1);
        let new_height = ((height as f64 * ratio).round() as u32).max(1);

        info!(
            "Resized image from {}x{} to {}x{}",
            width, height, new_width, new_height
        );
        photo.resize_exact(new_width, new_height, FilterType::Lanczos3)
    }

    pub fn encode_png(&self, photo: &DynamicImage) -> Result<Vec<u8>, TryOnError> {
        let mut output = Vec::new();
        photo
            .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Png)
            .map_err(|e| TryOnError::ImageProcessing(format!("Failed to encode image: {}", e)))?;

        Ok(output)
    }

    /// Decodes a generated buffer far enough to present it.
    pub fn inspect_generated(&self, data: &[u8]) -> Result<(u32, u32), TryOnError> {
        let img = image::load_from_memory(data).map_err(|e| {
            TryOnError::ImageProcessing(format!("Could not decode generated image: {}", e))
        })?;

        Ok(img.dimensions())
    }
}

fn to_rgb(photo: DynamicImage) -> DynamicImage {
    match photo {
        DynamicImage::ImageRgb8(_) => photo,
        other if other.color().has_alpha() => {
            // flatten onto white
            let rgba = other.to_rgba8();
            let (width, height) = rgba.dimensions();
            let flattened = RgbImage::from_fn(width, height, |x, y| {
                let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
                let blend = |c: u8| -> u8 {
                    let (c, a) = (c as u16, a as u16);
                    ((c * a + 255 * (255 - a)) / 255) as u8
                };
                image::Rgb([blend(r), blend(g), blend(b)])
            });
            DynamicImage::ImageRgb8(flattened)
        }
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}
