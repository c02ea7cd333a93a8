use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops, imageops::FilterType, RgbImage};

use super::RawFrame;

/// Bounds applied to every encoded frame before dispatch.
#[derive(Debug, Clone, Copy)]
pub struct EncoderSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,
}

/// Transmittable form of one frame: base64 JPEG, no data-URL prefix.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub base64: String,
    pub width: u32,
    pub height: u32,
}

/// Encode a raw frame to a size-bounded base64 JPEG. Frames larger than
/// the configured bounds are scaled down to fit; aspect ratio is kept.
pub fn encode_frame(frame: &RawFrame, settings: &EncoderSettings) -> Result<EncodedFrame> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .context("frame buffer does not match its dimensions")?;

    let image = if frame.width > settings.max_width || frame.height > settings.max_height {
        let scale = f64::min(
            f64::from(settings.max_width) / f64::from(frame.width),
            f64::from(settings.max_height) / f64::from(frame.height),
        );
        let width = ((f64::from(frame.width) * scale) as u32).max(1);
        let height = ((f64::from(frame.height) * scale) as u32).max(1);
        imageops::resize(&image, width, height, FilterType::Triangle)
    } else {
        image
    };

    let (width, height) = image.dimensions();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, settings.jpeg_quality)
        .encode_image(&image)
        .context("jpeg encode failed")?;

    Ok(EncodedFrame {
        base64: general_purpose::STANDARD.encode(&jpeg),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    const SETTINGS: EncoderSettings = EncoderSettings {
        max_width: 640,
        max_height: 480,
        jpeg_quality: 70,
    };

    fn gradient_frame(width: u32, height: u32) -> RawFrame {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let base = ((x + y) % 256) as u8;
                pixels.extend_from_slice(&[base, base / 2, 255 - base]);
            }
        }
        RawFrame {
            width,
            height,
            pixels,
        }
    }

    #[test]
    fn encodes_to_valid_jpeg_base64() {
        let encoded = encode_frame(&gradient_frame(64, 48), &SETTINGS).unwrap();
        assert_eq!((encoded.width, encoded.height), (64, 48));
        assert!(!encoded.base64.contains(','), "no data-URL prefix expected");

        let jpeg = general_purpose::STANDARD.decode(&encoded.base64).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn oversized_frames_are_scaled_to_fit() {
        let encoded = encode_frame(&gradient_frame(1280, 960), &SETTINGS).unwrap();
        assert!(encoded.width <= SETTINGS.max_width);
        assert!(encoded.height <= SETTINGS.max_height);
        // 1280x960 shares the 4:3 aspect of the bounds.
        assert_eq!((encoded.width, encoded.height), (640, 480));
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let frame = RawFrame {
            width: 10,
            height: 10,
            pixels: vec![0; 5],
        };
        assert!(encode_frame(&frame, &SETTINGS).is_err());
    }
}
