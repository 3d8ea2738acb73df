/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Safe codec backend for PNG and TGA
//!
//! The backend is reached through [`RasterCodec`] so the bridge can be
//! pointed at another implementation, [`ImageRsCodec`] is the one used
//! by default and by the C ABI.
//!
//! # Thread safety
//! Implementations must be `Send + Sync`, a single codec instance may serve
//! concurrent calls. [`ImageRsCodec`] holds no state, every call builds its own
//! encoder or decoder from the `image` crate, which shares nothing between them.
use std::io::Cursor;

use image::io::{Limits, Reader};
use image::{ImageFormat, ImageOutputFormat, RgbaImage};
use log::trace;

use crate::errors::BridgeErrors;
use crate::options::BridgeOptions;
use crate::registry::CodecFormat;

/// Pixels recovered by a safe codec
#[derive(Debug)]
pub struct DecodedRaster {
    pub width:  u32,
    pub height: u32,
    /// 4 channel pixels, `width * height * 4` bytes
    pub pixels: Box<[u8]>
}

/// A codec that returns owned buffers and reports errors by value
pub trait RasterCodec: Send + Sync {
    /// Encode 4 channel pixels into `format`
    ///
    /// `pixels` has already been checked to be `width * height * 4` bytes.
    fn encode(
        &self, pixels: &[u8], width: u32, height: u32, format: CodecFormat
    ) -> Result<Box<[u8]>, BridgeErrors>;

    /// Decode a `format` file into 4 channel pixels
    fn decode(
        &self, data: &[u8], format: CodecFormat, options: &BridgeOptions
    ) -> Result<DecodedRaster, BridgeErrors>;
}

/// [`RasterCodec`] backed by the `image` crate
#[derive(Copy, Clone, Debug, Default)]
pub struct ImageRsCodec;

impl RasterCodec for ImageRsCodec {
    fn encode(
        &self, pixels: &[u8], width: u32, height: u32, format: CodecFormat
    ) -> Result<Box<[u8]>, BridgeErrors> {
        // the image buffer wants its own storage
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(pixels.len())
            .map_err(|_| BridgeErrors::AllocationFailure(pixels.len()))?;
        storage.extend_from_slice(pixels);

        let image = RgbaImage::from_raw(width, height, storage).ok_or_else(|| {
            BridgeErrors::MalformedInput(format!(
                "{} bytes do not cover a {}x{} image",
                pixels.len(),
                width,
                height
            ))
        })?;

        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageOutputFormat::from(format))?;

        let encoded = cursor.into_inner();
        trace!("Encoded {:?}, {} bytes", format, encoded.len());

        Ok(encoded.into_boxed_slice())
    }

    fn decode(
        &self, data: &[u8], format: CodecFormat, options: &BridgeOptions
    ) -> Result<DecodedRaster, BridgeErrors> {
        let image_format = ImageFormat::from(format);

        let (width, height) = Reader::with_format(Cursor::new(data), image_format).into_dimensions()?;
        options.check_dimensions(width, height)?;

        let mut limits = Limits::default();
        limits.max_image_width = Some(options.get_max_width());
        limits.max_image_height = Some(options.get_max_height());

        let mut reader = Reader::with_format(Cursor::new(data), image_format);
        reader.limits(limits);

        let image = reader.decode()?.into_rgba8();
        let (width, height) = image.dimensions();

        trace!("Decoded {:?}, {}x{}", format, width, height);

        Ok(DecodedRaster {
            width,
            height,
            pixels: image.into_raw().into_boxed_slice()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trip_is_exact() {
        let pixels: Vec<u8> = (0..3 * 2 * 4).map(|x| (x * 9) as u8).collect();
        let codec = ImageRsCodec;

        let png = codec.encode(&pixels, 3, 2, CodecFormat::Png).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let decoded = codec
            .decode(&png, CodecFormat::Png, &BridgeOptions::default())
            .unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(&decoded.pixels[..], &pixels[..]);
    }

    #[test]
    fn wrong_pixel_count_is_malformed() {
        let err = ImageRsCodec
            .encode(&[0; 7], 1, 2, CodecFormat::Tga)
            .unwrap_err();
        assert!(matches!(err, BridgeErrors::MalformedInput(_)));
    }

    #[test]
    fn oversized_images_are_refused() {
        let pixels = vec![255; 32 * 4 * 4];
        let png = ImageRsCodec
            .encode(&pixels, 32, 4, CodecFormat::Png)
            .unwrap();

        let options = BridgeOptions::default().set_max_width(16);
        let err = ImageRsCodec
            .decode(&png, CodecFormat::Png, &options)
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeErrors::LimitExceeded {
                width: 32,
                max_width: 16,
                ..
            }
        ));
    }
}
