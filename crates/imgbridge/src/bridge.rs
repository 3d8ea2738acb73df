/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The four boundary operations
//!
//! Each operation resolves its backend, validates the input, runs the backend
//! (libjpeg inside the error trap) and packages the output with the allocator
//! tag of whoever allocated it.
//!
//! | Operation      | Backend       | Output allocator        |
//! |----------------|---------------|-------------------------|
//! | `encode_jpeg`  | libjpeg       | [`Allocator::Libjpeg`]  |
//! | `decode_jpeg`  | libjpeg       | [`Allocator::Boundary`] |
//! | `encode_image` | [`RasterCodec`] | [`Allocator::Codec`]  |
//! | `decode_image` | [`RasterCodec`] | [`Allocator::Codec`]  |
//!
//! [`Allocator::Libjpeg`]: crate::Allocator::Libjpeg
//! [`Allocator::Boundary`]: crate::Allocator::Boundary
//! [`Allocator::Codec`]: crate::Allocator::Codec

use log::debug;

use crate::codecs::jpeg;
use crate::codecs::raster::{ImageRsCodec, RasterCodec};
use crate::errors::BridgeErrors;
use crate::handoff::{ImageBuffer, OwnedBytes};
use crate::options::BridgeOptions;
use crate::registry::{resolve, Backend, CodecFormat};
use crate::trap::trap;
use crate::CHANNELS;

/// Outcome of a boundary call, either a buffer or an error, never both
pub type CallResult = Result<ImageBuffer, BridgeErrors>;

/// Check that `pixels` holds exactly `width * height * 4` bytes
pub fn validate_raw_pixels(pixels: &[u8], width: u32, height: u32) -> Result<(), BridgeErrors> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|x| x.checked_mul(CHANNELS));

    match expected {
        Some(len) if len == pixels.len() => Ok(()),
        Some(len) => Err(BridgeErrors::MalformedInput(format!(
            "Expected {} bytes for a {}x{} image, found {}",
            len,
            width,
            height,
            pixels.len()
        ))),
        None => Err(BridgeErrors::MalformedInput(format!(
            "{}x{} overflows the pixel buffer size",
            width, height
        )))
    }
}

/// Entry point for all four operations
///
/// A bridge holds no codec state, every call builds its own backend context,
/// so a single bridge can be shared between threads.
pub struct Bridge<C: RasterCodec = ImageRsCodec> {
    options: BridgeOptions,
    raster:  C
}

impl Default for Bridge<ImageRsCodec> {
    fn default() -> Self {
        Bridge::new(BridgeOptions::default())
    }
}

impl Bridge<ImageRsCodec> {
    /// Create a bridge with the `image` crate as its safe codec
    pub fn new(options: BridgeOptions) -> Bridge<ImageRsCodec> {
        Bridge::with_raster_codec(options, ImageRsCodec)
    }
}

impl<C: RasterCodec> Bridge<C> {
    /// Create a bridge using `raster` for PNG and TGA
    pub fn with_raster_codec(options: BridgeOptions, raster: C) -> Bridge<C> {
        Bridge { options, raster }
    }

    pub const fn options(&self) -> &BridgeOptions {
        &self.options
    }

    pub fn raster_codec(&self) -> &C {
        &self.raster
    }

    /// Encode 4 channel pixels to JPEG
    ///
    /// `quality` is clamped to `1..=100`. The output is allocated by libjpeg
    /// and tagged [`Allocator::Libjpeg`](crate::Allocator::Libjpeg).
    pub fn encode_jpeg(&self, pixels: &[u8], width: u32, height: u32, quality: i32) -> CallResult {
        debug!("encode_jpeg: {}x{}, quality {}", width, height, quality);

        self.options.check_dimensions(width, height)?;

        // the backend checks the buffer length itself
        let bytes = jpeg::encode(pixels, width, height, quality, &self.options)?;

        Ok(ImageBuffer::encoded(width, height, OwnedBytes::Libjpeg(bytes)))
    }

    /// Decode a JPEG stream to 4 channel pixels
    ///
    /// The output is allocated by the boundary and tagged
    /// [`Allocator::Boundary`](crate::Allocator::Boundary).
    pub fn decode_jpeg(&self, data: &[u8]) -> CallResult {
        debug!("decode_jpeg: {} bytes", data.len());

        let decoded = jpeg::decode(data, &self.options)?;

        Ok(ImageBuffer::pixels(
            decoded.width,
            decoded.height,
            OwnedBytes::Boundary(decoded.pixels)
        ))
    }

    /// Encode 4 channel pixels with the safe codec
    ///
    /// `code` is an [`ImageType`](crate::ImageType) code. JPEG is refused
    /// here, use [`Bridge::encode_jpeg`], so that this operation's output
    /// is always tagged [`Allocator::Codec`](crate::Allocator::Codec).
    pub fn encode_image(&self, pixels: &[u8], width: u32, height: u32, code: u32) -> CallResult {
        let format = self.raster_format(code)?;
        debug!("encode_image: {:?}, {}x{}", format, width, height);

        validate_raw_pixels(pixels, width, height)?;
        self.options.check_dimensions(width, height)?;

        let encoded = trap(|| self.raster.encode(pixels, width, height, format)).and_then(|r| r)?;

        Ok(ImageBuffer::encoded(width, height, OwnedBytes::Codec(encoded)))
    }

    /// Decode a PNG or TGA file with the safe codec
    ///
    /// The same codes as [`Bridge::encode_image`] are accepted.
    pub fn decode_image(&self, data: &[u8], code: u32) -> CallResult {
        let format = self.raster_format(code)?;
        debug!("decode_image: {:?}, {} bytes", format, data.len());

        let decoded = trap(|| self.raster.decode(data, format, &self.options)).and_then(|r| r)?;

        validate_raw_pixels(&decoded.pixels, decoded.width, decoded.height)?;

        Ok(ImageBuffer::pixels(
            decoded.width,
            decoded.height,
            OwnedBytes::Codec(decoded.pixels)
        ))
    }

    fn raster_format(&self, code: u32) -> Result<CodecFormat, BridgeErrors> {
        match resolve(code) {
            Ok(Backend::Raster(format)) => Ok(format),
            Ok(Backend::Libjpeg) => {
                debug!("Format code {} resolves to libjpeg, refusing", code);
                Err(BridgeErrors::UnsupportedFormat {
                    code,
                    detail: "JPEG goes through encode_jpeg/decode_jpeg"
                })
            }
            Err(err) => {
                debug!("{}", err);
                Err(err)
            }
        }
    }
}
