/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Format codes and the backend each one resolves to
//!
//! There are two enumerations here and they are versioned separately.
//!
//! - [`ImageType`] is what the external caller passes in. It has four values,
//!   including BLP1 which is a container the host handles itself.
//! - [`CodecFormat`] is the safe codec's own enumeration, it only knows TGA and PNG.
//!
//! The numeric values happen to line up for TGA and PNG today, but nothing relies on
//! that, conversion always goes through a `match`.

use crate::errors::BridgeErrors;

/// Image formats the external caller can name
///
/// The codes are part of the C ABI, new formats get new codes and
/// existing codes are never renumbered.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum ImageType {
    /// Truevision TGA
    Tga  = 0,
    /// Portable Network Graphics
    Png  = 1,
    /// Joint Photographic Experts Group
    Jpeg = 2,
    /// Blizzard BLP1 texture, unpacked by the host
    Blp1 = 3
}

impl ImageType {
    /// Map an external code to an image type, `None` if the code is unknown
    pub const fn from_code(code: u32) -> Option<ImageType> {
        match code {
            0 => Some(ImageType::Tga),
            1 => Some(ImageType::Png),
            2 => Some(ImageType::Jpeg),
            3 => Some(ImageType::Blp1),
            _ => None
        }
    }

    /// The external code for this type
    pub const fn code(self) -> u32 {
        self as u32
    }
}

/// Formats understood by the safe codec
///
/// This mirrors the codec's own `#[repr(C)]` enumeration, so the
/// values follow that codec's numbering, not [`ImageType`]'s.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum CodecFormat {
    Tga = 0,
    Png = 1
}

impl CodecFormat {
    /// Map a safe-codec sub-code to a format
    pub const fn from_code(code: u32) -> Option<CodecFormat> {
        match code {
            0 => Some(CodecFormat::Tga),
            1 => Some(CodecFormat::Png),
            _ => None
        }
    }

    /// The safe codec's sub-code for this format
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// The safe codec format backing an external image type, if any
    pub const fn from_image_type(image_type: ImageType) -> Option<CodecFormat> {
        match image_type {
            ImageType::Tga => Some(CodecFormat::Tga),
            ImageType::Png => Some(CodecFormat::Png),
            ImageType::Jpeg | ImageType::Blp1 => None
        }
    }
}

impl From<CodecFormat> for image::ImageFormat {
    fn from(format: CodecFormat) -> Self {
        match format {
            CodecFormat::Tga => image::ImageFormat::Tga,
            CodecFormat::Png => image::ImageFormat::Png
        }
    }
}

impl From<CodecFormat> for image::ImageOutputFormat {
    fn from(format: CodecFormat) -> Self {
        match format {
            CodecFormat::Tga => image::ImageOutputFormat::Tga,
            CodecFormat::Png => image::ImageOutputFormat::Png
        }
    }
}

/// The codec a format code is served by
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Backend {
    /// libjpeg, reached through the error trap
    Libjpeg,
    /// The safe codec, with its own sub-code
    Raster(CodecFormat)
}

/// Resolve an external format code to the backend serving it
///
/// Unknown codes are an error, there is no fallback backend.
/// BLP1 is a known code but nothing at this boundary decodes it,
/// so it is rejected as well.
pub fn resolve(code: u32) -> Result<Backend, BridgeErrors> {
    match ImageType::from_code(code) {
        Some(ImageType::Jpeg) => Ok(Backend::Libjpeg),
        Some(ImageType::Blp1) => Err(BridgeErrors::UnsupportedFormat {
            code,
            detail: "BLP1 containers must be unpacked by the caller"
        }),
        Some(image_type) => match CodecFormat::from_image_type(image_type) {
            Some(format) => Ok(Backend::Raster(format)),
            None => Err(BridgeErrors::UnsupportedFormat {
                code,
                detail: "no backend for this image type"
            })
        },
        None => Err(BridgeErrors::UnsupportedFormat {
            code,
            detail: "unknown format code"
        })
    }
}
