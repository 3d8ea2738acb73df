/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A single calling convention over two independent image codecs
//!
//! This crate sits between one external caller and two backends that know
//! nothing about each other
//!
//! - **libjpeg** (through `mozjpeg-sys`) for JPEG. libjpeg reports fatal
//!   errors by never returning from its `error_exit` hook, so every call into it
//!   goes through the [error trap](crate::trap) which turns that into a normal
//!   [`BridgeErrors::CodecFatal`].
//! - **the `image` crate** for PNG and TGA, reached through the
//!   [`RasterCodec`](crate::codecs::raster::RasterCodec) trait.
//!
//! Whatever the backend, a successful call hands back an
//! [`ImageBuffer`](crate::handoff::ImageBuffer) whose bytes are tagged with the
//! [`Allocator`](crate::handoff::Allocator) that produced them, so the bytes can
//! cross a C boundary and be released by the matching routine.
//!
//! # Example
//! ```no_run
//! use imgbridge::{Bridge, ImageType};
//!
//! let bridge = Bridge::default();
//! let red = [255_u8, 0, 0, 255].repeat(4 * 4);
//!
//! let jpeg = bridge.encode_jpeg(&red, 4, 4, 90)?;
//! let pixels = bridge.decode_jpeg(jpeg.as_slice())?;
//! assert_eq!(pixels.dimensions(), (4, 4));
//!
//! let png = bridge.encode_image(&red, 4, 4, ImageType::Png.code())?;
//! let back = bridge.decode_image(png.as_slice(), ImageType::Png.code())?;
//! assert_eq!(back.as_slice(), &red[..]);
//! # Ok::<(), imgbridge::BridgeErrors>(())
//! ```
//!
//! # Threads
//! Nothing in here keeps codec state between calls. Each libjpeg call builds
//! its own context, so a [`Bridge`] can be shared between threads freely.

pub mod bridge;
pub mod codecs;
pub mod errors;
pub mod handoff;
pub mod options;
pub mod registry;
pub mod trap;

pub use bridge::{Bridge, CallResult};
pub use errors::BridgeErrors;
pub use handoff::{Allocator, ImageBuffer, OwnedBytes, RawBuffer};
pub use options::BridgeOptions;
pub use registry::{resolve, Backend, CodecFormat, ImageType};

/// Number of interleaved 8-bit channels in every raw pixel buffer
pub const CHANNELS: usize = 4;
