/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Ownership handoff of output buffers
//!
//! Three parties allocate the buffers this crate returns
//!
//! | Operation      | Allocator               | Memory                              |
//! |----------------|-------------------------|-------------------------------------|
//! | `encode_jpeg`  | [`Allocator::Libjpeg`]  | `malloc`, grown by `jpeg_mem_dest`  |
//! | `decode_jpeg`  | [`Allocator::Boundary`] | `malloc`, `row_stride * height`     |
//! | `encode_image` | [`Allocator::Codec`]    | `Box<[u8]>` from the safe codec     |
//! | `decode_image` | [`Allocator::Codec`]    | `Box<[u8]>` from the safe codec     |
//!
//! Buffers are never copied into another allocator's memory to make them look alike,
//! instead each one carries its allocator tag and is released by the routine matching
//! that tag, see [`OwnedBytes::release`].
//!
//! An empty buffer is always handed off as a null pointer with length zero.

use std::ops::Deref;
use std::ptr;

use crate::errors::BridgeErrors;

/// Who allocated a buffer, and thus who must free it
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(C)]
pub enum Allocator {
    /// libjpeg's memory destination, released with `free`
    Libjpeg  = 0,
    /// The boundary layer itself, released with `free`
    Boundary = 1,
    /// The safe codec, released as a `Box<[u8]>`
    Codec    = 2
}

/// A `malloc`ed byte buffer, freed with `free` on drop
pub struct MallocBytes {
    ptr: *mut u8,
    len: usize
}

impl std::fmt::Debug for MallocBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MallocBytes").field("len", &self.len).finish()
    }
}

// The buffer is uniquely owned, no aliases are kept anywhere.
unsafe impl Send for MallocBytes {}
unsafe impl Sync for MallocBytes {}

impl MallocBytes {
    /// An empty buffer, no allocation made
    pub const fn empty() -> MallocBytes {
        MallocBytes {
            ptr: ptr::null_mut(),
            len: 0
        }
    }

    /// Allocate `len` zeroed bytes with `calloc`
    ///
    /// A zero length makes no allocation and returns an empty buffer.
    pub fn try_alloc(len: usize) -> Result<MallocBytes, BridgeErrors> {
        if len == 0 {
            return Ok(MallocBytes::empty());
        }
        let ptr = unsafe { libc::calloc(len, 1) }.cast::<u8>();

        if ptr.is_null() {
            return Err(BridgeErrors::AllocationFailure(len));
        }
        Ok(MallocBytes { ptr, len })
    }

    /// Take ownership of a buffer allocated with `malloc`
    ///
    /// # Safety
    /// `ptr` must be null or come from `malloc`/`calloc`/`realloc` with at least `len`
    /// initialized bytes, and no one else may free it.
    pub unsafe fn from_raw(ptr: *mut u8, len: usize) -> MallocBytes {
        if ptr.is_null() {
            return MallocBytes::empty();
        }
        if len == 0 {
            libc::free(ptr.cast());
            return MallocBytes::empty();
        }
        MallocBytes { ptr, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        if self.ptr.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        if self.ptr.is_null() {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    /// Give up ownership, the caller must `free` the pointer
    pub fn into_raw(self) -> (*mut u8, usize) {
        let parts = (self.ptr, self.len);
        std::mem::forget(self);
        parts
    }
}

impl Drop for MallocBytes {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { libc::free(self.ptr.cast()) };
            self.ptr = ptr::null_mut();
        }
    }
}

/// Bytes together with the allocator that produced them
pub enum OwnedBytes {
    Libjpeg(MallocBytes),
    Boundary(MallocBytes),
    Codec(Box<[u8]>)
}

/// A buffer stripped to the parts that cross a C boundary
#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct RawBuffer {
    pub data:      *mut u8,
    pub len:       usize,
    pub allocator: Allocator
}

impl OwnedBytes {
    pub fn allocator(&self) -> Allocator {
        match self {
            OwnedBytes::Libjpeg(_) => Allocator::Libjpeg,
            OwnedBytes::Boundary(_) => Allocator::Boundary,
            OwnedBytes::Codec(_) => Allocator::Codec
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            OwnedBytes::Libjpeg(bytes) | OwnedBytes::Boundary(bytes) => bytes.as_slice(),
            OwnedBytes::Codec(bytes) => &bytes[..]
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transfer ownership out of Rust
    ///
    /// The returned buffer must be released exactly once, with
    /// [`OwnedBytes::release`] or the routine matching its allocator.
    pub fn into_raw(self) -> RawBuffer {
        let allocator = self.allocator();

        let (data, len) = match self {
            OwnedBytes::Libjpeg(bytes) | OwnedBytes::Boundary(bytes) => bytes.into_raw(),
            OwnedBytes::Codec(bytes) => {
                if bytes.is_empty() {
                    (ptr::null_mut(), 0)
                } else {
                    let len = bytes.len();
                    (Box::into_raw(bytes).cast::<u8>(), len)
                }
            }
        };
        RawBuffer {
            data,
            len,
            allocator
        }
    }

    /// Take back ownership of a buffer produced by [`OwnedBytes::into_raw`]
    ///
    /// # Safety
    /// `raw` must come from `into_raw` unchanged (the same pointer, length and
    /// allocator tag) and must not have been released before.
    pub unsafe fn from_raw(raw: RawBuffer) -> OwnedBytes {
        match raw.allocator {
            Allocator::Libjpeg => OwnedBytes::Libjpeg(MallocBytes::from_raw(raw.data, raw.len)),
            Allocator::Boundary => OwnedBytes::Boundary(MallocBytes::from_raw(raw.data, raw.len)),
            Allocator::Codec => {
                if raw.data.is_null() {
                    OwnedBytes::Codec(Box::default())
                } else {
                    OwnedBytes::Codec(Box::from_raw(ptr::slice_from_raw_parts_mut(
                        raw.data, raw.len
                    )))
                }
            }
        }
    }

    /// Release a handed-off buffer with the routine matching its allocator
    ///
    /// A null `data` pointer is accepted and does nothing.
    ///
    /// # Safety
    /// Same as [`OwnedBytes::from_raw`]
    pub unsafe fn release(raw: RawBuffer) {
        if raw.data.is_null() {
            return;
        }
        drop(OwnedBytes::from_raw(raw));
    }
}

impl Deref for OwnedBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

/// A buffer returned by a successful boundary call
///
/// For decoders, `data` is raw pixels, 4 interleaved channels and
/// `len == width * height * 4`. For encoders `data` is the encoded
/// file and `width`/`height` are the source dimensions.
pub struct ImageBuffer {
    width:  u32,
    height: u32,
    data:   OwnedBytes
}

impl ImageBuffer {
    /// Wrap raw pixels
    pub fn pixels(width: u32, height: u32, data: OwnedBytes) -> ImageBuffer {
        debug_assert_eq!(
            data.len() as u64,
            u64::from(width) * u64::from(height) * crate::CHANNELS as u64,
            "raw pixel buffer does not match its dimensions"
        );
        ImageBuffer {
            width,
            height,
            data
        }
    }

    /// Wrap an encoded file, with the dimensions of the source image
    pub fn encoded(width: u32, height: u32, data: OwnedBytes) -> ImageBuffer {
        ImageBuffer {
            width,
            height,
            data
        }
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn allocator(&self) -> Allocator {
        self.data.allocator()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }

    pub fn into_bytes(self) -> OwnedBytes {
        self.data
    }
}

impl std::fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.len())
            .field("allocator", &self.allocator())
            .finish()
    }
}
