/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Allocation and release routines
//!
//! Every buffer returned by this library must be released with the routine
//! documented for the call that produced it
//!
//! | Buffer                  | Release with                          |
//! |-------------------------|---------------------------------------|
//! | `imb_encode_jpeg` out   | `imb_jpeg_free(out)`                  |
//! | `imb_decode_jpeg` out   | `imb_free(out)`                       |
//! | `imb_encode_image` out  | `imb_codec_free(out, out_len)`        |
//! | `imb_decode_image` out  | `imb_codec_free(out, w * h * 4)`      |
//! | any `out_msg`           | `imb_free(msg)`                       |
//!
//! `imb_release` does the same given the allocator tag.
use std::ffi::{c_uchar, c_uint, c_void};

use imgbridge::{Allocator, OwnedBytes, RawBuffer};
use libc::size_t;
use log::warn;

/// Allocator tags as seen from C, see `ImbAllocator` in the header
pub const IMB_ALLOCATOR_LIBJPEG: c_uint = Allocator::Libjpeg as c_uint;
pub const IMB_ALLOCATOR_BOUNDARY: c_uint = Allocator::Boundary as c_uint;
pub const IMB_ALLOCATOR_CODEC: c_uint = Allocator::Codec as c_uint;

fn allocator_from_tag(tag: c_uint) -> Option<Allocator> {
    match tag {
        IMB_ALLOCATOR_LIBJPEG => Some(Allocator::Libjpeg),
        IMB_ALLOCATOR_BOUNDARY => Some(Allocator::Boundary),
        IMB_ALLOCATOR_CODEC => Some(Allocator::Codec),
        _ => None
    }
}

/// Allocate a region of memory
///
/// This uses libc's malloc, the same allocator behind `imb_free`
///
/// \param size: Memory size
#[no_mangle]
pub unsafe extern "C" fn imb_malloc(size: size_t) -> *mut c_void {
    libc::malloc(size)
}

/// Free a memory region allocated by `imb_malloc` or by the library itself
///
/// Use this for `imb_decode_jpeg` pixels and every error message.
///
/// \param ptr: The pointer to free, null is accepted
#[no_mangle]
pub unsafe extern "C" fn imb_free(ptr: *mut c_void) {
    libc::free(ptr)
}

/// Free an encoded JPEG returned by `imb_encode_jpeg`
///
/// The buffer was allocated by libjpeg's memory destination.
///
/// \param ptr: The pointer to free, null is accepted
#[no_mangle]
pub unsafe extern "C" fn imb_jpeg_free(ptr: *mut c_uchar) {
    libc::free(ptr.cast())
}

/// Free a buffer returned by `imb_encode_image` or `imb_decode_image`
///
/// \param ptr: The pointer to free, null is accepted
/// \param len: The exact length the buffer was returned with
#[no_mangle]
pub unsafe extern "C" fn imb_codec_free(ptr: *mut c_uchar, len: size_t) {
    OwnedBytes::release(RawBuffer {
        data: ptr,
        len,
        allocator: Allocator::Codec
    })
}

/// Free any buffer returned by the library given its allocator tag
///
/// \param ptr: The pointer to free, null is accepted
/// \param len: The exact length the buffer was returned with
/// \param allocator: One of the `IMB_ALLOCATOR_*` tags, unknown tags free nothing
#[no_mangle]
pub unsafe extern "C" fn imb_release(ptr: *mut c_uchar, len: size_t, allocator: c_uint) {
    match allocator_from_tag(allocator) {
        Some(allocator) => OwnedBytes::release(RawBuffer {
            data: ptr,
            len,
            allocator
        }),
        None => warn!("imb_release: unknown allocator tag {}, buffer not freed", allocator)
    }
}
