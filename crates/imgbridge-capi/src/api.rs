/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The four codec entry points
//!
//! All of them follow the same shape
//!
//! - Out pointers are reset first, `*out = NULL`, lengths and dimensions to 0,
//!   `*out_msg = NULL`, so they're defined whatever happens next.
//! - On success the status is `IMB_OK`, `*out` holds the buffer and `*out_msg`
//!   stays null.
//! - On failure the status is nonzero, `*out` stays null and `*out_msg` holds a
//!   message, unless `out_msg` itself is null in which case the status is
//!   `IMB_NULL_ARGUMENT` and nothing else is reported.
//!
//! Calls use [`BridgeOptions::default`](imgbridge::BridgeOptions::default).
use std::ffi::{c_char, c_int, c_uchar, c_uint};

use imgbridge::{Bridge, BridgeErrors, ImageBuffer, CHANNELS};

use crate::errno::{input, required, reset, resolve, IMB_NULL_ARGUMENT};

fn raw_len(width: c_uint, height: c_uint) -> Result<usize, BridgeErrors> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|x| x.checked_mul(CHANNELS))
        .ok_or_else(|| {
            BridgeErrors::MalformedInput(format!("{}x{} overflows the pixel buffer size", width, height))
        })
}

fn c_len(len: usize) -> Result<c_uint, BridgeErrors> {
    c_uint::try_from(len).map_err(|_| {
        BridgeErrors::MalformedInput(format!("{} byte output does not fit an unsigned int", len))
    })
}

/// Release ownership of the bytes to the caller
fn hand_off(buffer: ImageBuffer) -> *mut c_uchar {
    buffer.into_bytes().into_raw().data
}

/// \brief Encode RGBA pixels to JPEG
///
/// @param pixels: `width * height * 4` bytes of interleaved pixels
/// @param width: Image width
/// @param height: Image height
/// @param quality: JPEG quality, clamped to 1..=100
/// @param out: Receives the JPEG, release with `imb_jpeg_free`
/// @param out_len: Receives the JPEG length
/// @param out_msg: Receives an error message on failure, release with `imb_free`
///
/// @returns 0 on success, libjpeg's message code or a negative `IMB_*` code on failure
#[no_mangle]
pub unsafe extern "C" fn imb_encode_jpeg(
    pixels: *const c_uchar, width: c_uint, height: c_uint, quality: c_int,
    out: *mut *mut c_uchar, out_len: *mut c_uint, out_msg: *mut *mut c_char
) -> c_int {
    reset(out, std::ptr::null_mut());
    reset(out_len, 0);
    reset(out_msg, std::ptr::null_mut());

    if out_msg.is_null() {
        return IMB_NULL_ARGUMENT;
    }
    resolve("imb_encode_jpeg", out_msg, || {
        let out = required(out, "out")?;
        let out_len = required(out_len, "out_len")?;
        let pixels = input(pixels, raw_len(width, height)?, "pixels")?;

        let buffer = Bridge::default().encode_jpeg(pixels, width, height, quality)?;
        let len = c_len(buffer.len())?;

        *out = hand_off(buffer);
        *out_len = len;
        Ok(())
    })
}

/// \brief Decode a JPEG to RGBA pixels
///
/// @param jpeg: The JPEG stream
/// @param len: Length of `jpeg`
/// @param out: Receives `width * height * 4` bytes of pixels, release with `imb_free`
/// @param out_width: Receives the image width
/// @param out_height: Receives the image height
/// @param out_msg: Receives an error message on failure, release with `imb_free`
///
/// @returns 0 on success, libjpeg's message code or a negative `IMB_*` code on failure
#[no_mangle]
pub unsafe extern "C" fn imb_decode_jpeg(
    jpeg: *const c_uchar, len: c_uint, out: *mut *mut c_uchar, out_width: *mut c_uint,
    out_height: *mut c_uint, out_msg: *mut *mut c_char
) -> c_int {
    reset(out, std::ptr::null_mut());
    reset(out_width, 0);
    reset(out_height, 0);
    reset(out_msg, std::ptr::null_mut());

    if out_msg.is_null() {
        return IMB_NULL_ARGUMENT;
    }
    resolve("imb_decode_jpeg", out_msg, || {
        let out = required(out, "out")?;
        let out_width = required(out_width, "out_width")?;
        let out_height = required(out_height, "out_height")?;
        let jpeg = input(jpeg, len as usize, "jpeg")?;

        let buffer = Bridge::default().decode_jpeg(jpeg)?;
        let (width, height) = buffer.dimensions();

        *out = hand_off(buffer);
        *out_width = width;
        *out_height = height;
        Ok(())
    })
}

/// \brief Encode RGBA pixels to PNG or TGA
///
/// @param pixels: `width * height * 4` bytes of interleaved pixels
/// @param width: Image width
/// @param height: Image height
/// @param format: An `ImbImageType`, `IMB_IMAGE_TGA` or `IMB_IMAGE_PNG`
/// @param out: Receives the file, release with `imb_codec_free(out, out_len)`
/// @param out_len: Receives the file length
/// @param out_msg: Receives an error message on failure, release with `imb_free`
///
/// @returns 0 on success or a negative `IMB_*` code on failure
#[no_mangle]
pub unsafe extern "C" fn imb_encode_image(
    pixels: *const c_uchar, width: c_uint, height: c_uint, format: c_uint,
    out: *mut *mut c_uchar, out_len: *mut c_uint, out_msg: *mut *mut c_char
) -> c_int {
    reset(out, std::ptr::null_mut());
    reset(out_len, 0);
    reset(out_msg, std::ptr::null_mut());

    if out_msg.is_null() {
        return IMB_NULL_ARGUMENT;
    }
    resolve("imb_encode_image", out_msg, || {
        let out = required(out, "out")?;
        let out_len = required(out_len, "out_len")?;
        let pixels = input(pixels, raw_len(width, height)?, "pixels")?;

        let buffer = Bridge::default().encode_image(pixels, width, height, format)?;
        let len = c_len(buffer.len())?;

        *out = hand_off(buffer);
        *out_len = len;
        Ok(())
    })
}

/// \brief Decode a PNG or TGA file to RGBA pixels
///
/// @param encoded: The file contents
/// @param len: Length of `encoded`
/// @param format: An `ImbImageType`, `IMB_IMAGE_TGA` or `IMB_IMAGE_PNG`
/// @param out: Receives `width * height * 4` bytes of pixels,
///  release with `imb_codec_free(out, width * height * 4)`
/// @param out_width: Receives the image width
/// @param out_height: Receives the image height
/// @param out_msg: Receives an error message on failure, release with `imb_free`
///
/// @returns 0 on success or a negative `IMB_*` code on failure
#[no_mangle]
pub unsafe extern "C" fn imb_decode_image(
    encoded: *const c_uchar, len: c_uint, format: c_uint, out: *mut *mut c_uchar,
    out_width: *mut c_uint, out_height: *mut c_uint, out_msg: *mut *mut c_char
) -> c_int {
    reset(out, std::ptr::null_mut());
    reset(out_width, 0);
    reset(out_height, 0);
    reset(out_msg, std::ptr::null_mut());

    if out_msg.is_null() {
        return IMB_NULL_ARGUMENT;
    }
    resolve("imb_decode_image", out_msg, || {
        let out = required(out, "out")?;
        let out_width = required(out_width, "out_width")?;
        let out_height = required(out_height, "out_height")?;
        let encoded = input(encoded, len as usize, "encoded")?;

        let buffer = Bridge::default().decode_image(encoded, format)?;
        let (width, height) = buffer.dimensions();

        *out = hand_off(buffer);
        *out_width = width;
        *out_height = height;
        Ok(())
    })
}
