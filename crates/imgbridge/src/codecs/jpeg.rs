/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! libjpeg backend
//!
//! Every call builds its own boxed context holding the libjpeg struct, the
//! error manager and whatever output the call has begun. libjpeg keeps raw
//! pointers into the context (error manager, memory destination), so the
//! context is boxed and never moves while libjpeg is alive.
//!
//! Cleanup is idempotent, it runs from an explicit call after a trap and again
//! from `Drop`, the second time sees `CallState::Returned` and is a no-op.
use std::ffi::c_ulong;
use std::mem;
use std::ptr;

use log::{debug, trace};
use mozjpeg_sys::*;

use crate::bridge::validate_raw_pixels;
use crate::errors::BridgeErrors;
use crate::handoff::MallocBytes;
use crate::options::BridgeOptions;
use crate::trap::{trap, CallState, TrapErrorMgr};
use crate::CHANNELS;

/// Lowest quality libjpeg accepts
pub const MIN_QUALITY: i32 = 1;
/// Highest quality libjpeg accepts
pub const MAX_QUALITY: i32 = 100;

/// Clamp a caller supplied quality to libjpeg's accepted range
pub fn clamp_quality(quality: i32) -> i32 {
    let clamped = quality.clamp(MIN_QUALITY, MAX_QUALITY);

    if clamped != quality {
        debug!("Quality {} out of range, using {}", quality, clamped);
    }
    clamped
}

/// Pixels recovered from a JPEG stream
#[derive(Debug)]
pub struct DecodedJpeg {
    pub width:  u32,
    pub height: u32,
    /// `width * height * 4` bytes, allocated by the boundary
    pub pixels: MallocBytes
}

struct CompressContext {
    cinfo:      jpeg_compress_struct,
    err:        TrapErrorMgr,
    // written by libjpeg's memory destination
    out_buffer: *mut u8,
    out_size:   c_ulong,
    state:      CallState
}

impl CompressContext {
    fn new(strict: bool) -> Box<CompressContext> {
        let mut ctx = Box::new(CompressContext {
            // safety: a zeroed struct is what jpeg_CreateCompress expects,
            // and destroying it before creation is a no-op
            cinfo:      unsafe { mem::zeroed() },
            err:        TrapErrorMgr::new(strict),
            out_buffer: ptr::null_mut(),
            out_size:   0,
            state:      CallState::Idle
        });
        ctx.cinfo.common.err = ctx.err.as_mut_ptr();
        ctx
    }

    /// Run a full compression, may unwind through the trap
    unsafe fn compress(&mut self, pixels: &[u8], width: u32, height: u32, quality: i32) {
        jpeg_create_compress(&mut self.cinfo);

        self.cinfo.image_width = width;
        self.cinfo.image_height = height;
        self.cinfo.input_components = CHANNELS as _;
        // channels are written as is, no color transform
        self.cinfo.in_color_space = J_COLOR_SPACE::JCS_UNKNOWN;

        jpeg_set_defaults(&mut self.cinfo);
        jpeg_set_quality(&mut self.cinfo, quality, true as boolean);
        jpeg_mem_dest(&mut self.cinfo, &mut self.out_buffer, &mut self.out_size);

        jpeg_start_compress(&mut self.cinfo, true as boolean);

        let row_stride = width as usize * CHANNELS;

        while self.cinfo.next_scanline < self.cinfo.image_height {
            let start = self.cinfo.next_scanline as usize * row_stride;
            let row = [pixels[start..start + row_stride].as_ptr()];

            jpeg_write_scanlines(&mut self.cinfo, row.as_ptr(), 1);
        }
        jpeg_finish_compress(&mut self.cinfo);
    }

    /// Hand over the finished buffer, leaving the context without output
    fn take_output(&mut self) -> MallocBytes {
        let buffer = mem::replace(&mut self.out_buffer, ptr::null_mut());
        let size = mem::replace(&mut self.out_size, 0);
        // safety: jpeg_mem_dest allocates with malloc and the pointer was
        // nulled above, so nothing else frees it
        unsafe { MallocBytes::from_raw(buffer, size as usize) }
    }

    fn cleanup(&mut self) {
        if self.state == CallState::Returned {
            return;
        }
        debug_assert_ne!(self.state, CallState::Invoked, "cleanup while libjpeg runs");

        unsafe {
            // the memory destination only publishes its current buffer on
            // term_destination, after a trap it may have been reallocated
            if self.state == CallState::Trapped {
                let term = self.cinfo.dest.as_ref().and_then(|d| d.term_destination);

                if let Some(term) = term {
                    term(&mut self.cinfo);
                }
            }
            jpeg_destroy_compress(&mut self.cinfo);
        }
        if !self.out_buffer.is_null() {
            drop(self.take_output());
        }
        self.state = CallState::Returned;
    }
}

impl Drop for CompressContext {
    fn drop(&mut self) {
        self.cleanup();
    }
}

struct DecompressContext {
    dinfo:     jpeg_decompress_struct,
    err:       TrapErrorMgr,
    pixels: Option<MallocBytes>,
    state:  CallState
}

impl DecompressContext {
    fn new(strict: bool) -> Box<DecompressContext> {
        let mut ctx = Box::new(DecompressContext {
            // safety: see CompressContext::new
            dinfo:  unsafe { mem::zeroed() },
            err:    TrapErrorMgr::new(strict),
            pixels: None,
            state:  CallState::Idle
        });
        ctx.dinfo.common.err = ctx.err.as_mut_ptr();
        ctx
    }

    /// Run a full decompression, may unwind through the trap
    ///
    /// Errors found by the boundary itself (limits, unsupported layouts)
    /// are returned, libjpeg's own errors unwind.
    unsafe fn decompress(
        &mut self, data: &[u8], options: &BridgeOptions
    ) -> Result<(u32, u32), BridgeErrors> {
        let in_size = c_ulong::try_from(data.len()).map_err(|_| {
            BridgeErrors::MalformedInput(format!("{} bytes is too large for libjpeg", data.len()))
        })?;

        jpeg_create_decompress(&mut self.dinfo);
        jpeg_mem_src(&mut self.dinfo, data.as_ptr(), in_size);
        jpeg_read_header(&mut self.dinfo, true as boolean);

        options.check_dimensions(self.dinfo.image_width, self.dinfo.image_height)?;

        self.dinfo.out_color_space = match self.dinfo.jpeg_color_space {
            J_COLOR_SPACE::JCS_YCbCr | J_COLOR_SPACE::JCS_RGB | J_COLOR_SPACE::JCS_GRAYSCALE => {
                J_COLOR_SPACE::JCS_EXT_RGBA
            }
            J_COLOR_SPACE::JCS_YCCK => J_COLOR_SPACE::JCS_CMYK,
            // four channel streams are handed back untouched
            other => other
        };
        trace!(
            "JPEG color space {:?} -> {:?}",
            self.dinfo.jpeg_color_space,
            self.dinfo.out_color_space
        );

        jpeg_start_decompress(&mut self.dinfo);

        if self.dinfo.output_components as usize != CHANNELS {
            return Err(BridgeErrors::MalformedInput(format!(
                "JPEG with color space {:?} decodes to {} channels, expected {}",
                self.dinfo.jpeg_color_space, self.dinfo.output_components, CHANNELS
            )));
        }
        let width = self.dinfo.output_width;
        let height = self.dinfo.output_height;

        let row_stride = width as usize * CHANNELS;
        let size = row_stride.checked_mul(height as usize).ok_or_else(|| {
            BridgeErrors::MalformedInput(format!("{}x{} overflows the output size", width, height))
        })?;

        let pixels = self.pixels.insert(MallocBytes::try_alloc(size)?);
        let out = pixels.as_mut_slice();

        while self.dinfo.output_scanline < self.dinfo.output_height {
            let start = self.dinfo.output_scanline as usize * row_stride;
            let mut row = [out[start..start + row_stride].as_mut_ptr()];

            let read = jpeg_read_scanlines(&mut self.dinfo, row.as_mut_ptr(), 1);

            if read == 0 {
                return Err(BridgeErrors::MalformedInput(format!(
                    "Decoder stalled at scanline {} of {}",
                    self.dinfo.output_scanline, height
                )));
            }
        }
        jpeg_finish_decompress(&mut self.dinfo);

        Ok((width, height))
    }

    fn cleanup(&mut self) {
        if self.state == CallState::Returned {
            return;
        }
        debug_assert_ne!(self.state, CallState::Invoked, "cleanup while libjpeg runs");

        unsafe { jpeg_destroy_decompress(&mut self.dinfo) };

        if let Some(partial) = self.pixels.take() {
            trace!("Releasing {} bytes of partial output ({:?})", partial.len(), self.state);
        }
        self.state = CallState::Returned;
    }
}

impl Drop for DecompressContext {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Compress `width * height` 4 channel pixels into a JPEG stream
///
/// The returned buffer is the one libjpeg's memory destination allocated.
///
/// # Errors
/// - `CodecFatal` when libjpeg raises a fatal error, or a warning in strict mode
/// - `MalformedInput` when `pixels` doesn't cover the image
pub fn encode(
    pixels: &[u8], width: u32, height: u32, quality: i32, options: &BridgeOptions
) -> Result<MallocBytes, BridgeErrors> {
    validate_raw_pixels(pixels, width, height)?;

    let quality = clamp_quality(quality);

    let mut ctx = CompressContext::new(options.get_strict_mode());
    ctx.state = CallState::Invoked;

    let result = trap(|| unsafe { ctx.compress(pixels, width, height, quality) });

    let output = match result {
        Ok(()) => {
            ctx.state = CallState::Completed;
            Ok(ctx.take_output())
        }
        Err(err) => {
            ctx.state = CallState::Trapped;
            debug!("JPEG compression trapped: {}", err);
            Err(err)
        }
    };
    ctx.cleanup();

    if ctx.err.num_warnings() > 0 {
        debug!("libjpeg emitted {} warnings", ctx.err.num_warnings());
    }
    output
}

/// Decompress a JPEG stream into 4 channel pixels
///
/// YCbCr, RGB and grayscale streams are converted to RGBA, four channel
/// streams (CMYK, YCCK and unknown) are returned without color conversion.
///
/// # Errors
/// - `CodecFatal` for anything libjpeg rejects, or a warning in strict mode
/// - `LimitExceeded` when the header's dimensions are over the configured limits
/// - `MalformedInput` for streams that don't decode to four channels
pub fn decode(data: &[u8], options: &BridgeOptions) -> Result<DecodedJpeg, BridgeErrors> {
    let mut ctx = DecompressContext::new(options.get_strict_mode());
    ctx.state = CallState::Invoked;

    let result = trap(|| unsafe { ctx.decompress(data, options) });

    let output = match result {
        Ok(Ok((width, height))) => {
            ctx.state = CallState::Completed;

            let pixels = ctx.pixels.take().unwrap_or_else(MallocBytes::empty);
            Ok(DecodedJpeg {
                width,
                height,
                pixels
            })
        }
        Ok(Err(err)) => {
            ctx.state = CallState::Refused;
            debug!("JPEG decompression refused: {}", err);
            Err(err)
        }
        Err(err) => {
            ctx.state = CallState::Trapped;
            debug!("JPEG decompression trapped: {}", err);
            Err(err)
        }
    };
    ctx.cleanup();

    output
}
