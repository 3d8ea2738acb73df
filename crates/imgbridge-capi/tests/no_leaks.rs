/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Alternating good and bad calls must not grow the heap
//!
//! The Rust global allocator is counted directly. libjpeg and the boundary
//! allocate with `malloc`, on glibc those bytes are read from `mallinfo2`.
//! This file holds a single test so nothing else allocates concurrently.
use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr;
use std::sync::atomic::{AtomicIsize, Ordering};

use imb_c::*;
use imgbridge::{Bridge, BridgeOptions};
use nanorand::{Rng, WyRand};

struct Counting;

static LIVE_BYTES: AtomicIsize = AtomicIsize::new(0);

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size() as isize, Ordering::SeqCst);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        LIVE_BYTES.fetch_sub(layout.size() as isize, Ordering::SeqCst);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new = System.realloc(ptr, layout, new_size);
        if !new.is_null() {
            LIVE_BYTES.fetch_add(new_size as isize - layout.size() as isize, Ordering::SeqCst);
        }
        new
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

/// Bytes handed out by malloc, including chunks served by mmap
#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn malloc_in_use() -> usize {
    let info = unsafe { libc::mallinfo2() };
    info.uordblks + info.hblkhd
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn malloc_in_use() -> usize {
    0
}

/// A noisy JPEG cut in the middle of its last scan, after the header
fn truncated_jpeg() -> Vec<u8> {
    let mut pixels = vec![0_u8; 64 * 64 * 4];
    WyRand::new_seed(64).fill(&mut pixels);

    let jpeg = Bridge::default().encode_jpeg(&pixels, 64, 64, 95).unwrap();
    let jpeg = jpeg.as_slice();

    let last_scan = jpeg.windows(2).rposition(|w| w == [0xFF, 0xDA]).unwrap();
    jpeg[..last_scan + (jpeg.len() - last_scan) / 2].to_vec()
}

struct Inputs {
    pixels:    Vec<u8>,
    garbage:   Vec<u8>,
    truncated: Vec<u8>,
    strict:    Bridge
}

unsafe fn one_round(i: usize, inputs: &Inputs) {
    let Inputs {
        pixels,
        garbage,
        truncated,
        strict
    } = inputs;

    let mut out = ptr::null_mut();
    let mut len = 0;
    let (mut width, mut height) = (0, 0);
    let mut msg = ptr::null_mut();

    match i % 6 {
        0 => {
            let status = imb_encode_jpeg(pixels.as_ptr(), 8, 8, 80, &mut out, &mut len, &mut msg);
            assert_eq!(status, IMB_OK);
            imb_jpeg_free(out);
        }
        1 => {
            let status = imb_decode_jpeg(
                garbage.as_ptr(),
                garbage.len() as u32,
                &mut out,
                &mut width,
                &mut height,
                &mut msg
            );
            assert_ne!(status, IMB_OK);
            imb_free(msg.cast());
        }
        2 => {
            let status = imb_encode_image(pixels.as_ptr(), 8, 8, 1, &mut out, &mut len, &mut msg);
            assert_eq!(status, IMB_OK);
            imb_codec_free(out, len as usize);
        }
        3 => {
            let status = imb_decode_image(
                garbage.as_ptr(),
                garbage.len() as u32,
                1,
                &mut out,
                &mut width,
                &mut height,
                &mut msg
            );
            assert_ne!(status, IMB_OK);
            imb_free(msg.cast());
        }
        4 => {
            // libjpeg refuses an empty image, the trap unwinds out of start_compress
            let status = imb_encode_jpeg(pixels.as_ptr(), 0, 4, 80, &mut out, &mut len, &mut msg);
            assert!(status > 0, "status {}", status);
            imb_free(msg.cast());
        }
        _ => {
            // the pixel buffer is allocated before the scan data runs out
            assert!(strict.decode_jpeg(truncated).is_err());
        }
    }
    assert!(out.is_null() || i % 2 == 0);
}

#[test]
fn ten_thousand_alternating_calls() {
    let mut pixels = vec![0_u8; 8 * 8 * 4];
    WyRand::new_seed(10_000).fill(&mut pixels);

    let inputs = Inputs {
        pixels,
        garbage: b"\x00\x01 neither a jpeg nor a png \xFF\xD9".to_vec(),
        truncated: truncated_jpeg(),
        strict: Bridge::new(BridgeOptions::strict())
    };

    // first calls may set up lazy state in std and libjpeg
    for i in 0..64 {
        unsafe { one_round(i, &inputs) };
    }
    let rust_before = LIVE_BYTES.load(Ordering::SeqCst);
    let malloc_before = malloc_in_use();

    for i in 0..10_002 {
        unsafe { one_round(i, &inputs) };
    }
    let rust_after = LIVE_BYTES.load(Ordering::SeqCst);
    let malloc_after = malloc_in_use();

    assert_eq!(rust_before, rust_after, "{} Rust heap bytes leaked", rust_after - rust_before);
    assert_eq!(
        malloc_before,
        malloc_after,
        "{} malloc bytes leaked",
        malloc_after as isize - malloc_before as isize
    );
}
