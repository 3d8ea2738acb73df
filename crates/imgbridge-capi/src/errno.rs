/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Status codes and error messages
//!
//! Every entry point returns an `int` status. `IMB_OK` (0) means success,
//! a positive value is libjpeg's own message code, negative values are
//! defined here and mirror [`imgbridge::errors::status`].
//!
//! On failure a NUL terminated message is allocated with `imb_malloc`
//! and written to `out_msg`, release it with `imb_free`.
use std::any::Any;
use std::ffi::{c_char, c_int, CString};
use std::panic::{self, AssertUnwindSafe};

use imgbridge::errors::status;
use imgbridge::BridgeErrors;
use log::debug;

use crate::utils::imb_malloc;

pub const IMB_OK: c_int = status::OK;
pub const IMB_UNSUPPORTED_FORMAT: c_int = status::UNSUPPORTED_FORMAT;
pub const IMB_ALLOCATION_FAILURE: c_int = status::ALLOCATION_FAILURE;
pub const IMB_MALFORMED_INPUT: c_int = status::MALFORMED_INPUT;
pub const IMB_CODEC_ERROR: c_int = status::CODEC_ERROR;
pub const IMB_LIMIT_EXCEEDED: c_int = status::LIMIT_EXCEEDED;
pub const IMB_PANICKED: c_int = status::PANICKED;
pub const IMB_NULL_ARGUMENT: c_int = status::NULL_ARGUMENT;
pub const IMB_CODEC_FATAL: c_int = status::CODEC_FATAL;

/// Copy `text` into a fresh `imb_malloc` buffer, NUL terminated
///
/// Interior NULs are replaced. Returns null if the allocation fails.
pub(crate) fn new_message(text: &str) -> *mut c_char {
    let msg = CString::new(text.replace('\0', "?")).unwrap_or_default();
    let bytes = msg.as_bytes_with_nul();

    let mem = unsafe { imb_malloc(bytes.len()) }.cast::<c_char>();
    if mem.is_null() {
        return mem;
    }
    unsafe { libc::strcpy(mem, msg.as_ptr()) };
    mem
}

/// Write `value` through `ptr` if it isn't null
pub(crate) unsafe fn reset<T>(ptr: *mut T, value: T) {
    if let Some(slot) = ptr.as_mut() {
        *slot = value;
    }
}

/// Turn a required out pointer into a reference
pub(crate) unsafe fn required<'a, T>(
    ptr: *mut T, name: &'static str
) -> Result<&'a mut T, BridgeErrors> {
    ptr.as_mut().ok_or(BridgeErrors::NullArgument(name))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("unknown panic payload"))
}

/// Run `call` and resolve its outcome to a status code
///
/// On failure the message is written to `out_msg`, which the caller
/// must have checked to be non-null. Nothing unwinds out of here.
pub(crate) unsafe fn resolve<F>(name: &str, out_msg: *mut *mut c_char, call: F) -> c_int
where
    F: FnOnce() -> Result<(), BridgeErrors>
{
    let result = panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(BridgeErrors::Panicked(panic_message(payload.as_ref()))));

    match result {
        Ok(()) => IMB_OK,
        Err(err) => {
            debug!("{} failed: {}", name, err);

            let msg = new_message(&err.to_string());
            if msg.is_null() {
                return IMB_ALLOCATION_FAILURE;
            }
            *out_msg = msg;
            err.status()
        }
    }
}

/// A null-safe view of caller memory
///
/// A null pointer is only accepted for an empty slice.
pub(crate) unsafe fn input<'a>(
    data: *const u8, len: usize, name: &'static str
) -> Result<&'a [u8], BridgeErrors> {
    if data.is_null() {
        if len == 0 {
            return Ok(&[]);
        }
        return Err(BridgeErrors::NullArgument(name));
    }
    if len > isize::MAX as usize {
        return Err(BridgeErrors::MalformedInput(format!("`{}` is {} bytes long", name, len)));
    }
    Ok(std::slice::from_raw_parts(data, len))
}
