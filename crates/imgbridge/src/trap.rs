/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Error trap for libjpeg
//!
//! libjpeg never returns an error code. When something fatal happens deep inside
//! a compress or decompress routine it calls `err->error_exit` and expects that
//! function not to return.
//!
//! The trap installs an `error_exit` that renders libjpeg's message with libjpeg's
//! own `format_message`, then unwinds with a [`FatalSignal`] payload. The unwind skips
//! every libjpeg frame in between (the callbacks are `C-unwind`), and stops at the
//! `catch_unwind` in [`trap`], which is the resumption point. From there the signal
//! is turned into [`BridgeErrors::CodecFatal`].
//!
//! The unwind tears nothing down on the libjpeg side, the context owner
//! must call `jpeg_destroy_*` and release any output it began, see
//! [`codecs::jpeg`](crate::codecs::jpeg).
//!
//! The resumption point belongs to one call on one thread, so error managers
//! are built per call and never shared.

use std::any::Any;
use std::ffi::c_int;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use log::{log_enabled, trace, warn, Level};
use mozjpeg_sys::{jpeg_common_struct, jpeg_error_mgr, jpeg_std_error};

use crate::errors::BridgeErrors;

/// Where a trapped call is in its life
///
/// `Completed`, `Refused` and `Trapped` are mutually exclusive, each is
/// followed by cleanup, which leaves the call `Returned`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CallState {
    Idle,
    Invoked,
    Completed,
    /// The boundary rejected the call after libjpeg started, no unwind
    Refused,
    Trapped,
    Returned
}

/// Payload carried by the unwind started in `error_exit`
struct FatalSignal {
    code:    c_int,
    message: String
}

/// libjpeg error manager with room for our own state
///
/// libjpeg only sees the leading `jpeg_error_mgr`, the callbacks cast
/// `cinfo->err` back to this struct to reach the rest.
#[repr(C)]
pub(crate) struct TrapErrorMgr {
    handler: jpeg_error_mgr,
    strict:  bool
}

impl TrapErrorMgr {
    /// Create an error manager whose fatal errors unwind to [`trap`]
    ///
    /// If `strict` is set, warnings unwind too.
    pub(crate) fn new(strict: bool) -> TrapErrorMgr {
        // safety: jpeg_error_mgr is a plain C struct, zeroed is a valid
        // starting point and jpeg_std_error fills in every field.
        let mut handler: jpeg_error_mgr = unsafe { mem::zeroed() };
        unsafe { jpeg_std_error(&mut handler) };

        handler.error_exit = Some(trap_error_exit);
        handler.emit_message = Some(trap_emit_message);

        TrapErrorMgr { handler, strict }
    }

    /// Pointer to hand to `cinfo.common.err`
    ///
    /// The manager must not move while libjpeg holds this pointer.
    pub(crate) fn as_mut_ptr(&mut self) -> *mut jpeg_error_mgr {
        &mut self.handler
    }

    /// Number of warnings libjpeg emitted so far
    pub(crate) fn num_warnings(&self) -> i64 {
        self.handler.num_warnings as i64
    }
}

/// Render the current libjpeg message into an owned string
///
/// # Safety
/// `cinfo.err` must be null or point to a live `jpeg_error_mgr`
unsafe fn render_message(cinfo: &mut jpeg_common_struct) -> (c_int, String) {
    let (code, format_message) = match cinfo.err.as_ref() {
        Some(err) => (err.msg_code, err.format_message),
        None => return (0, String::from("libjpeg error without an error manager"))
    };

    let message = match format_message {
        Some(format_message) => {
            // fixed capacity buffer, libjpeg truncates to fit
            let buffer = mem::zeroed();
            // safety: libjpeg writes through this reference. The binding takes
            // `&[c_char; JMSG_LENGTH_MAX]`, the buffer is a local nothing else
            // observes until the call returns.
            format_message(cinfo, &buffer);

            let bytes: Vec<u8> = buffer.iter().map(|&c| c as u8).take_while(|&c| c != 0).collect();
            String::from_utf8_lossy(&bytes).into_owned()
        }
        None => format!("libjpeg error {}", code)
    };
    (code, message)
}

/// Never returns, the unwind lands in [`trap`]
///
/// # Safety
/// Only libjpeg calls this, with `cinfo` set up by a context of this crate
#[cold]
unsafe extern "C-unwind" fn trap_error_exit(cinfo: &mut jpeg_common_struct) {
    let (code, message) = render_message(cinfo);

    // resume_unwind skips the panic hook, nothing is printed
    panic::resume_unwind(Box::new(FatalSignal { code, message }))
}

extern "C-unwind" fn trap_emit_message(cinfo: &mut jpeg_common_struct, msg_level: c_int) {
    if msg_level < 0 {
        let mgr = cinfo.err.cast::<TrapErrorMgr>();

        // safety: every context in this crate installs a TrapErrorMgr
        let strict = match unsafe { mgr.as_mut() } {
            Some(mgr) => {
                mgr.handler.num_warnings += 1;
                mgr.strict
            }
            None => false
        };
        if strict {
            unsafe { trap_error_exit(cinfo) };
        }
        let (code, message) = unsafe { render_message(cinfo) };
        warn!("libjpeg warning {}: {}", code, message);
    } else if log_enabled!(Level::Trace) {
        let (code, message) = unsafe { render_message(cinfo) };
        trace!("libjpeg trace {} (level {}): {}", code, msg_level, message);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    String::from("unknown panic payload")
}

/// Run `call`, converting a libjpeg fatal error into a `CodecFatal` error
///
/// Any other panic raised inside `call` is reported as `Panicked`,
/// nothing unwinds past this function.
pub(crate) fn trap<F, R>(call: F) -> Result<R, BridgeErrors>
where
    F: FnOnce() -> R
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<FatalSignal>() {
            Ok(signal) => Err(BridgeErrors::CodecFatal {
                code:    signal.code,
                message: signal.message
            }),
            Err(other) => Err(BridgeErrors::Panicked(panic_message(other.as_ref())))
        }
    }
}
