/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Forward log records to the host
//!
//! The library logs through the `log` facade. A host that wants to see those
//! records registers a callback with `imb_set_log_callback`, every record at or
//! below the chosen level is then handed to it as an [`ImbLogMessage`].
use std::ffi::{c_char, c_int, CString};
use std::sync::{OnceLock, RwLock};

use log::{LevelFilter, Log, Metadata, Record};

/// A log record as seen by the host
///
/// The strings are only valid for the duration of the callback.
#[repr(C)]
pub struct ImbLogMessage {
    /// 1 error, 2 warn, 3 info, 4 debug, 5 trace
    pub level:   c_int,
    /// Module that emitted the record, NUL terminated
    pub target:  *const c_char,
    /// The formatted record, NUL terminated
    pub message: *const c_char
}

pub type ImbLogCallback = Option<unsafe extern "C" fn(message: *const ImbLogMessage)>;

static CALLBACK: RwLock<ImbLogCallback> = RwLock::new(None);
static INSTALLED: OnceLock<bool> = OnceLock::new();
static LOGGER: HostLogger = HostLogger;

struct HostLogger;

fn c_string(text: String) -> CString {
    CString::new(text.replace('\0', "?")).unwrap_or_default()
}

fn level_filter(level: c_int) -> LevelFilter {
    match level {
        i32::MIN..=0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    }
}

fn current_callback() -> ImbLogCallback {
    // a poisoned slot still holds a valid fn pointer
    match CALLBACK.read() {
        Ok(slot) => *slot,
        Err(poisoned) => *poisoned.into_inner()
    }
}

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && current_callback().is_some()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // copied out so the callback may re-register without deadlocking
        let Some(callback) = current_callback() else {
            return;
        };
        let target = c_string(record.target().to_string());
        let message = c_string(record.args().to_string());

        let msg = ImbLogMessage {
            level:   record.level() as c_int,
            target:  target.as_ptr(),
            message: message.as_ptr()
        };
        unsafe { callback(&msg) };
    }

    fn flush(&self) {}
}

/// \brief Send library log records to `callback`
///
/// @param callback: Receives every record at or below `max_level`, null detaches
/// @param max_level: 0 off, 1 error, 2 warn, 3 info, 4 debug, 5 trace
///
/// @returns true if this library owns the process logger, false if something
/// else registered with the `log` facade first, in which case records never reach `callback`
#[no_mangle]
pub extern "C" fn imb_set_log_callback(callback: ImbLogCallback, max_level: c_int) -> bool {
    let installed = *INSTALLED.get_or_init(|| log::set_logger(&LOGGER).is_ok());

    match CALLBACK.write() {
        Ok(mut slot) => *slot = callback,
        Err(poisoned) => *poisoned.into_inner() = callback
    }
    if installed {
        let filter = if callback.is_some() {
            level_filter(max_level)
        } else {
            LevelFilter::Off
        };
        log::set_max_level(filter);
    }
    installed
}
