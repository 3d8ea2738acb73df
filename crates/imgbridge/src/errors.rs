/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Errors raised at the boundary and the status codes they map to

use std::fmt::{Debug, Display, Formatter};

/// Status codes handed to the external caller
///
/// `OK` is the only zero value. Trapped libjpeg failures report libjpeg's own
/// (positive) message code instead of any of these, so boundary codes are
/// negative to stay clear of libjpeg's range.
pub mod status {
    pub const OK: i32 = 0;
    pub const UNSUPPORTED_FORMAT: i32 = -1;
    pub const ALLOCATION_FAILURE: i32 = -2;
    pub const MALFORMED_INPUT: i32 = -3;
    pub const CODEC_ERROR: i32 = -4;
    pub const LIMIT_EXCEEDED: i32 = -5;
    pub const PANICKED: i32 = -6;
    pub const NULL_ARGUMENT: i32 = -7;
    /// libjpeg trapped but its error record carried no message code
    pub const CODEC_FATAL: i32 = -8;
}

/// Everything that can go wrong in a boundary call
pub enum BridgeErrors {
    /// The format code isn't known, or it is known but the called
    /// operation has no backend for it.
    UnsupportedFormat { code: u32, detail: &'static str },
    /// Allocation of the given number of bytes failed
    AllocationFailure(usize),
    /// The input failed validation before reaching a backend
    MalformedInput(String),
    /// libjpeg raised a fatal error which was caught by the trap
    CodecFatal { code: i32, message: String },
    /// The safe codec returned an error
    Codec(image::ImageError),
    /// Image dimensions exceed the configured limits
    LimitExceeded {
        width:      u32,
        height:     u32,
        max_width:  u32,
        max_height: u32
    },
    /// A panic other than a libjpeg trap was caught at the boundary
    Panicked(String),
    /// A required pointer argument was null
    NullArgument(&'static str)
}

impl BridgeErrors {
    /// The status code reported to a C caller for this error
    pub fn status(&self) -> i32 {
        match self {
            Self::UnsupportedFormat { .. } => status::UNSUPPORTED_FORMAT,
            Self::AllocationFailure(_) => status::ALLOCATION_FAILURE,
            Self::MalformedInput(_) => status::MALFORMED_INPUT,
            Self::CodecFatal { code, .. } => {
                if *code == 0 {
                    status::CODEC_FATAL
                } else {
                    *code
                }
            }
            Self::Codec(_) => status::CODEC_ERROR,
            Self::LimitExceeded { .. } => status::LIMIT_EXCEEDED,
            Self::Panicked(_) => status::PANICKED,
            Self::NullArgument(_) => status::NULL_ARGUMENT
        }
    }
}

impl Debug for BridgeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormat { code, detail } => {
                write!(f, "Unsupported format code {}: {}", code, detail)
            }
            Self::AllocationFailure(size) => {
                write!(f, "Could not allocate a buffer of {} bytes", size)
            }
            Self::MalformedInput(reason) => write!(f, "Malformed input: {}", reason),
            Self::CodecFatal { code, message } => {
                write!(f, "libjpeg error {}: {}", code, message)
            }
            Self::Codec(err) => write!(f, "Codec error: {}", err),
            Self::LimitExceeded {
                width,
                height,
                max_width,
                max_height
            } => write!(
                f,
                "Image dimensions {}x{} exceed the configured limit of {}x{}",
                width, height, max_width, max_height
            ),
            Self::Panicked(reason) => write!(f, "Codec panicked: {}", reason),
            Self::NullArgument(name) => write!(f, "Argument `{}` is null", name)
        }
    }
}

impl Display for BridgeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for BridgeErrors {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            _ => None
        }
    }
}

impl From<image::ImageError> for BridgeErrors {
    fn from(value: image::ImageError) -> Self {
        BridgeErrors::Codec(value)
    }
}
