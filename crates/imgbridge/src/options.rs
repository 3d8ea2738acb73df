/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Per-bridge options

use crate::errors::BridgeErrors;

/// Options shared by every operation of a [`Bridge`](crate::Bridge)
///
/// Not every option is respected by every backend, each field
/// lists who reads it.
#[derive(Debug, Copy, Clone)]
pub struct BridgeOptions {
    /// Maximum width accepted by encoders and produced by decoders
    ///
    /// - Default value: 16384
    /// - Respected by: `all operations`
    max_width:   u32,
    /// Maximum height accepted by encoders and produced by decoders
    ///
    /// - Default value: 16384
    /// - Respected by: `all operations`
    max_height:  u32,
    /// Treat libjpeg warnings (corrupt data, premature end of data...)
    /// as fatal errors
    ///
    /// - Default value: false
    /// - Respected by: `decode_jpeg`, `encode_jpeg`
    strict_mode: bool
}

impl Default for BridgeOptions {
    fn default() -> Self {
        BridgeOptions {
            max_width:   1 << 14,
            max_height:  1 << 14,
            strict_mode: false
        }
    }
}

impl BridgeOptions {
    /// Default limits, but libjpeg warnings become errors
    pub fn strict() -> BridgeOptions {
        BridgeOptions::default().set_strict_mode(true)
    }

    /// Get maximum width configured
    pub const fn get_max_width(&self) -> u32 {
        self.max_width
    }

    /// Get maximum height configured
    pub const fn get_max_height(&self) -> u32 {
        self.max_height
    }

    /// Whether libjpeg warnings are promoted to errors
    pub const fn get_strict_mode(&self) -> bool {
        self.strict_mode
    }

    /// Set maximum width
    pub fn set_max_width(mut self, width: u32) -> Self {
        self.max_width = width;
        self
    }

    /// Set maximum height
    pub fn set_max_height(mut self, height: u32) -> Self {
        self.max_height = height;
        self
    }

    /// Set strict mode
    pub fn set_strict_mode(mut self, yes: bool) -> Self {
        self.strict_mode = yes;
        self
    }

    /// Reject dimensions larger than the configured maximum
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), BridgeErrors> {
        if width > self.max_width || height > self.max_height {
            return Err(BridgeErrors::LimitExceeded {
                width,
                height,
                max_width: self.max_width,
                max_height: self.max_height
            });
        }
        Ok(())
    }
}
