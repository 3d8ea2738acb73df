/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! C bindings to imgbridge
//!
//! The exported functions are declared in `include/imgbridge.h`.
//!
//! - [`api`]: `imb_encode_jpeg`, `imb_decode_jpeg`, `imb_encode_image`, `imb_decode_image`
//! - [`utils`]: `imb_malloc` and the release routines
//! - [`logger`]: `imb_set_log_callback`
//! - [`errno`]: status codes
pub mod api;
pub mod errno;
pub mod logger;
pub mod utils;

pub use api::*;
pub use errno::*;
pub use logger::*;
pub use utils::*;
