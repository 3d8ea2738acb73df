/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Codec backends
//!
//! - [`jpeg`]: libjpeg, reached through the error trap
//! - [`raster`]: the safe codec for PNG and TGA
pub mod jpeg;
pub mod raster;
