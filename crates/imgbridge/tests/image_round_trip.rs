/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::sync::atomic::{AtomicUsize, Ordering};

use imgbridge::codecs::raster::{DecodedRaster, RasterCodec};
use imgbridge::errors::status;
use imgbridge::{Allocator, Bridge, BridgeErrors, BridgeOptions, CodecFormat, ImageType, CHANNELS};
use nanorand::{Rng, WyRand};

/// Counts calls and refuses to do any work
#[derive(Default)]
struct CountingCodec {
    calls: AtomicUsize
}

impl RasterCodec for CountingCodec {
    fn encode(
        &self, _: &[u8], _: u32, _: u32, _: CodecFormat
    ) -> Result<Box<[u8]>, BridgeErrors> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Box::default())
    }

    fn decode(
        &self, _: &[u8], _: CodecFormat, _: &BridgeOptions
    ) -> Result<DecodedRaster, BridgeErrors> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(DecodedRaster {
            width:  0,
            height: 0,
            pixels: Box::default()
        })
    }
}

fn random_pixels(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut pixels = vec![0_u8; (width * height) as usize * CHANNELS];
    WyRand::new_seed(seed).fill(&mut pixels);
    pixels
}

fn round_trip(image_type: ImageType) {
    let bridge = Bridge::default();

    for (width, height) in [(1, 1), (7, 3), (33, 17)] {
        let pixels = random_pixels(width, height, u64::from(width * height));

        let encoded = bridge
            .encode_image(&pixels, width, height, image_type.code())
            .unwrap();
        assert_eq!(encoded.allocator(), Allocator::Codec);
        assert_eq!(encoded.dimensions(), (width, height));

        let decoded = bridge
            .decode_image(encoded.as_slice(), image_type.code())
            .unwrap();
        assert_eq!(decoded.allocator(), Allocator::Codec);
        assert_eq!(decoded.dimensions(), (width, height));
        assert_eq!(decoded.as_slice(), &pixels[..]);
    }
}

#[test]
fn png_round_trip() {
    round_trip(ImageType::Png);
}

#[test]
fn tga_round_trip() {
    round_trip(ImageType::Tga);
}

#[test]
fn unsupported_codes_reach_no_backend() {
    let bridge = Bridge::with_raster_codec(BridgeOptions::default(), CountingCodec::default());
    let pixels = random_pixels(2, 2, 1);

    for code in [ImageType::Jpeg.code(), ImageType::Blp1.code(), 4, 99, u32::MAX] {
        let err = bridge.encode_image(&pixels, 2, 2, code).unwrap_err();
        assert_eq!(err.status(), status::UNSUPPORTED_FORMAT);

        let err = bridge.decode_image(&pixels, code).unwrap_err();
        assert_eq!(err.status(), status::UNSUPPORTED_FORMAT);
    }
    assert_eq!(bridge.raster_codec().calls.load(Ordering::SeqCst), 0);

    // a supported code does reach it
    bridge
        .encode_image(&pixels, 2, 2, ImageType::Png.code())
        .unwrap();
    assert_eq!(bridge.raster_codec().calls.load(Ordering::SeqCst), 1);
}

#[test]
fn garbage_is_a_codec_error() {
    let bridge = Bridge::default();

    let err = bridge
        .decode_image(b"definitely not an image", ImageType::Png.code())
        .unwrap_err();
    assert!(matches!(err, BridgeErrors::Codec(_)));
    assert_eq!(err.status(), status::CODEC_ERROR);

    assert!(bridge
        .decode_image(b"definitely not an image", ImageType::Tga.code())
        .is_err());
}

#[test]
fn mismatched_length_is_rejected_before_encoding() {
    let bridge = Bridge::with_raster_codec(BridgeOptions::default(), CountingCodec::default());

    let err = bridge
        .encode_image(&[0; 12], 2, 2, ImageType::Tga.code())
        .unwrap_err();
    assert!(matches!(err, BridgeErrors::MalformedInput(_)));
    assert_eq!(bridge.raster_codec().calls.load(Ordering::SeqCst), 0);
}

#[test]
fn decode_limits() {
    let pixels = random_pixels(40, 10, 3);
    let png = Bridge::default()
        .encode_image(&pixels, 40, 10, ImageType::Png.code())
        .unwrap();

    let bridge = Bridge::new(BridgeOptions::default().set_max_width(39));
    let err = bridge
        .decode_image(png.as_slice(), ImageType::Png.code())
        .unwrap_err();
    assert_eq!(err.status(), status::LIMIT_EXCEEDED);
}
