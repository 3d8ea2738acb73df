/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use imgbridge::{Allocator, Bridge, BridgeErrors, CHANNELS};
use nanorand::{Rng, WyRand};

fn solid(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    pixel.repeat((width * height) as usize)
}

fn reference_dimensions(jpeg: &[u8]) -> (u16, u16) {
    let mut decoder = jpeg_decoder::Decoder::new(jpeg);
    decoder.read_info().unwrap();
    let info = decoder.info().unwrap();
    (info.width, info.height)
}

#[test]
fn solid_red_4x4() {
    let bridge = Bridge::default();
    let red = solid(4, 4, [255, 0, 0, 255]);

    let jpeg = bridge.encode_jpeg(&red, 4, 4, 90).unwrap();
    assert_eq!(jpeg.allocator(), Allocator::Libjpeg);
    assert_eq!(jpeg.dimensions(), (4, 4));
    assert!(!jpeg.is_empty());
    assert_eq!(&jpeg.as_slice()[..2], &[0xFF, 0xD8]);

    let pixels = bridge.decode_jpeg(jpeg.as_slice()).unwrap();
    assert_eq!(pixels.allocator(), Allocator::Boundary);
    assert_eq!(pixels.dimensions(), (4, 4));
    assert_eq!(pixels.len(), 4 * 4 * CHANNELS);

    // flat blocks survive quantization almost untouched
    for chunk in pixels.as_slice().chunks_exact(CHANNELS) {
        for (got, expected) in chunk.iter().zip([255_u8, 0, 0, 255]) {
            assert!(
                got.abs_diff(expected) <= 8,
                "pixel {:?} too far from red",
                chunk
            );
        }
    }
}

#[test]
fn random_sizes_keep_their_dimensions() {
    let bridge = Bridge::default();
    let mut rng = WyRand::new_seed(0x1BAD_B002);

    for _ in 0..12 {
        let width = rng.generate_range(1_u32..=96);
        let height = rng.generate_range(1_u32..=96);

        let mut pixels = vec![0_u8; (width * height) as usize * CHANNELS];
        rng.fill(&mut pixels);

        let jpeg = bridge.encode_jpeg(&pixels, width, height, 75).unwrap();
        assert_eq!(
            reference_dimensions(jpeg.as_slice()),
            (width as u16, height as u16)
        );

        let decoded = bridge.decode_jpeg(jpeg.as_slice()).unwrap();
        assert_eq!(decoded.dimensions(), (width, height));
        assert_eq!(decoded.len(), (width * height) as usize * CHANNELS);
    }
}

#[test]
fn out_of_range_quality_is_clamped() {
    let bridge = Bridge::default();
    let mut pixels = vec![0_u8; 16 * 16 * CHANNELS];
    WyRand::new_seed(7).fill(&mut pixels);

    let lowest = bridge.encode_jpeg(&pixels, 16, 16, 1).unwrap();
    let highest = bridge.encode_jpeg(&pixels, 16, 16, 100).unwrap();

    for quality in [0, -1, i32::MIN] {
        let clamped = bridge.encode_jpeg(&pixels, 16, 16, quality).unwrap();
        assert_eq!(clamped.as_slice(), lowest.as_slice());
    }
    for quality in [101, 250, i32::MAX] {
        let clamped = bridge.encode_jpeg(&pixels, 16, 16, quality).unwrap();
        assert_eq!(clamped.as_slice(), highest.as_slice());
    }
}

#[test]
fn zero_dimensions_fail_inside_libjpeg() {
    let bridge = Bridge::default();

    let err = bridge.encode_jpeg(&[], 0, 4, 90).unwrap_err();
    match err {
        BridgeErrors::CodecFatal { code, ref message } => {
            assert!(code > 0);
            assert!(!message.is_empty());
        }
        other => panic!("expected a trapped libjpeg error, got {:?}", other)
    }
}

#[test]
fn pixel_length_mismatch() {
    let bridge = Bridge::default();
    let pixels = solid(4, 4, [1, 2, 3, 4]);

    let err = bridge.encode_jpeg(&pixels[1..], 4, 4, 90).unwrap_err();
    assert!(matches!(err, BridgeErrors::MalformedInput(_)));
    assert_eq!(err.status(), imgbridge::errors::status::MALFORMED_INPUT);
}

#[test]
fn bridge_is_shareable_between_threads() {
    let bridge = std::sync::Arc::new(Bridge::default());

    let handles: Vec<_> = (0..4_u8)
        .map(|i| {
            let bridge = bridge.clone();
            std::thread::spawn(move || {
                let pixels = solid(8, 8, [i * 40, 10, 20, 255]);
                let jpeg = bridge.encode_jpeg(&pixels, 8, 8, 80).unwrap();
                bridge.decode_jpeg(jpeg.as_slice()).unwrap().dimensions()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), (8, 8));
    }
}
