/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use imgbridge::{Bridge, ImageType, CHANNELS};
use nanorand::{Rng, WyRand};

const WIDTH: u32 = 512;
const HEIGHT: u32 = 512;

fn pixels() -> Vec<u8>
{
    let mut pixels = vec![0_u8; WIDTH as usize * HEIGHT as usize * CHANNELS];
    // smooth gradient with a little noise, closer to a photo than pure noise
    let mut rng = WyRand::new_seed(512);
    for (i, chunk) in pixels.chunks_exact_mut(CHANNELS).enumerate()
    {
        let x = (i % WIDTH as usize) as u8;
        let y = (i / WIDTH as usize) as u8;
        let n = rng.generate_range(0_u8..8);
        chunk.copy_from_slice(&[x.wrapping_add(n), y, x ^ y, 255]);
    }
    pixels
}

fn jpeg_bench(c: &mut Criterion)
{
    let bridge = Bridge::default();
    let pixels = pixels();
    let jpeg = bridge.encode_jpeg(&pixels, WIDTH, HEIGHT, 90).unwrap();

    let mut group = c.benchmark_group("[jpeg]: libjpeg through the error trap");
    group.throughput(Throughput::Bytes(pixels.len() as u64));

    group.bench_function("JPEG encode q90", |b| {
        b.iter(|| black_box(bridge.encode_jpeg(&pixels, WIDTH, HEIGHT, 90).unwrap()))
    });

    group.bench_function("JPEG decode", |b| {
        b.iter(|| black_box(bridge.decode_jpeg(jpeg.as_slice()).unwrap()))
    });

    group.bench_function("JPEG decode, trapped failure", |b| {
        b.iter(|| black_box(bridge.decode_jpeg(b"not a jpeg").is_err()))
    });
}

fn raster_bench(c: &mut Criterion)
{
    let bridge = Bridge::default();
    let pixels = pixels();

    let mut group = c.benchmark_group("[raster]: image-rs PNG and TGA");
    group.throughput(Throughput::Bytes(pixels.len() as u64));

    for image_type in [ImageType::Png, ImageType::Tga]
    {
        let code = image_type.code();
        let encoded = bridge.encode_image(&pixels, WIDTH, HEIGHT, code).unwrap();

        group.bench_function(format!("{:?} encode", image_type), |b| {
            b.iter(|| black_box(bridge.encode_image(&pixels, WIDTH, HEIGHT, code).unwrap()))
        });

        group.bench_function(format!("{:?} decode", image_type), |b| {
            b.iter(|| black_box(bridge.decode_image(encoded.as_slice(), code).unwrap()))
        });
    }
}

criterion_group!(name=benches;
      config={
      let c = Criterion::default();
        c.measurement_time(Duration::from_secs(10))
      };
    targets=jpeg_bench,raster_bench);

criterion_main!(benches);
