//! Test fixtures: decodable image blobs and hostile payloads.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// PNG with a noisy pattern so the payload does not compress away.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(ImageFormat::Png, width, height)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(ImageFormat::Jpeg, width, height)
}

fn encode(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x.wrapping_mul(31) ^ y.wrapping_mul(17)) as u8,
            (x.wrapping_add(y).wrapping_mul(73)) as u8,
            (x ^ y) as u8,
        ])
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), format)
        .expect("encode fixture image");
    out
}

/// A Windows executable renamed to look like an image: valid extension and
/// declared MIME type, but the bytes do not decode.
pub fn masquerading_executable() -> Vec<u8> {
    let mut data = b"MZ\x90\x00\x03\x00\x00\x00\x04\x00\x00\x00\xff\xff".to_vec();
    data.resize(256, 0);
    data
}

/// Opaque payload one byte over the given limit.
pub fn oversized_blob(limit: usize) -> Vec<u8> {
    vec![0u8; limit + 1]
}
