// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// Buffer-oriented decompression adapters. Unlike a streaming decoder, these
// take the full operation payload already verified against its SHA-256 hash
// and return a complete plaintext buffer.

use crate::error::{PayloadError, Result};
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Identity,
    Bz2,
    Xz,
    Zstd,
}

pub fn decompress(codec: Codec, data: &[u8]) -> Result<Vec<u8>> {
    match codec {
        Codec::Identity => Ok(data.to_vec()),
        Codec::Bz2 => decompress_bz2(data),
        Codec::Xz => decompress_xz(data),
        Codec::Zstd => decompress_zstd(data),
    }
}

fn decompress_bz2(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = bzip2::read::BzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PayloadError::DecodeError {
            codec: "bz2",
            cause: e.to_string(),
        })?;
    Ok(out)
}

/// the payload manifest's REPLACE_XZ operation carries a full `.xz` container
/// in most builds of the original update_engine, but some variants embed a
/// raw LZMA1 stream instead. Try the XZ container first and fall back to raw
/// LZMA1 framing, matching what the reference implementation accepts.
fn decompress_xz(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    if lzma_rs::xz_decompress(&mut std::io::Cursor::new(data), &mut out).is_ok() {
        return Ok(out);
    }

    out.clear();
    lzma_rs::lzma_decompress(&mut std::io::Cursor::new(data), &mut out).map_err(|e| {
        PayloadError::DecodeError {
            codec: "xz/lzma",
            cause: e.to_string(),
        }
    })?;
    Ok(out)
}

fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::stream::decode_all(data).map_err(|e| PayloadError::DecodeError {
        codec: "zstd",
        cause: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn identity_is_passthrough() {
        let data = b"hello world".to_vec();
        assert_eq!(decompress(Codec::Identity, &data).unwrap(), data);
    }

    #[test]
    fn bz2_round_trip() {
        let plain = b"hello world, this is a bz2 round trip test";
        let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
        encoder.write_all(plain).unwrap();
        let compressed = encoder.finish().unwrap();

        let out = decompress(Codec::Bz2, &compressed).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn zstd_round_trip() {
        let plain = b"hello world, this is a zstd round trip test";
        let compressed = zstd::stream::encode_all(&plain[..], 3).unwrap();

        let out = decompress(Codec::Zstd, &compressed).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn xz_container_round_trip() {
        let plain = b"hello world, this is an xz round trip test";
        let mut compressed = Vec::new();
        lzma_rs::xz_compress(&mut std::io::Cursor::new(plain), &mut compressed).unwrap();

        let out = decompress(Codec::Xz, &compressed).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn xz_falls_back_to_raw_lzma1() {
        let plain = b"hello world, this is a raw lzma1 stream";
        let mut compressed = Vec::new();
        lzma_rs::lzma_compress(&mut std::io::Cursor::new(plain), &mut compressed).unwrap();

        let out = decompress(Codec::Xz, &compressed).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn corrupt_stream_is_rejected() {
        let garbage = vec![0xFFu8; 16];
        assert!(decompress(Codec::Xz, &garbage).is_err());
        assert!(decompress(Codec::Bz2, &garbage).is_err());
        assert!(decompress(Codec::Zstd, &garbage).is_err());
    }
}
