// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// Thin wrapper around the bsdiff-android crate's BSDF2/legacy-BSDIFF40 patch
// application. Both SOURCE_BSDIFF and BROTLI_BSDIFF operations land here: the
// patch header itself carries the inner control/diff/extra stream codec, so
// there is no outer decompression step to perform before calling in.

use crate::error::{PayloadError, Result};

pub fn apply(source: &[u8], patch: &[u8]) -> Result<Vec<u8>> {
    let mut patched = Vec::new();
    bsdiff_android::patch_bsdf2(source, patch, &mut patched).map_err(|e| {
        PayloadError::DecodeError {
            codec: "bsdiff",
            cause: e.to_string(),
        }
    })?;
    Ok(patched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_offtin(value: i64) -> [u8; 8] {
        let mut buf = (value.unsigned_abs()).to_le_bytes();
        if value < 0 {
            buf[7] |= 0x80;
        }
        buf
    }

    /// BSDF2 patch (uncompressed streams) turning "aaaaaaaa" into "aaabaaaa"
    /// with a single add-only control record.
    #[test]
    fn applies_single_record_patch() {
        let source = b"aaaaaaaa";
        let diff = [0u8, 0, 1, 0, 0, 0, 0, 0];

        let mut control = Vec::new();
        control.extend_from_slice(&encode_offtin(8)); // add_len
        control.extend_from_slice(&encode_offtin(0)); // copy_len
        control.extend_from_slice(&encode_offtin(0)); // seek_adj

        let mut patch = Vec::new();
        patch.extend_from_slice(b"BSDF2\x00\x00\x00");
        patch.extend_from_slice(&encode_offtin(control.len() as i64));
        patch.extend_from_slice(&encode_offtin(diff.len() as i64));
        patch.extend_from_slice(&encode_offtin(8)); // new_size
        patch.extend_from_slice(&control);
        patch.extend_from_slice(&diff);

        let patched = apply(source, &patch).unwrap();
        assert_eq!(&patched, b"aaabaaaa");
    }

    #[test]
    fn malformed_patch_is_rejected() {
        let source = b"aaaaaaaa";
        let garbage_patch = vec![0xFFu8; 32];
        assert!(apply(source, &garbage_patch).is_err());
    }

    #[test]
    fn empty_patch_is_rejected() {
        let source = b"aaaaaaaa";
        assert!(apply(source, &[]).is_err());
    }
}
