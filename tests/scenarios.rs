// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// End-to-end scenarios over synthetic operations and payloads.

use async_trait::async_trait;
use payload_extract::error::PayloadError;
use payload_extract::payload::controller::extract_partitions;
use payload_extract::payload::driver::{AsyncPayloadRead, PayloadReader};
use payload_extract::payload::engine::execute_operation;
use payload_extract::{DeltaArchiveManifest, Extent, InstallOperation, PartitionInfo, PartitionUpdate};
use sha2::{Digest, Sha256};
use std::pin::Pin;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

/// serves operation payload bytes straight out of an in-memory buffer, with
/// offsets relative to the buffer's own start (data_offset is always 0 in
/// these tests).
struct MemPayloadReader(Vec<u8>);

#[async_trait]
impl PayloadReader for MemPayloadReader {
    async fn read_range(
        &mut self,
        offset: u64,
        length: u64,
    ) -> payload_extract::error::Result<Pin<Box<dyn AsyncRead + Send + '_>>> {
        let start = offset as usize;
        let end = start + length as usize;
        Ok(Box::pin(std::io::Cursor::new(self.0[start..end].to_vec())))
    }
}

struct MemPayloadSource(Vec<u8>);

#[async_trait]
impl AsyncPayloadRead for MemPayloadSource {
    async fn open_reader(&self) -> payload_extract::error::Result<Box<dyn PayloadReader>> {
        Ok(Box::new(MemPayloadReader(self.0.clone())))
    }
}

fn extent(start_block: u64, num_blocks: u64) -> Extent {
    Extent {
        start_block: Some(start_block),
        num_blocks: Some(num_blocks),
    }
}

async fn read_file_bytes(path: &std::path::Path, len: usize) -> Vec<u8> {
    let mut file = File::open(path).await.unwrap();
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf).await.unwrap();
    buf
}

/// S1: full-OTA REPLACE writes the raw bytes into the single destination extent.
#[tokio::test]
async fn replace_writes_raw_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("boot.img");
    let mut out_file = File::create(&out_path).await.unwrap();
    out_file.set_len(4096).await.unwrap();

    let data = b"ABCD".to_vec();
    let mut reader = MemPayloadReader(data.clone());

    let op = InstallOperation {
        r#type: Some(0),
        data_offset: Some(0),
        data_length: Some(4),
        dst_extents: vec![extent(0, 1)],
        ..Default::default()
    };

    execute_operation(&op, 0, 4096, &mut reader, &mut out_file, None)
        .await
        .unwrap();
    out_file.sync_all().await.unwrap();

    let bytes = read_file_bytes(&out_path, 4).await;
    assert_eq!(&bytes, b"ABCD");
}

/// S2: ZERO fills every destination extent with zero bytes.
#[tokio::test]
async fn zero_fills_extents() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("boot.img");
    let mut out_file = File::create(&out_path).await.unwrap();
    out_file.set_len(28672).await.unwrap();

    // pre-fill with a non-zero marker so we can tell ZERO actually wrote.
    {
        use tokio::io::AsyncWriteExt;
        out_file.write_all(&vec![0xAAu8; 28672]).await.unwrap();
        out_file.flush().await.unwrap();
    }

    let mut reader = MemPayloadReader(Vec::new());
    let op = InstallOperation {
        r#type: Some(2),
        dst_extents: vec![extent(2, 1), extent(5, 2)],
        ..Default::default()
    };

    execute_operation(&op, 0, 4096, &mut reader, &mut out_file, None)
        .await
        .unwrap();
    out_file.sync_all().await.unwrap();

    let mut file = File::open(&out_path).await.unwrap();
    let mut whole = vec![0u8; 28672];
    file.read_exact(&mut whole).await.unwrap();

    assert!(whole[8192..12288].iter().all(|&b| b == 0));
    assert!(whole[20480..28672].iter().all(|&b| b == 0));
    // untouched region still carries the marker
    assert!(whole[0..8192].iter().all(|&b| b == 0xAA));
}

/// S3: REPLACE_BZ decodes the payload and verifies its SHA-256 first; a
/// corrupted hash must fail before anything is written.
#[tokio::test]
async fn replace_bz_round_trip_and_hash_check() {
    use std::io::Write;

    let plain = b"hello world";
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
    encoder.write_all(plain).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut hasher = Sha256::new();
    hasher.update(&compressed);
    let hash = hasher.finalize().to_vec();

    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("part.img");

    let op = InstallOperation {
        r#type: Some(1),
        data_offset: Some(0),
        data_length: Some(compressed.len() as u64),
        dst_extents: vec![extent(0, 1)],
        data_sha256_hash: Some(hash.clone()),
        ..Default::default()
    };

    {
        let mut out_file = File::create(&out_path).await.unwrap();
        out_file.set_len(16).await.unwrap();
        let mut reader = MemPayloadReader(compressed.clone());
        execute_operation(&op, 0, 16, &mut reader, &mut out_file, None)
            .await
            .unwrap();
        out_file.sync_all().await.unwrap();
    }

    let bytes = read_file_bytes(&out_path, 11).await;
    assert_eq!(&bytes, plain);

    // now corrupt the hash and confirm the operation is rejected
    let mut bad_hash = hash;
    bad_hash[0] ^= 0xFF;
    let bad_op = InstallOperation {
        data_sha256_hash: Some(bad_hash),
        ..op
    };

    let out_path2 = dir.path().join("part2.img");
    let mut out_file2 = File::create(&out_path2).await.unwrap();
    out_file2.set_len(16).await.unwrap();
    let mut reader2 = MemPayloadReader(compressed);

    let err = execute_operation(&bad_op, 0, 16, &mut reader2, &mut out_file2, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PayloadError::IntegrityError(_)));
}

/// S4: SOURCE_COPY copies source extents straight to destination extents.
#[tokio::test]
async fn source_copy_copies_extents() {
    let dir = tempfile::tempdir().unwrap();

    let source_path = dir.path().join("boot.img");
    let mut source_data = vec![0u8; 8192];
    source_data[4096..8192].fill(0x42);
    tokio::fs::write(&source_path, &source_data).await.unwrap();
    let mut source_file = File::open(&source_path).await.unwrap();

    let out_path = dir.path().join("part.img");
    let mut out_file = File::create(&out_path).await.unwrap();
    out_file.set_len(4096).await.unwrap();

    let mut reader = MemPayloadReader(Vec::new());
    let op = InstallOperation {
        r#type: Some(5),
        src_extents: vec![extent(1, 1)],
        dst_extents: vec![extent(0, 1)],
        ..Default::default()
    };

    execute_operation(
        &op,
        0,
        4096,
        &mut reader,
        &mut out_file,
        Some(&mut source_file),
    )
    .await
    .unwrap();
    out_file.sync_all().await.unwrap();

    let bytes = read_file_bytes(&out_path, 4096).await;
    assert!(bytes.iter().all(|&b| b == 0x42));
}

/// missing source image in differential mode surfaces MissingSource instead
/// of panicking or silently zero-filling.
#[tokio::test]
async fn source_copy_without_source_is_missing_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("part.img");
    let mut out_file = File::create(&out_path).await.unwrap();
    out_file.set_len(4096).await.unwrap();

    let mut reader = MemPayloadReader(Vec::new());
    let op = InstallOperation {
        r#type: Some(5),
        src_extents: vec![extent(1, 1)],
        dst_extents: vec![extent(0, 1)],
        ..Default::default()
    };

    let err = execute_operation(&op, 0, 4096, &mut reader, &mut out_file, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PayloadError::MissingSource(_)));
}

/// unsupported operation type codes (the gaps in the table) are rejected
/// outright rather than silently treated as REPLACE.
#[tokio::test]
async fn unsupported_operation_codes_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("part.img");
    let mut out_file = File::create(&out_path).await.unwrap();
    out_file.set_len(4096).await.unwrap();

    for code in [7, 9, 11] {
        let mut reader = MemPayloadReader(Vec::new());
        let op = InstallOperation {
            r#type: Some(code),
            dst_extents: vec![extent(0, 1)],
            ..Default::default()
        };

        let err = execute_operation(&op, 0, 4096, &mut reader, &mut out_file, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PayloadError::UnsupportedOperation { code: c } if c == code
        ));
    }
}

/// sign-magnitude little-endian encoding used throughout the BSDF2 patch
/// format (bspatch's "offtin" convention: abs value little-endian, sign bit
/// in the high bit of the last byte).
fn encode_offtin(value: i64) -> [u8; 8] {
    let mut buf = (value.unsigned_abs()).to_le_bytes();
    if value < 0 {
        buf[7] |= 0x80;
    }
    buf
}

/// hand-builds a BSDF2 patch (all three streams uncompressed) out of a single
/// control record: add `add_len` diffed bytes, copy `copy_len` extra bytes,
/// then seek by `seek_adj`.
fn build_bsdf2_patch(add_len: i64, copy_len: i64, seek_adj: i64, diff: &[u8], extra: &[u8], new_size: i64) -> Vec<u8> {
    let mut control = Vec::new();
    control.extend_from_slice(&encode_offtin(add_len));
    control.extend_from_slice(&encode_offtin(copy_len));
    control.extend_from_slice(&encode_offtin(seek_adj));

    let mut patch = Vec::new();
    patch.extend_from_slice(b"BSDF2\x00\x00\x00"); // all three streams: Identity/None
    patch.extend_from_slice(&encode_offtin(control.len() as i64));
    patch.extend_from_slice(&encode_offtin(diff.len() as i64));
    patch.extend_from_slice(&encode_offtin(new_size));
    patch.extend_from_slice(&control);
    patch.extend_from_slice(diff);
    patch.extend_from_slice(extra);
    patch
}

/// S5: SOURCE_BSDIFF (legacy bsdiff4/BSDF2). Old source = "aaaaaaaa", a
/// single control record turns it into "aaabaaaa" by diffing every byte
/// against the source (byte-wise add mod 256) with no extra/copy bytes.
#[tokio::test]
async fn source_bsdiff_applies_patch_to_destination() {
    let dir = tempfile::tempdir().unwrap();

    let source_path = dir.path().join("boot.img");
    tokio::fs::write(&source_path, b"aaaaaaaa").await.unwrap();
    let mut source_file = File::open(&source_path).await.unwrap();

    let out_path = dir.path().join("part.img");
    let mut out_file = File::create(&out_path).await.unwrap();
    out_file.set_len(8).await.unwrap();

    // diff[i] = dst[i] - src[i] (mod 256): only byte 2 ('a' -> 'b') differs.
    let diff = [0u8, 0, 1, 0, 0, 0, 0, 0];
    let patch = build_bsdf2_patch(8, 0, 0, &diff, &[], 8);

    let op = InstallOperation {
        r#type: Some(6),
        data_offset: Some(0),
        data_length: Some(patch.len() as u64),
        src_extents: vec![extent(0, 1)],
        dst_extents: vec![extent(0, 1)],
        ..Default::default()
    };

    let mut reader = MemPayloadReader(patch);
    execute_operation(
        &op,
        0,
        8,
        &mut reader,
        &mut out_file,
        Some(&mut source_file),
    )
    .await
    .unwrap();
    out_file.sync_all().await.unwrap();

    let bytes = read_file_bytes(&out_path, 8).await;
    assert_eq!(&bytes, b"aaabaaaa");
}

/// S6: the run controller honors an allow-list (intersection, not union) and
/// preserves manifest order.
#[tokio::test]
async fn controller_filters_and_preserves_manifest_order() {
    let dir = tempfile::tempdir().unwrap();

    let mut manifest = DeltaArchiveManifest {
        block_size: Some(4096),
        ..Default::default()
    };

    for (name, byte) in [("boot", b'B'), ("system", b'S'), ("vendor", b'V')] {
        let op = InstallOperation {
            r#type: Some(0),
            data_offset: Some(0),
            data_length: Some(1),
            dst_extents: vec![extent(0, 1)],
            ..Default::default()
        };
        manifest.partitions.push(PartitionUpdate {
            partition_name: name.to_string(),
            new_partition_info: Some(PartitionInfo {
                size: Some(4096),
                hash: None,
            }),
            operations: vec![op],
            ..Default::default()
        });
        let _ = byte;
    }

    let payload_data = vec![b'X'];
    let reader = MemPayloadSource(payload_data);

    let outcome = extract_partitions(
        &manifest,
        0,
        dir.path(),
        &reader,
        &payload_extract::payload::driver::NoOpReporter,
        None,
        &["vendor".to_string(), "boot".to_string()],
    )
    .await
    .unwrap();

    assert_eq!(outcome.extracted, vec!["boot".to_string(), "vendor".to_string()]);
    assert!(dir.path().join("boot.img").exists());
    assert!(dir.path().join("vendor.img").exists());
    assert!(!dir.path().join("system.img").exists());
}
