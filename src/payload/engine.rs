// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// Per-operation dispatch. Each InstallOperation is fetched into memory in
// full, verified against its SHA-256 hash, then decoded and scatter-written
// to the destination extents.
//
// Dispatch matches on the raw i32 operation type rather than the
// prost-generated enum accessor: prost falls back to a default variant for
// any value outside the declared enum, which would silently treat an
// explicitly unsupported type code as REPLACE instead of rejecting it.

use crate::Extent;
use crate::InstallOperation;
use crate::error::{PayloadError, Result};
use crate::payload::codec::{self, Codec};
use crate::payload::driver::PayloadReader;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};

const TYPE_REPLACE: i32 = 0;
const TYPE_REPLACE_BZ: i32 = 1;
const TYPE_ZERO: i32 = 2;
const TYPE_REPLACE_XZ: i32 = 3;
const TYPE_REPLACE_ZSTD: i32 = 4;
const TYPE_SOURCE_COPY: i32 = 5;
const TYPE_SOURCE_BSDIFF: i32 = 6;
const TYPE_REPLACE_XZ_RICE: i32 = 8;
const TYPE_BROTLI_BSDIFF: i32 = 10;

pub async fn execute_operation(
    op: &InstallOperation,
    data_offset: u64,
    block_size: u64,
    payload_reader: &mut dyn PayloadReader,
    out_file: &mut File,
    source_file: Option<&mut File>,
) -> Result<()> {
    let code = op.r#type.unwrap_or(TYPE_REPLACE);

    // Steps 1-2 apply to every operation type, including ones that end up
    // ignoring the fetched bytes (ZERO) or supplying their own payload
    // (SOURCE_COPY): a present data_sha256_hash must still be checked.
    let raw = read_operation_payload(op, data_offset, payload_reader).await?;
    verify_hash(op, &raw)?;

    match code {
        TYPE_REPLACE | TYPE_REPLACE_BZ | TYPE_REPLACE_XZ | TYPE_REPLACE_ZSTD
        | TYPE_REPLACE_XZ_RICE => {
            let codec = match code {
                TYPE_REPLACE => Codec::Identity,
                TYPE_REPLACE_BZ => Codec::Bz2,
                TYPE_REPLACE_XZ | TYPE_REPLACE_XZ_RICE => Codec::Xz,
                TYPE_REPLACE_ZSTD => Codec::Zstd,
                _ => unreachable!(),
            };
            let plain = codec::decompress(codec, &raw)?;
            write_dst_extents(out_file, &op.dst_extents, block_size, &plain).await
        }

        TYPE_ZERO => write_zeros(out_file, &op.dst_extents, block_size).await,

        TYPE_SOURCE_COPY => {
            let source_file = source_file.ok_or_else(|| {
                PayloadError::MissingSource("SOURCE_COPY requires a source image".into())
            })?;
            let data = read_src_extents(source_file, &op.src_extents, block_size).await?;
            write_dst_extents(out_file, &op.dst_extents, block_size, &data).await
        }

        TYPE_SOURCE_BSDIFF | TYPE_BROTLI_BSDIFF => {
            let source_file = source_file.ok_or_else(|| {
                PayloadError::MissingSource(
                    "SOURCE_BSDIFF/BROTLI_BSDIFF requires a source image".into(),
                )
            })?;
            let source_data = read_src_extents(source_file, &op.src_extents, block_size).await?;
            let patched = crate::payload::bsdiff::apply(&source_data, &raw)?;
            write_dst_extents(out_file, &op.dst_extents, block_size, &patched).await
        }

        other => Err(PayloadError::UnsupportedOperation { code: other }),
    }
}

async fn read_operation_payload(
    op: &InstallOperation,
    data_offset: u64,
    payload_reader: &mut dyn PayloadReader,
) -> Result<Vec<u8>> {
    let Some(length) = op.data_length else {
        return Ok(Vec::new());
    };

    if length as usize > crate::constants::MAX_OPERATION_SIZE {
        return Err(PayloadError::FormatError(format!(
            "operation payload of {} bytes exceeds the {} byte safety cap",
            length,
            crate::constants::MAX_OPERATION_SIZE
        )));
    }

    let offset = data_offset + op.data_offset.unwrap_or(0);
    let mut reader = payload_reader.read_range(offset, length).await?;
    let mut buf = vec![0u8; length as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

fn verify_hash(op: &InstallOperation, data: &[u8]) -> Result<()> {
    let Some(expected) = op.data_sha256_hash.as_ref() else {
        return Ok(());
    };

    let mut hasher = Sha256::new();
    hasher.update(data);
    let actual = hasher.finalize();

    if actual.as_slice() != expected.as_slice() {
        return Err(PayloadError::IntegrityError(format!(
            "operation payload hash mismatch: expected {}, got {}",
            hex::encode(expected),
            hex::encode(actual)
        )));
    }

    Ok(())
}

async fn read_src_extents(
    source_file: &mut File,
    extents: &[Extent],
    block_size: u64,
) -> Result<Vec<u8>> {
    let total_len: u64 = extents
        .iter()
        .map(|e| e.num_blocks.unwrap_or(0) * block_size)
        .sum();

    if total_len as usize > crate::constants::MAX_OPERATION_SIZE {
        return Err(PayloadError::FormatError(format!(
            "source extents total {} bytes, exceeding the {} byte safety cap",
            total_len,
            crate::constants::MAX_OPERATION_SIZE
        )));
    }

    let mut out = Vec::with_capacity(total_len as usize);

    for extent in extents {
        let start = extent.start_block.unwrap_or(0) * block_size;
        let len = extent.num_blocks.unwrap_or(0) * block_size;

        source_file.seek(SeekFrom::Start(start)).await?;
        let mut buf = vec![0u8; len as usize];
        source_file.read_exact(&mut buf).await?;
        out.extend_from_slice(&buf);
    }

    Ok(out)
}

async fn write_dst_extents(
    out_file: &mut File,
    extents: &[Extent],
    block_size: u64,
    data: &[u8],
) -> Result<()> {
    let mut cursor = 0usize;

    for extent in extents {
        let start = extent.start_block.unwrap_or(0) * block_size;
        let len = (extent.num_blocks.unwrap_or(0) * block_size) as usize;

        let chunk = data.get(cursor..cursor + len).ok_or_else(|| {
            PayloadError::FormatError(
                "decoded operation payload is shorter than its destination extents".into(),
            )
        })?;

        out_file.seek(SeekFrom::Start(start)).await?;
        out_file.write_all(chunk).await?;
        cursor += len;
    }

    Ok(())
}

async fn write_zeros(out_file: &mut File, extents: &[Extent], block_size: u64) -> Result<()> {
    for extent in extents {
        let start = extent.start_block.unwrap_or(0) * block_size;
        let len = (extent.num_blocks.unwrap_or(0) * block_size) as usize;

        out_file.seek(SeekFrom::Start(start)).await?;
        let zeros = vec![0u8; len];
        out_file.write_all(&zeros).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_codes_are_rejected_not_defaulted() {
        for code in [7, 9, 11, 99] {
            assert!(!matches!(
                code,
                TYPE_REPLACE
                    | TYPE_REPLACE_BZ
                    | TYPE_ZERO
                    | TYPE_REPLACE_XZ
                    | TYPE_REPLACE_ZSTD
                    | TYPE_SOURCE_COPY
                    | TYPE_SOURCE_BSDIFF
                    | TYPE_REPLACE_XZ_RICE
                    | TYPE_BROTLI_BSDIFF
            ));
        }
    }
}
