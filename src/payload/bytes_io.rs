// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// Big-endian field readers for the payload container header. A short read
// here always means the declared field ran past the end of the input, so it
// is surfaced as FormatError rather than a generic IOError.

use crate::error::{PayloadError, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

fn truncated(what: &str) -> PayloadError {
    PayloadError::FormatError(format!("payload header truncated while reading {}", what))
}

async fn read_exact_or_truncated<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
    what: &str,
) -> Result<()> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(truncated(what)),
        Err(e) => Err(PayloadError::IOError(e)),
    }
}

/// read a big-endian u32, mapping a short read to FormatError
pub async fn read_u32_be<R: AsyncRead + Unpin>(reader: &mut R, what: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact_or_truncated(reader, &mut buf, what).await?;
    Ok(u32::from_be_bytes(buf))
}

/// read a big-endian u64, mapping a short read to FormatError
pub async fn read_u64_be<R: AsyncRead + Unpin>(reader: &mut R, what: &str) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact_or_truncated(reader, &mut buf, what).await?;
    Ok(u64::from_be_bytes(buf))
}

/// read exactly `buf.len()` bytes, mapping a short read to FormatError
pub async fn read_exact_be<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
    what: &str,
) -> Result<()> {
    read_exact_or_truncated(reader, buf, what).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_u32_be_value() {
        let mut cursor = std::io::Cursor::new(vec![0x00, 0x00, 0x01, 0x00]);
        let v = read_u32_be(&mut cursor, "field").await.unwrap();
        assert_eq!(v, 256);
    }

    #[tokio::test]
    async fn reads_u64_be_value() {
        let mut cursor = std::io::Cursor::new(vec![0, 0, 0, 0, 0, 0, 0, 2]);
        let v = read_u64_be(&mut cursor, "field").await.unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test]
    async fn short_read_is_format_error() {
        let mut cursor = std::io::Cursor::new(vec![0x00, 0x01]);
        let err = read_u32_be(&mut cursor, "field").await.unwrap_err();
        assert!(matches!(err, PayloadError::FormatError(_)));
    }
}
