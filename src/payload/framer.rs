// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// Parses the CrAU payload container header and hands back the decoded
// manifest plus the byte offset where the operation data region begins.

use crate::DeltaArchiveManifest;
use crate::constants::{PAYLOAD_MAGIC, SUPPORTED_PAYLOAD_VERSION};
use crate::error::{PayloadError, Result};
use crate::payload::bytes_io::{read_exact_be, read_u32_be, read_u64_be};
use crate::zip::local_io::LocalZipIO;
use crate::zip::parser::ZipParser;
use prost::Message;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt};

/// parse payload from any async reader that supports seeking
/// returns (manifest, data_offset)
pub async fn parse_payload<R>(mut reader: R) -> Result<(DeltaArchiveManifest, u64)>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    reader.seek(std::io::SeekFrom::Start(0)).await?;

    let mut magic = [0u8; 4];
    read_exact_be(&mut reader, &mut magic, "magic").await?;
    if &magic != PAYLOAD_MAGIC {
        return Err(PayloadError::FormatError(
            "magic 'CrAU' not found at start of payload".into(),
        ));
    }

    let version = read_u64_be(&mut reader, "version").await?;
    if version != SUPPORTED_PAYLOAD_VERSION {
        return Err(PayloadError::FormatError(format!(
            "unsupported payload version: {}",
            version
        )));
    }

    let manifest_size = read_u64_be(&mut reader, "manifest_size").await?;
    let metadata_signature_size = read_u32_be(&mut reader, "metadata_signature_size").await?;

    let mut manifest_bytes = vec![0u8; manifest_size as usize];
    read_exact_be(&mut reader, &mut manifest_bytes, "manifest").await?;

    reader
        .seek(std::io::SeekFrom::Current(metadata_signature_size as i64))
        .await?;

    let data_offset = reader.stream_position().await?;

    let manifest = DeltaArchiveManifest::decode(&manifest_bytes[..])?;

    Ok((manifest, data_offset))
}

/// parse payload from a local .bin file
pub async fn parse_local_payload(payload_path: &Path) -> Result<(DeltaArchiveManifest, u64)> {
    let file = File::open(payload_path).await?;
    parse_payload(file).await
}

/// a seekable reader bounding reads to the payload.bin member of a ZIP archive
pub struct ZipPayloadFile {
    file: File,
    payload_offset: u64,
    payload_size: u64,
    position: u64,
}

impl ZipPayloadFile {
    pub async fn new(zip_path: PathBuf) -> Result<Self> {
        let io = LocalZipIO::new(zip_path.clone()).await?;
        let entry = ZipParser::find_payload_entry(&io).await?;
        let data_offset = ZipParser::get_data_offset(&io, &entry).await?;
        ZipParser::verify_payload_magic(&io, data_offset).await?;

        let file = File::open(&zip_path).await?;

        Ok(Self {
            file,
            payload_offset: data_offset,
            payload_size: entry.uncompressed_size,
            position: 0,
        })
    }
}

impl AsyncRead for ZipPayloadFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        let remaining = self.payload_size.saturating_sub(self.position);
        if remaining == 0 {
            return std::task::Poll::Ready(Ok(()));
        }

        let max_read = std::cmp::min(buf.remaining() as u64, remaining) as usize;
        let mut limited_buf = buf.take(max_read);

        let pin = Pin::new(&mut self.file);
        match pin.poll_read(cx, &mut limited_buf) {
            std::task::Poll::Ready(Ok(())) => {
                let filled = limited_buf.filled().len();
                self.position += filled as u64;
                buf.advance(filled);
                std::task::Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

impl AsyncSeek for ZipPayloadFile {
    fn start_seek(mut self: Pin<&mut Self>, position: std::io::SeekFrom) -> std::io::Result<()> {
        let new_pos = match position {
            std::io::SeekFrom::Start(offset) => offset,
            std::io::SeekFrom::End(offset) => {
                if offset >= 0 {
                    self.payload_size.saturating_add(offset as u64)
                } else {
                    self.payload_size.saturating_sub((-offset) as u64)
                }
            }
            std::io::SeekFrom::Current(offset) => {
                if offset >= 0 {
                    self.position.saturating_add(offset as u64)
                } else {
                    self.position.saturating_sub((-offset) as u64)
                }
            }
        };

        if new_pos > self.payload_size {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek beyond payload end",
            ));
        }

        self.position = new_pos;
        let absolute_pos = self.payload_offset + new_pos;
        Pin::new(&mut self.file).start_seek(std::io::SeekFrom::Start(absolute_pos))
    }

    fn poll_complete(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<u64>> {
        match Pin::new(&mut self.file).poll_complete(cx) {
            std::task::Poll::Ready(Ok(_)) => std::task::Poll::Ready(Ok(self.position)),
            std::task::Poll::Ready(Err(e)) => std::task::Poll::Ready(Err(e)),
            std::task::Poll::Pending => std::task::Poll::Pending,
        }
    }
}

/// parse payload from a local ZIP archive containing payload.bin
pub async fn parse_local_zip_payload(zip_path: PathBuf) -> Result<(DeltaArchiveManifest, u64)> {
    let zip_payload = ZipPayloadFile::new(zip_path).await?;
    parse_payload(zip_payload).await
}
