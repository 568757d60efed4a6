// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use payload_extract::error::{PayloadError, Result};
use payload_extract::utils::{FileType, detect_file};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

#[derive(Debug, Clone, Copy)]
pub enum PayloadType {
    Zip,
    Bin,
}

/// detects the payload file type by checking magic bytes rather than relying
/// on the file extension
pub async fn detect_payload_type(payload_path: &Path) -> Result<PayloadType> {
    let mut file = File::open(payload_path).await?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic).await?;

    let file_type = detect_file(&magic).map_err(|_| {
        PayloadError::FormatError(format!(
            "unable to detect file type for {:?}: only .bin and .zip files are supported",
            payload_path.file_name().unwrap_or_default()
        ))
    })?;

    Ok(match file_type {
        FileType::Zip => PayloadType::Zip,
        FileType::Bin => PayloadType::Bin,
    })
}
