// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use crate::cli::payload::file_detector::PayloadType;
use payload_extract::DeltaArchiveManifest;
use payload_extract::error::Result;
use payload_extract::payload::driver::AsyncPayloadRead;
use payload_extract::payload::framer::{parse_local_payload, parse_local_zip_payload};
use payload_extract::readers::local::LocalAsyncPayloadReader;
use payload_extract::readers::local_zip::LocalAsyncZipPayloadReader;
use std::path::Path;
use std::sync::Arc;

pub struct PayloadInfo {
    pub manifest: DeltaArchiveManifest,
    pub data_offset: u64,
    pub reader: Arc<dyn AsyncPayloadRead>,
}

/// loads and parses the payload, returning its manifest, data offset, and a reader
pub async fn load_payload(payload_path: &Path, payload_type: PayloadType) -> Result<PayloadInfo> {
    let (manifest, data_offset) = match payload_type {
        PayloadType::Zip => parse_local_zip_payload(payload_path.to_path_buf()).await?,
        PayloadType::Bin => parse_local_payload(payload_path).await?,
    };

    let reader: Arc<dyn AsyncPayloadRead> = match payload_type {
        PayloadType::Zip => {
            Arc::new(LocalAsyncZipPayloadReader::new(payload_path.to_path_buf()).await?)
        }
        PayloadType::Bin => {
            Arc::new(LocalAsyncPayloadReader::new(payload_path.to_path_buf()).await?)
        }
    };

    Ok(PayloadInfo {
        manifest,
        data_offset,
        reader,
    })
}
