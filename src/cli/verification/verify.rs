// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use crate::cli::args::args_def::Args;
use crate::cli::ui::ui_print::UiOutput;
use payload_extract::PartitionUpdate;
use payload_extract::error::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const BUFFER_SIZE: usize = 1024 * 1024;

enum HashVerificationStatus {
    Verified,
    Mismatch,
    NoHash,
}

pub async fn verify_partitions_hash(
    partitions: &[&PartitionUpdate],
    args: &Args,
    ui: &UiOutput,
) -> Result<Vec<String>> {
    let out_dir = &args.out;
    let mut failed_verifications = Vec::new();

    for partition in partitions {
        let partition_name = &partition.partition_name;
        let out_path = out_dir.join(format!("{}.img", partition_name));

        let expected_hash = partition
            .new_partition_info
            .as_ref()
            .and_then(|info| info.hash.as_ref());

        let pb = ui.create_spinner(format!("verifying {}", partition_name));

        match verify_partition_file(&out_path, expected_hash).await {
            Ok(HashVerificationStatus::Verified) => {
                ui.finish_spinner(pb, format!("{} verified", partition_name));
            }
            Ok(HashVerificationStatus::Mismatch) => {
                ui.finish_spinner(pb, format!("{} mismatch", partition_name));
                failed_verifications.push(partition_name.clone());
            }
            Ok(HashVerificationStatus::NoHash) => {
                ui.finish_spinner(pb, format!("no hash for {}", partition_name));
            }
            Err(e) => {
                ui.finish_spinner(pb, format!("{} error", partition_name));
                ui.error(format!("error verifying hash for {}: {}", partition_name, e));
                failed_verifications.push(partition_name.clone());
            }
        }
    }

    Ok(failed_verifications)
}

async fn verify_partition_file(
    out_path: &Path,
    expected_hash: Option<&Vec<u8>>,
) -> Result<HashVerificationStatus> {
    let Some(expected) = expected_hash else {
        return Ok(HashVerificationStatus::NoHash);
    };

    if expected.is_empty() {
        return Ok(HashVerificationStatus::NoHash);
    }

    let mut file = File::open(out_path).await?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hash = hasher.finalize().to_vec();
    if hash.as_slice() == expected.as_slice() {
        Ok(HashVerificationStatus::Verified)
    } else {
        Ok(HashVerificationStatus::Mismatch)
    }
}
