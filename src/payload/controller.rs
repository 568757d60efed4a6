// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// Runs every selected partition through the driver, strictly one at a time.
// Cancellation is only checked between partitions, matching the original
// tool's non-parallel extraction path. Any partition error aborts the whole
// run immediately -- no remaining partitions are attempted, and whatever was
// already written for the failing partition is left in place for diagnostics.

use crate::DeltaArchiveManifest;
use crate::error::Result;
use crate::payload::driver::{AsyncPayloadRead, ProgressReporter};
use std::path::{Path, PathBuf};

pub struct ExtractionOutcome {
    pub extracted: Vec<String>,
}

/// run every partition matching `selected` (or all partitions if `selected` is
/// empty) through `dump_partition`, strictly sequentially. Returns as soon as
/// any partition fails, propagating that error to the caller.
pub async fn extract_partitions<P: AsyncPayloadRead>(
    manifest: &DeltaArchiveManifest,
    data_offset: u64,
    output_dir: &Path,
    payload_reader: &P,
    reporter: &dyn ProgressReporter,
    source_dir: Option<PathBuf>,
    selected: &[String],
) -> Result<ExtractionOutcome> {
    let block_size = manifest.block_size.unwrap_or(4096) as u64;

    let partitions: Vec<_> = manifest
        .partitions
        .iter()
        .filter(|p| selected.is_empty() || selected.iter().any(|s| s == &p.partition_name))
        .collect();

    let mut extracted = Vec::new();

    for partition in partitions {
        if reporter.is_cancelled() {
            break;
        }

        let output_path = output_dir.join(format!("{}.img", partition.partition_name));

        crate::payload::driver::dump_partition(
            partition,
            data_offset,
            block_size,
            output_path,
            payload_reader,
            reporter,
            source_dir.clone(),
        )
        .await?;

        extracted.push(partition.partition_name.clone());
    }

    Ok(ExtractionOutcome { extracted })
}
