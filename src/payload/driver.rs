// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// Per-partition driver: opens the output image, optionally opens the source
// image for differential OTAs, and walks the operation list through the
// engine.

use crate::PartitionUpdate;
use crate::error::{PayloadError, Result};
use crate::payload::engine;
use async_trait::async_trait;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// progress reporting trait for partition extraction
/// implement this to receive progress updates during extraction
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    /// called when extraction starts for a partition
    fn on_start(&self, partition_name: &str, total_operations: u64);

    /// called after each operation completes
    fn on_progress(&self, partition_name: &str, current_op: u64, total_ops: u64);

    /// called when extraction completes successfully
    fn on_complete(&self, partition_name: &str, total_operations: u64);

    /// called when a non-fatal warning occurs (operation skipped, missing source, etc.)
    fn on_warning(&self, partition_name: &str, operation_index: usize, message: String);

    /// check if cancellation has been requested. checked between partitions only.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// no-op reporter for headless/library use
pub struct NoOpReporter;

impl ProgressReporter for NoOpReporter {
    fn on_start(&self, _: &str, _: u64) {}
    fn on_progress(&self, _: &str, _: u64, _: u64) {}
    fn on_complete(&self, _: &str, _: u64) {}
    fn on_warning(&self, _: &str, _: usize, _: String) {}
}

#[async_trait]
pub trait AsyncPayloadRead: Send + Sync {
    async fn open_reader(&self) -> Result<Box<dyn PayloadReader>>;
}

#[async_trait]
pub trait PayloadReader: Send {
    async fn read_range(
        &mut self,
        offset: u64,
        length: u64,
    ) -> Result<Pin<Box<dyn AsyncRead + Send + '_>>>;
}

#[async_trait]
impl<T: AsyncPayloadRead> AsyncPayloadRead for Arc<T> {
    async fn open_reader(&self) -> Result<Box<dyn PayloadReader>> {
        (**self).open_reader().await
    }
}

#[async_trait]
impl AsyncPayloadRead for Arc<dyn AsyncPayloadRead> {
    async fn open_reader(&self) -> Result<Box<dyn PayloadReader>> {
        (**self).open_reader().await
    }
}

fn is_diff_operation(code: i32) -> bool {
    matches!(code, 5 | 6 | 10)
}

/// dump a partition to disk
pub async fn dump_partition<P: AsyncPayloadRead>(
    partition: &PartitionUpdate,
    data_offset: u64,
    block_size: u64,
    output_path: PathBuf,
    payload_reader: &P,
    reporter: &dyn ProgressReporter,
    source_dir: Option<PathBuf>,
) -> Result<()> {
    let partition_name = &partition.partition_name;
    let total_ops = partition.operations.len() as u64;

    reporter.on_start(partition_name, total_ops);

    let has_diff_ops = partition
        .operations
        .iter()
        .any(|op| is_diff_operation(op.r#type.unwrap_or(0)));

    let mut source_file: Option<File> = None;
    if has_diff_ops {
        match &source_dir {
            Some(dir) => {
                let source_img_path = dir.join(format!("{}.img", partition_name));
                match File::open(&source_img_path).await {
                    Ok(f) => source_file = Some(f),
                    Err(_) => {
                        reporter.on_warning(
                            partition_name,
                            0,
                            format!(
                                "source image {} not found, proceeding without source (source-dependent operations will fail)",
                                source_img_path.display()
                            ),
                        );
                    }
                }
            }
            None => {
                reporter.on_warning(
                    partition_name,
                    0,
                    "partition contains differential operations but no source directory was given"
                        .to_string(),
                );
            }
        }
    }

    let mut out_file = File::create(&output_path).await?;

    if let Some(size) = partition.new_partition_info.as_ref().and_then(|info| info.size) {
        out_file.set_len(size).await?;
    }

    let mut reader = payload_reader.open_reader().await?;

    for (i, op) in partition.operations.iter().enumerate() {
        match engine::execute_operation(
            op,
            data_offset,
            block_size,
            reader.as_mut(),
            &mut out_file,
            source_file.as_mut(),
        )
        .await
        {
            Ok(()) => {}
            Err(PayloadError::MissingSource(msg)) => {
                reporter.on_warning(partition_name, i, msg);
                return Err(PayloadError::MissingSource(format!(
                    "partition '{}' operation {}: {}",
                    partition_name, i, "no source image available"
                )));
            }
            Err(e) => return Err(e),
        }
        reporter.on_progress(partition_name, (i + 1) as u64, total_ops);
    }

    out_file.flush().await?;

    reporter.on_complete(partition_name, total_ops);

    Ok(())
}
