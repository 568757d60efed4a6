// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// Single reporter shared across the whole sequential run. A new indicatif
// progress bar is created the moment a partition starts and finished when it
// completes, so the CLI still gets a per-partition bar out of one
// long-lived ProgressReporter instance.

use crate::cli::ui::ui_print::{ExtractionProgress, UiOutput};
use payload_extract::payload::driver::ProgressReporter;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct CliExtractionReporter<'a> {
    ui: &'a UiOutput,
    bars: Mutex<HashMap<String, ExtractionProgress>>,
}

impl<'a> CliExtractionReporter<'a> {
    pub fn new(ui: &'a UiOutput) -> Self {
        Self {
            ui,
            bars: Mutex::new(HashMap::new()),
        }
    }
}

impl ProgressReporter for CliExtractionReporter<'_> {
    fn on_start(&self, partition_name: &str, _total_operations: u64) {
        let progress = self.ui.create_extraction_progress(partition_name);
        progress.set_position(0);
        self.bars
            .lock()
            .unwrap()
            .insert(partition_name.to_string(), progress);
    }

    fn on_progress(&self, partition_name: &str, current_op: u64, total_ops: u64) {
        let percentage = if total_ops == 0 {
            100
        } else {
            (current_op as f64 / total_ops as f64 * 100.0) as u64
        };
        if let Some(progress) = self.bars.lock().unwrap().get(partition_name) {
            progress.set_position(percentage);
        }
    }

    fn on_complete(&self, partition_name: &str, total_operations: u64) {
        if let Some(progress) = self.bars.lock().unwrap().remove(partition_name) {
            progress.finish_with_message(format!("{} ({} ops)", partition_name, total_operations));
        }
    }

    fn on_warning(&self, partition_name: &str, operation_index: usize, message: String) {
        eprintln!(
            "warning [{}:op{}]: {}",
            partition_name, operation_index, message
        );
    }
}
