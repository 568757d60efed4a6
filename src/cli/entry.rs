// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use crate::cli::args::args_def::Args;
use crate::cli::commands::list::list_partitions;
use crate::cli::payload::file_detector::detect_payload_type;
use crate::cli::payload::partition_filter::filter_partitions;
use crate::cli::payload::payload_loader::load_payload;
use crate::cli::ui::cli_reporter::CliExtractionReporter;
use crate::cli::ui::ui_print::UiOutput;
use crate::cli::verification::validator::verify_extracted_partitions;
use clap::Parser;
use payload_extract::error::Result;
use payload_extract::payload::controller::extract_partitions;
use payload_extract::payload::metadata::handle_metadata_extraction;
use payload_extract::utils::{format_elapsed_time, format_size};
use std::time::Instant;
use tokio::fs;

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let is_stdout = args.out.to_string_lossy() == "-";
    let ui = UiOutput::new(args.quiet, is_stdout);

    let start_time = Instant::now();
    let main_pb = ui.create_spinner("Starting...");

    if let Ok(metadata) = fs::metadata(&args.payload_path).await
        && metadata.len() > 1024 * 1024
    {
        ui.pb_eprintln(format!(
            "- Processing file: {}, size: {}",
            args.payload_path.display(),
            format_size(metadata.len())
        ));
    }

    if !is_stdout {
        fs::create_dir_all(&args.out).await?;
    }

    ui.update_spinner(&main_pb, "Detecting file type...");
    let payload_type = detect_payload_type(&args.payload_path).await?;

    ui.update_spinner(&main_pb, "Parsing payload...");
    let payload_info = load_payload(&args.payload_path, payload_type).await?;
    let manifest = payload_info.manifest;
    let data_offset = payload_info.data_offset;

    if let Some(security_patch) = &manifest.security_patch_level {
        ui.pb_eprintln(format!("- Security Patch: {}", security_patch));
    }

    if let Some(mode) = &args.metadata
        && !args.list
    {
        ui.println("- Extracting metadata...");
        let full_mode = mode == "full";
        match handle_metadata_extraction(&manifest, &args.out, data_offset, full_mode, &args.images, is_stdout)
            .await
        {
            Ok(()) => {
                ui.clear()?;
                return Ok(());
            }
            Err(e) => {
                ui.finish_spinner(main_pb, "Failed to save metadata");
                return Err(e);
            }
        }
    }

    if args.list {
        ui.clear()?;

        if let Some(mode) = &args.metadata {
            let full_mode = mode == "full";
            if let Err(e) =
                handle_metadata_extraction(&manifest, &args.out, data_offset, full_mode, &args.images, is_stdout)
                    .await
            {
                ui.error(format!("Failed to save metadata: {}", e));
            }
            if is_stdout {
                return Ok(());
            }
        }

        println!();
        list_partitions(&manifest);
        return Ok(());
    }

    let partitions_to_extract = filter_partitions(&manifest, &args.images);

    if partitions_to_extract.is_empty() {
        ui.finish_spinner(main_pb, "No partitions to extract");
        ui.clear()?;
        return Ok(());
    }

    ui.println(format!(
        "- Found {} partitions to extract",
        partitions_to_extract.len()
    ));

    ui.update_spinner(&main_pb, "Processing partitions...");

    let selected: Vec<String> = partitions_to_extract
        .iter()
        .map(|p| p.partition_name.clone())
        .collect();

    let reporter = CliExtractionReporter::new(&ui);

    let source_dir = if args.diff { Some(args.old.clone()) } else { None };

    if let Err(e) = extract_partitions(
        &manifest,
        data_offset,
        &args.out,
        &payload_info.reader,
        &reporter,
        source_dir,
        &selected,
    )
    .await
    {
        ui.finish_spinner(main_pb, "Extraction aborted");
        ui.error(format!("Failed to process partition: {}", e));
        return Err(e);
    }

    let failed_partitions: Vec<String> =
        verify_extracted_partitions(&partitions_to_extract, &[], &args, &ui).await?;

    let elapsed_time = format_elapsed_time(start_time.elapsed());

    if failed_partitions.is_empty() {
        ui.finish_spinner(
            main_pb,
            format!(
                "All partitions extracted successfully! (in {})",
                elapsed_time
            ),
        );
        ui.println_final(format!(
            "\n- Extraction completed successfully in {}. Output directory: {:?}",
            elapsed_time, args.out,
        ));
        Ok(())
    } else {
        ui.finish_spinner(
            main_pb,
            format!(
                "Completed with {} failed partitions. (in {})",
                failed_partitions.len(),
                elapsed_time
            ),
        );
        ui.eprintln_final(format!(
            "\n- Extraction completed with {} failed partitions in {}. Output directory: {:?}",
            failed_partitions.len(),
            elapsed_time,
            args.out,
        ));
        Err(payload_extract::PayloadError::IntegrityError(format!(
            "{} partition(s) failed hash verification",
            failed_partitions.len()
        )))
    }
}
