// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use clap::Parser;
use std::path::PathBuf;

const VERSION_STRING: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\n\n",
    "Copyright (C) 2024-2025 rhythmcache\n",
    "License Apache-2.0: Apache License 2.0 <https://www.apache.org/licenses/LICENSE-2.0>\n",
    "\n",
    "This is free software; you are free to change and redistribute it.\n",
    "There is NO WARRANTY, to the extent permitted by law.\n",
    "\n",
    "Project home: <https://github.com/rhythmcache/payload-dumper-rust>\n"
);

#[derive(Parser)]
#[command(
    version = VERSION_STRING,
    about = "Extracts partition images from an Android OTA payload.bin"
)]
#[command(next_line_help = true)]
pub struct Args {
    #[arg(
        value_name = "PAYLOAD",
        help = "Path to a payload.bin file or a ZIP archive containing one",
        long_help = "Path to the Android OTA payload file: either a raw payload.bin, or a ZIP \
                     archive (an OTA package) containing an uncompressed payload.bin member"
    )]
    pub payload_path: PathBuf,

    #[arg(
        short = 'o',
        long,
        default_value = "output",
        value_name = "DIR",
        help = "Directory to save extracted partitions ('-' for stdout metadata only)"
    )]
    pub out: PathBuf,

    #[arg(
        long,
        help = "Treat this payload as a differential (incremental) OTA",
        long_help = "Enable differential-OTA mode: source images from --old are opened and used \
                     by operations that require them (SOURCE_COPY, SOURCE_BSDIFF, BROTLI_BSDIFF). \
                     Without this flag no source directory is consulted, and such operations fail \
                     with a missing-source error."
    )]
    pub diff: bool,

    #[arg(
        long = "old",
        default_value = "old",
        value_name = "DIR",
        help = "Directory containing source images for differential OTA",
        long_help = "Path to a directory containing old partition images, named <partition>.img. \
                     Only consulted when --diff is passed. If a needed source image is missing, \
                     extraction proceeds and only fails the operations that actually require it."
    )]
    pub old: PathBuf,

    #[arg(
        short = 'i',
        long,
        default_value = "",
        alias = "partitions",
        value_name = "NAMES",
        hide_default_value = true,
        help = "Comma-separated list of partitions to extract",
        long_help = "Extract only specific partitions instead of all available ones. \
                     Provide partition names as a comma-separated list. Use --list to see \
                     available partition names in the payload"
    )]
    pub images: String,

    #[arg(
        short = 'l',
        long,
        conflicts_with = "images",
        help = "List available partitions and exit"
    )]
    pub list: bool,

    #[arg(
        short = 'm',
        long,
        value_name = "MODE",
        num_args = 0..=1,
        default_missing_value = "compact",
        require_equals = true,
        help = "Save payload metadata as JSON",
        long_help = "Export payload metadata to a JSON file. Compact mode includes essential \
                     information like partition names, sizes, and hashes. Full mode additionally \
                     includes all low-level operation details. Can be combined with --images to \
                     export metadata only for specific partitions"
    )]
    pub metadata: Option<String>,

    #[arg(
        short = 'n',
        long,
        help = "Skip hash verification of extracted partitions",
        long_help = "Skip cryptographic hash verification after extraction. Verification ensures \
                     extracted partitions match the expected checksums from the payload manifest. \
                     Skipping saves time but risks silently keeping corrupted data."
    )]
    pub no_verify: bool,

    #[arg(
        short = 'q',
        long,
        help = "Suppress non-essential output",
        long_help = "Reduce output verbosity by suppressing progress indicators and informational \
                     messages. Errors and warnings will still be displayed."
    )]
    pub quiet: bool,
}
