// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// This file is part of payload-dumper-rust. It implements components used for
// extracting and processing Android OTA payloads.

pub mod bsdiff;
pub mod bytes_io;
pub mod codec;
pub mod controller;
pub mod driver;
pub mod engine;
pub mod framer;
pub mod metadata;
