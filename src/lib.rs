// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

pub mod constants;
pub mod error;
mod manifest;
pub mod payload;
pub mod readers;
pub mod structs;
pub mod utils;
pub mod zip;

pub use error::{PayloadError, Result};
pub use manifest::*;
