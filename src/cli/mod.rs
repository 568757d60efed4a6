// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

pub mod args;
pub mod commands;
pub mod entry;
pub mod payload;
pub mod ui;
pub mod verification;
