// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// Generated protobuf types for the payload manifest. build.rs compiles
// proto/update_metadata.proto with prost-build; this module just wires the
// generated code into the crate.

include!(concat!(env!("OUT_DIR"), "/chromeos_update_engine.rs"));
