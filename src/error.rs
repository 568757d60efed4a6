// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use thiserror::Error;

/// errors surfaced by the payload extraction core
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("malformed payload container: {0}")]
    FormatError(String),

    #[error("integrity check failed: {0}")]
    IntegrityError(String),

    #[error("failed to decode {codec} stream: {cause}")]
    DecodeError { codec: &'static str, cause: String },

    #[error("unsupported operation type {code}")]
    UnsupportedOperation { code: i32 },

    #[error("operation requires a source image but none was provided: {0}")]
    MissingSource(String),

    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("extraction cancelled")]
    Cancelled,

    #[error("failed to decode manifest protobuf: {0}")]
    ProtobufDecode(#[from] prost::DecodeError),
}

pub type Result<T> = std::result::Result<T, PayloadError>;
