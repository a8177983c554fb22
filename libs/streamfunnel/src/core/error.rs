// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

use crate::core::flow::FlowReturn;

#[derive(Error, Debug)]
pub enum StreamError {
    /// The fan-in producer ceiling was hit at registration.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// An item or event referenced a source the component never saw start.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Producers disagree on geometry, format or framerate.
    #[error("Capability mismatch: {0}")]
    CapabilityMismatch(String),

    /// Emission to the ordered output failed (closed, flushing, errored).
    #[error("Downstream failure: {0}")]
    DownstreamFailure(FlowReturn),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StreamError>;
