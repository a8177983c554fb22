// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Fan-in round-robin scheduler.
//!
//! Many producers push into their own bounded queue; one worker thread
//! visits the queues in id order and writes everything onto a single
//! ordered output. A silent producer costs the others at most one wait
//! timeout per pass.

mod producer;
mod producer_queue;
mod round_robin;
mod wait_timeout;
mod worker;

pub use producer::ProducerHandle;
pub use round_robin::RoundRobinFunnel;
pub use wait_timeout::WaitTimeout;
