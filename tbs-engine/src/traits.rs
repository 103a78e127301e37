// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A set of common traits used across the engine.

use async_trait::async_trait;

use crate::types::SimResult;

/// The `Runnable` trait is implemented by components that have a process to
/// run for the duration of the simulation.
///
/// Components are registered with the [`Engine`](crate::engine::Engine) and
/// their `run()` functions are spawned as the simulation starts.
#[async_trait(?Send)]
pub trait Runnable {
    /// Run the component process.
    ///
    /// The default does nothing so that passive components can be registered
    /// without having to implement it.
    async fn run(&self) -> SimResult {
        Ok(())
    }
}
