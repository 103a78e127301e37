// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Helpers for writing engine tests.

use tbs_track::test_helpers::create_tracker;

use crate::engine::Engine;

/// Create an [`Engine`] whose tracker writes to a log named after the test.
#[must_use]
pub fn start_test(full_filepath: &str) -> Engine {
    Engine::new(&create_tracker(full_filepath))
}
