// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Worker count used when the platform cannot report its parallelism.
pub const FALLBACK_WORKER_THREADS: usize = 4;
/// Worker count of a named lane that does not state one.
pub const DEFAULT_GROUP_THREADS: usize = 1;
/// Upper bound on the workers of a single lane.
pub const MAX_LANE_THREADS: usize = 1024;
