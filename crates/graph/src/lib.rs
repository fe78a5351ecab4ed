// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! maestro-graph: dependency validation and topological scheduling.
//!
//! Pure functions over tasks and dependency edges: no I/O, deterministic for
//! equal inputs, all passes O(|V| + |E|).

mod cycles;
mod order;
mod report;
mod validate;

pub use cycles::{find_cycles, would_create_cycle};
pub use order::execution_order;
pub use report::{
    CircularDependency, CycleSeverity, ValidationError, ValidationReport, ValidationSuggestion,
    ValidationWarning,
};
pub use validate::validate_dependencies;
