// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Shared test helpers and proptest strategies for downstream crates.

use crate::task::{Task, TaskPriority, TaskStatus, TaskType};
use crate::TaskId;

/// Proptest strategies over core enums and records.
pub mod strategies {
    use super::*;
    use proptest::prelude::*;

    pub fn task_status() -> impl Strategy<Value = TaskStatus> {
        proptest::sample::select(TaskStatus::ALL.to_vec())
    }

    pub fn task_priority() -> impl Strategy<Value = TaskPriority> {
        proptest::sample::select(vec![
            TaskPriority::Low,
            TaskPriority::Medium,
            TaskPriority::High,
            TaskPriority::Critical,
        ])
    }

    pub fn task_type() -> impl Strategy<Value = TaskType> {
        proptest::sample::select(vec![
            TaskType::Research,
            TaskType::Development,
            TaskType::Testing,
            TaskType::Review,
            TaskType::Deployment,
            TaskType::Documentation,
        ])
    }

    /// A small pool of tasks with sequential IDs and random priorities.
    pub fn task_pool(max: usize) -> impl Strategy<Value = Vec<Task>> {
        let count = 1..=max;
        count.prop_flat_map(|n| {
            proptest::collection::vec(task_priority(), n).prop_map(|priorities| {
                priorities
                    .into_iter()
                    .enumerate()
                    .map(|(i, priority)| {
                        crate::task::TaskBuilder::default()
                            .task_id(TaskId::format(i as u64 + 1))
                            .priority(priority)
                            .created_at(1_000 + i as u64)
                            .build()
                    })
                    .collect()
            })
        })
    }
}
