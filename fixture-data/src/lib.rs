// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod drampower_tree;
pub mod models;
