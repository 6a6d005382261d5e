// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for operations on storage entities.

pub mod calls;
pub mod jobs;
pub mod locks;
pub mod messages;
pub mod presence;
