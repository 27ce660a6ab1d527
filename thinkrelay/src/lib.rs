// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

pub mod config;
pub mod message;
pub mod models;
pub mod proxy;
pub mod registry;
pub mod relay;
pub mod sse;
pub mod thinking;
pub mod upstream;
