// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure layer: concrete adapters for every port the domain
//! declares, plus the ambient concerns (config, logging, metrics) that
//! sit beside them rather than behind a port.

pub mod cache_store;
pub mod capability_probe;
pub mod config;
pub mod job_dir;
pub mod logging;
pub mod manifest_store;
pub mod metrics;
pub mod process_launcher;
pub mod runtime_registry;
pub mod stage_executor;

pub use cache_store::FilesystemCacheStore;
pub use capability_probe::{FilesystemCapabilityCache, SystemCapabilityProbe};
pub use config::GlobalConfig;
pub use job_dir::JobDir;
pub use manifest_store::FilesystemManifestStore;
pub use process_launcher::SubprocessLauncher;
pub use runtime_registry::FilesystemRuntimeRegistry;
pub use stage_executor::SubprocessStageExecutor;
