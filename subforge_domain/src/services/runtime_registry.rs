// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port for resolving named runtimes to executables (spec §3 "Runtime
//! descriptor", C2).

use crate::entities::runtime_descriptor::RuntimeDescriptor;
use crate::error::OrchestratorError;
use crate::value_objects::runtime_name::RuntimeName;
use async_trait::async_trait;

#[async_trait]
pub trait RuntimeRegistry: Send + Sync {
    /// Resolves one runtime by name, running its liveness probe.
    async fn resolve(&self, name: &RuntimeName) -> Result<RuntimeDescriptor, OrchestratorError>;

    /// Resolves every runtime a workflow's active stages could need, in
    /// one pass, so `prepare` can report all missing runtimes at once
    /// instead of failing on the first one.
    async fn resolve_all(&self, names: &[RuntimeName]) -> Result<Vec<RuntimeDescriptor>, OrchestratorError> {
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            out.push(self.resolve(name).await?);
        }
        Ok(out)
    }
}
