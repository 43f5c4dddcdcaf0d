// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Unix Platform Implementation
//!
//! POSIX implementation shared by Linux and macOS, built on `libc` plus
//! `/proc/meminfo` on Linux (macOS falls back to `sysconf`-derived
//! totals since it has no `/proc`).

use super::{Platform, PlatformError};
use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub struct UnixPlatform;

impl UnixPlatform {
    pub fn new() -> Self {
        Self
    }

    fn read_meminfo() -> Result<(u64, u64), PlatformError> {
        let content = std::fs::read_to_string("/proc/meminfo")
            .map_err(|e| PlatformError::Io(e))?;
        let mut total_kb = None;
        let mut available_kb = None;
        for line in content.lines() {
            if let Some(rest) = line.strip_prefix("MemTotal:") {
                total_kb = parse_kb(rest);
            } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
                available_kb = parse_kb(rest);
            }
        }
        match (total_kb, available_kb) {
            (Some(total), Some(available)) => Ok((total * 1024, available * 1024)),
            _ => Err(PlatformError::Other("could not parse /proc/meminfo".to_string())),
        }
    }

    #[cfg(target_os = "macos")]
    fn get_memory_info_impl() -> Result<(u64, u64), PlatformError> {
        // SC_PHYS_PAGES * page size gives total; macOS has no direct
        // "available" figure without the (unsafe) host_statistics64 API,
        // so total is used for both until a richer probe is warranted.
        let pages = unsafe { libc::sysconf(libc::_SC_PHYS_PAGES) };
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if pages < 0 || page_size < 0 {
            return Err(PlatformError::Other("sysconf returned a negative value".to_string()));
        }
        let total = pages as u64 * page_size as u64;
        Ok((total, total))
    }

    #[cfg(not(target_os = "macos"))]
    fn get_memory_info_impl() -> Result<(u64, u64), PlatformError> {
        Self::read_meminfo()
    }
}

fn parse_kb(rest: &str) -> Option<u64> {
    rest.split_whitespace().next()?.parse().ok()
}

impl Default for UnixPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Platform for UnixPlatform {
    fn page_size(&self) -> usize {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            size as usize
        } else {
            4096
        }
    }

    fn cpu_count(&self) -> usize {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    fn total_memory(&self) -> Result<u64, PlatformError> {
        Self::get_memory_info_impl().map(|(total, _)| total)
    }

    fn available_memory(&self) -> Result<u64, PlatformError> {
        Self::get_memory_info_impl().map(|(_, available)| available)
    }

    fn line_separator(&self) -> &'static str {
        "\n"
    }

    fn path_separator(&self) -> char {
        ':'
    }

    fn platform_name(&self) -> &'static str {
        if cfg!(target_os = "macos") {
            "macos"
        } else {
            "linux"
        }
    }

    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }

    fn is_elevated(&self) -> bool {
        unsafe { libc::geteuid() == 0 }
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError> {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(PlatformError::Io)
    }

    fn is_executable(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|meta| meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError> {
        file.sync_all().await.map_err(PlatformError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_count_is_at_least_one() {
        let platform = UnixPlatform::new();
        assert!(platform.cpu_count() >= 1);
    }

    #[test]
    fn page_size_is_within_a_sane_range() {
        let platform = UnixPlatform::new();
        let page_size = platform.page_size();
        assert!(page_size >= 512 && page_size <= 65536);
    }

    #[test]
    fn platform_name_matches_the_compiled_target() {
        let platform = UnixPlatform::new();
        #[cfg(target_os = "linux")]
        assert_eq!(platform.platform_name(), "linux");
        #[cfg(target_os = "macos")]
        assert_eq!(platform.platform_name(), "macos");
    }
}
