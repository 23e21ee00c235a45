// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use crate::config::init_work_dir;
use crate::error::Result;

pub fn run(server: &str, path: Option<String>) -> Result<()> {
    let target_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };

    let work_dir = init_work_dir(&target_path, server)?;
    tracing::info!(work_dir = %work_dir.display(), "initialized");

    println!("Initialized tillsync at {}", work_dir.display());
    println!("Server: {}", server);
    Ok(())
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
