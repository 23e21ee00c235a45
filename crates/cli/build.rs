// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Generates `env_vars.rs`: one documented constant per environment
//! variable the CLI reads.

use std::io::Write;

const VARS: &[(&str, &str)] = &[
    ("TILLSYNC_LOG", "Log filter directive, e.g. `info` or `tsync=debug`."),
    ("TILLSYNC_OFFLINE", "Set to `1` to start every session offline."),
    ("TILLSYNC_USER", "Identity sent as `X-User-Id` when the config has none."),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = std::env::var("OUT_DIR")?;
    let path = std::path::Path::new(&out_dir).join("env_vars.rs");
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);

    for (name, doc) in VARS {
        writeln!(out, "/// {doc}")?;
        writeln!(out, "pub const {name}: &str = \"{name}\";")?;
    }
    out.flush()?;
    Ok(())
}
