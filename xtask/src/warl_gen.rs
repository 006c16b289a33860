// Licensed under the Apache-2.0 license

//! Generates WARL legalization procedures from a register definition file.

use anyhow::{Context, Result};
use registers_warl::{generate_warl_from_file_with_config, CompileConfig, LegalizeFilter, Xlen};
use std::path::Path;

fn compile_config(xlen: Xlen, skip: &[String], no_default_skip: bool) -> CompileConfig {
    let mut filter = if no_default_skip {
        LegalizeFilter::none()
    } else {
        LegalizeFilter::with_defaults()
    };
    for name in skip {
        filter = filter.skip(name);
    }
    CompileConfig::new(xlen).with_filter(filter)
}

/// Compile `definition` for `xlen` and write the rendered procedures to
/// `output`, or to stdout.
pub fn generate(
    definition: &Path,
    xlen: Xlen,
    output: Option<&Path>,
    skip: &[String],
    no_default_skip: bool,
) -> Result<()> {
    println!("Generating WARL procedures from: {}", definition.display());
    println!("Profile: {xlen}");

    let config = compile_config(xlen, skip, no_default_skip);
    let code = generate_warl_from_file_with_config(definition, &config)?;

    if let Some(output_path) = output {
        std::fs::write(output_path, &code)
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        println!("Output written to: {}", output_path.display());
    } else {
        println!("\n--- Generated Procedures ---\n");
        println!("{}", code);
    }

    Ok(())
}
