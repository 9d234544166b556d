// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::template::{budget_template, transaction_template, with_bom};
use anyhow::{Context, Result};
use std::fs;

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let (kind, content) = match m.subcommand() {
        Some(("transactions", sub)) => (sub, transaction_template()),
        Some(("budgets", sub)) => (sub, budget_template()),
        _ => return Ok(()),
    };
    let out = kind.get_one::<String>("out").unwrap().trim();
    fs::write(out, with_bom(&content)).with_context(|| format!("Write template {}", out))?;
    println!("Template written to {}", out);
    Ok(())
}
