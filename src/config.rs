// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db;
use anyhow::Result;
use std::path::PathBuf;

pub const DEFAULT_USER: &str = "local";
pub const CATEGORY_COLOR_KEY: &str = "category_color";

/// Whose data a pipeline run may see. Every store call takes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Session {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub user_id: String,
}

impl Config {
    /// `--db`/`FINFLOW_DB` and `--user`/`FINFLOW_USER` arrive through clap;
    /// anything missing falls back to the platform data dir and the local user.
    pub fn from_matches(m: &clap::ArgMatches) -> Result<Config> {
        let db_path = match m.get_one::<String>("db") {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p.trim()),
            _ => db::default_db_path()?,
        };
        let user_id = m
            .get_one::<String>("user")
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_USER)
            .to_string();
        Ok(Config { db_path, user_id })
    }

    pub fn session(&self) -> Session {
        Session::new(self.user_id.clone())
    }
}
