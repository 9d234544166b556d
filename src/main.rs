// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use finflow::config::Config;
use finflow::store::SqliteStore;
use finflow::{cli, commands, db};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "finflow=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    let matches = cli::build_cli().get_matches();
    let config = Config::from_matches(&matches)?;
    let session = config.session();

    let store = SqliteStore::new(db::open_or_init(&config.db_path)?);

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", config.db_path.display());
        }
        Some(("category", sub)) => commands::categories::handle(&store, &session, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&store, &session, sub)?,
        Some(("budget", sub)) => commands::budgets::handle(&store, &session, sub)?,
        Some(("import", sub)) => commands::importer::handle(&store, &session, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&store, &session, sub)?,
        Some(("template", sub)) => commands::templates::handle(sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
