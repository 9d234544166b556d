// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{value_parser, Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .conflicts_with("jsonl")
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

fn filter_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("from").long("from").help("Earliest date, YYYY-MM-DD"))
        .arg(Arg::new("to").long("to").help("Latest date, YYYY-MM-DD"))
        .arg(Arg::new("min").long("min").help("Smallest amount"))
        .arg(Arg::new("max").long("max").help("Largest amount"))
        .arg(Arg::new("category").long("category"))
        .arg(Arg::new("subcategory").long("subcategory"))
        .arg(
            Arg::new("search")
                .long("search")
                .help("Case-insensitive match on the description"),
        )
        .arg(
            Arg::new("type")
                .long("type")
                .value_parser(["income", "expense"]),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_parser(value_parser!(usize)),
        )
}

fn ids_arg() -> Arg {
    Arg::new("ids")
        .long("ids")
        .value_delimiter(',')
        .value_parser(value_parser!(i64))
        .help("Comma-separated transaction ids")
}

pub fn build_cli() -> Command {
    Command::new("finflow")
        .about("Bank-statement import and budget vs. actual tracking")
        .version(clap::crate_version!())
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .env("FINFLOW_DB")
                .help("SQLite database path"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .env("FINFLOW_USER")
                .help("User whose data to work on"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("parent")
                                .long("parent")
                                .help("Parent category; makes this a subcategory"),
                        )
                        .arg(Arg::new("color").long("color").help("Hex color, e.g. #22c55e"))
                        .arg(Arg::new("icon").long("icon")),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("rename").long("rename").help("New name"))
                        .arg(Arg::new("color").long("color"))
                        .arg(Arg::new("icon").long("icon")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true))),
        )
        .subcommand(
            Command::new("tx")
                .about("Transactions")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("description").long("description").required(true))
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .required(true)
                                .allow_hyphen_values(true)
                                .help("Negative for expenses"),
                        )
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("subcategory").long("subcategory"))
                        .arg(
                            Arg::new("recurring")
                                .long("recurring")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("edit")
                        .about("Change fields of one transaction")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("description").long("description"))
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .allow_hyphen_values(true)
                                .help("Negative for expenses"),
                        )
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("subcategory")
                                .long("subcategory")
                                .help("Resolved under --category, or the current category"),
                        )
                        .arg(
                            Arg::new("uncategorize")
                                .long("uncategorize")
                                .action(ArgAction::SetTrue)
                                .conflicts_with_all(["category", "subcategory"]),
                        )
                        .arg(
                            Arg::new("recurring")
                                .long("recurring")
                                .value_parser(value_parser!(bool)),
                        ),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Delete transactions")
                        .arg(ids_arg().required(true)),
                )
                .subcommand(filter_args(
                    Command::new("recategorize")
                        .about("Move many transactions to one category")
                        .arg(ids_arg())
                        .arg(
                            Arg::new("set-category")
                                .long("set-category")
                                .required(true),
                        )
                        .arg(Arg::new("set-subcategory").long("set-subcategory")),
                ))
                .subcommand(json_flags(filter_args(Command::new("list")))),
        )
        .subcommand(
            Command::new("budget")
                .about("Budgets")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("month").long("month").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("subcategory").long("subcategory"))
                        .arg(Arg::new("amount").long("amount").required(true)),
                )
                .subcommand(Command::new("list").arg(Arg::new("month").long("month")))
                .subcommand(json_flags(
                    Command::new("annual")
                        .about("Planned vs. actual for every month of a year")
                        .arg(
                            Arg::new("year")
                                .long("year")
                                .required(true)
                                .value_parser(value_parser!(i32)),
                        )
                        .arg(
                            Arg::new("rollover")
                                .long("rollover")
                                .action(ArgAction::SetTrue)
                                .help(
                                    "Count budgets dated on a month's last day toward the next month. \
                                     budget set and budget imports always store the 1st, so this only \
                                     changes budgets written by other tools",
                                ),
                        )
                        .arg(
                            Arg::new("expand")
                                .long("expand")
                                .action(ArgAction::SetTrue)
                                .help("Show subcategory rows"),
                        ),
                ))
                .subcommand(json_flags(
                    Command::new("status")
                        .about("Budget status per category for one month")
                        .arg(Arg::new("month").long("month").required(true)),
                )),
        )
        .subcommand(
            Command::new("import")
                .about("Import CSV files")
                .subcommand(
                    Command::new("transactions").arg(Arg::new("path").long("path").required(true)),
                )
                .subcommand(
                    Command::new("budgets").arg(Arg::new("path").long("path").required(true)),
                ),
        )
        .subcommand(
            Command::new("export").about("Export data").subcommand(filter_args(
                Command::new("transactions")
                    .arg(
                        Arg::new("format")
                            .long("format")
                            .default_value("csv")
                            .help("csv|json"),
                    )
                    .arg(Arg::new("out").long("out").required(true))
                    .arg(
                        Arg::new("delimiter")
                            .long("delimiter")
                            .default_value(",")
                            .value_parser([",", ";"]),
                    ),
            )),
        )
        .subcommand(
            Command::new("template")
                .about("Write an example upload file")
                .subcommand(
                    Command::new("transactions").arg(Arg::new("out").long("out").required(true)),
                )
                .subcommand(Command::new("budgets").arg(Arg::new("out").long("out").required(true))),
        )
}
