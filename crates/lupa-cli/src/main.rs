// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use lupa_app::{Session, SignalType};
use runtime::{BackendRuntime, DemoSource};
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `lupa --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let mut session = Session::new(options.signal);
    session.index_pattern = config.index_pattern().to_owned();
    session.page_size = config.page_size();
    session.auto_detect_on_start = config.auto_range();
    session.auto_refresh = config.auto_refresh();

    if options.demo {
        if options.check_only {
            return Ok(());
        }
        let mut source = DemoSource::default();
        return lupa_tui::run_app(&mut session, &mut source);
    }

    let search = lupa_search::Client::new(
        config.base_url(),
        config.index_pattern(),
        config.credentials(),
    )
    .with_context(|| {
        format!(
            "invalid [backend] config in {}; fix base_url/index_pattern/credential values",
            options.config_path.display()
        )
    })?;

    let llm = if config.llm_enabled() {
        Some(
            lupa_llm::Client::new(config.llm_base_url(), config.llm_model(), config.llm_timeout()?)
                .with_context(|| {
                    format!(
                        "invalid [llm] config in {}; fix base_url/model/timeout values",
                        options.config_path.display()
                    )
                })?,
        )
    } else {
        None
    };

    if options.check_only {
        search.ping().context("backend ping failed")?;
        if let Some(llm) = &llm {
            llm.ping().context("llm ping failed")?;
        }
        return Ok(());
    }

    let mut source = BackendRuntime::new(search, llm);
    lupa_tui::run_app(&mut session, &mut source)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    signal: SignalType,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        signal: SignalType::Logs,
        print_config_path: false,
        print_example: false,
        demo: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--signal" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--signal requires one of: logs, traces, metrics, chat"))?;
                options.signal = SignalType::parse(value.as_ref()).ok_or_else(|| {
                    anyhow::anyhow!(
                        "unknown signal {:?}; use one of: logs, traces, metrics, chat",
                        value.as_ref()
                    )
                })?;
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("lupa - terminal browser for logs, traces, and metrics");
    println!("  --config <path>          Use a specific config path");
    println!("  --signal <name>          Start on logs, traces, metrics, or chat");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch against deterministic sample data");
    println!("  --check                  Validate config and backend connectivity");
    println!("  --help                   Show this help");
}
