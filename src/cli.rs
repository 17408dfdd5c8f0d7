// src/cli.rs
use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::{env, path::PathBuf};

use crate::{core::config::DEFAULT_PIPELINE_FILE, infra::t};

pub mod commands;

/// Pre-parses the command line arguments to find an explicit language.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for `--lang <VALUE>` and `--lang=<VALUE>`.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang=").map(str::to_string))
}

fn build_cli(locale: &str) -> Command {
    Command::new("matlab-runner")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cmd_run_about", locale = locale).to_string())
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help(t!("arg_config", locale = locale).to_string())
                        .value_name("CONFIG")
                        .default_value(DEFAULT_PIPELINE_FILE)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(workspace_arg(locale))
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("arg_html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help(t!("arg_json", locale = locale).to_string())
                        .value_name("JSON")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("command")
                .about(t!("cmd_command_about", locale = locale).to_string())
                .arg(
                    Arg::new("command")
                        .help(t!("arg_command", locale = locale).to_string())
                        .value_name("COMMAND")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(workspace_arg(locale))
                .arg(
                    Arg::new("matlab-root")
                        .long("matlab-root")
                        .help(t!("arg_matlab_root", locale = locale).to_string())
                        .value_name("MATLAB_ROOT")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("startup-options")
                        .long("startup-options")
                        .help(t!("arg_startup_options", locale = locale).to_string())
                        .value_name("OPTIONS")
                        .allow_hyphen_values(true)
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help(t!("arg_output", locale = locale).to_string())
                        .value_name("OUTPUT")
                        .default_value(DEFAULT_PIPELINE_FILE)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
}

fn workspace_arg(locale: &str) -> Arg {
    Arg::new("workspace")
        .short('w')
        .long("workspace")
        .help(t!("arg_workspace", locale = locale).to_string())
        .value_name("WORKSPACE")
        .default_value(".")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn path_arg(matches: &clap::ArgMatches, id: &str) -> PathBuf {
    // Every path argument read this way has a default value.
    matches.get_one::<PathBuf>(id).cloned().unwrap_or_default()
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let explicit_language = pre_parse_language();
    let language = match &explicit_language {
        Some(lang) => {
            rust_i18n::set_locale(lang);
            lang.clone()
        }
        None => crate::init(),
    };

    let matches = build_cli(&language).get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            commands::run::execute(
                path_arg(run_matches, "config"),
                path_arg(run_matches, "workspace"),
                run_matches.get_one::<PathBuf>("html").cloned(),
                run_matches.get_one::<PathBuf>("json").cloned(),
                explicit_language,
            )
            .await?;
        }
        Some(("command", command_matches)) => {
            let command = command_matches
                .get_one::<String>("command")
                .cloned()
                .unwrap_or_default();
            commands::command::execute(
                command,
                path_arg(command_matches, "workspace"),
                command_matches.get_one::<String>("matlab-root").cloned(),
                command_matches.get_one::<String>("startup-options").cloned(),
                &language,
            )
            .await?;
        }
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");

            // Show language detection message if it was auto-detected
            if explicit_language.is_none() && !non_interactive {
                println!(
                    "🌐 {}",
                    t!("system_language_detected", locale = &language, lang = &language)
                );
            }
            commands::init::run_init_wizard(&path_arg(init_matches, "output"), &language, non_interactive)?;
        }
        _ => {
            // `subcommand_required` makes clap print help and exit before this.
        }
    }
    Ok(())
}
