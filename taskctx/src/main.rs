//! Command-line host for execution contexts.
//!
//! Builds one context from a profile and flags, runs one operation against it,
//! and exits. Useful for checking what a task would see for a given base
//! directory and variable set.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use taskctx::exit_codes;
use taskctx::io::ambient::capture_environment;
use taskctx::io::config::{ContextConfig, load_config};
use taskctx::io::probe::FsProbe;
use taskctx::io::process::run_launch;
use taskctx::{ExecutionContext, PathStyle};

#[derive(Parser)]
#[command(
    name = "taskctx",
    version,
    about = "Resolve paths, variables and process launches inside an isolated task context"
)]
struct Cli {
    /// TOML context profile. Missing files fall back to defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base directory; overrides the profile. Defaults to the current directory.
    #[arg(long, global = true)]
    base: Option<String>,

    /// Path syntax; overrides the profile.
    #[arg(long, value_enum, global = true)]
    style: Option<StyleArg>,

    /// Start from an empty environment instead of inheriting this process's.
    #[arg(long, global = true)]
    clean_env: bool,

    /// Seed a context-local variable.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment, global = true)]
    set: Vec<(String, String)>,

    /// Clear a variable for this context only.
    #[arg(long = "unset", value_name = "NAME", global = true)]
    unset: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StyleArg {
    Unix,
    Windows,
}

impl From<StyleArg> for PathStyle {
    fn from(value: StyleArg) -> Self {
        match value {
            StyleArg::Unix => Self::Unix,
            StyleArg::Windows => Self::Windows,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the absolute form of PATH.
    Resolve { path: String },
    /// Print the canonical form of PATH.
    Canonical { path: String },
    /// Print the value of a variable (exit 2 when missing).
    Env { name: String },
    /// Locate an executable through the context's PATH (exit 2 when not found).
    Which { name: String },
    /// Print the launch descriptor for a process, optionally running it.
    Launch {
        /// Print the descriptor as JSON.
        #[arg(long)]
        json: bool,
        /// Spawn the process and exit with its status.
        #[arg(long)]
        run: bool,
        executable: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got {raw:?}")),
    }
}

fn main() {
    taskctx::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let cfg = merged_config(&cli)?;
    let mut ctx = build_context(&cfg);

    match cli.command {
        Command::Resolve { path } => {
            println!("{}", ctx.get_absolute_path(&path)?);
            Ok(exit_codes::OK)
        }
        Command::Canonical { path } => {
            println!("{}", ctx.get_canonical_form(&path)?);
            Ok(exit_codes::OK)
        }
        Command::Env { name } => match ctx.get_environment_variable(&name) {
            Some(value) => {
                println!("{value}");
                Ok(exit_codes::OK)
            }
            None => Ok(exit_codes::MISSING),
        },
        Command::Which { name } => match ctx.resolve_tool(&name, &FsProbe)? {
            Some(path) => {
                println!("{path}");
                Ok(exit_codes::OK)
            }
            None => Ok(exit_codes::MISSING),
        },
        Command::Launch {
            json,
            run,
            executable,
            args,
        } => {
            let launch = ctx.build_process_launch(&executable, args)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&launch).context("serialize launch")?
                );
            } else if !run {
                println!("{launch}");
                println!("cwd: {}", launch.working_directory);
            }
            if !run {
                return Ok(exit_codes::OK);
            }

            let output = run_launch(
                &launch,
                None,
                cfg.launch.timeout(),
                cfg.launch.output_limit_bytes,
            )?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&output.stdout).context("write stdout")?;
            let mut stderr = std::io::stderr().lock();
            stderr.write_all(&output.stderr).context("write stderr")?;
            write!(
                stderr,
                "{}{}",
                output.stdout_truncated_notice(&executable),
                output.stderr_truncated_notice(&executable)
            )
            .context("write truncation notice")?;

            if output.timed_out {
                return Ok(exit_codes::TIMED_OUT);
            }
            output
                .status
                .code()
                .ok_or_else(|| anyhow!("{executable} terminated by signal"))
        }
    }
}

/// Merge the profile with command-line overrides.
fn merged_config(cli: &Cli) -> Result<ContextConfig> {
    let mut cfg = match &cli.config {
        Some(path) => load_config(path)?,
        None => ContextConfig::default(),
    };
    if let Some(base) = &cli.base {
        cfg.base_directory = base.clone();
    }
    if cfg.base_directory.is_empty() {
        let cwd = std::env::current_dir().context("read current directory")?;
        cfg.base_directory = cwd.to_string_lossy().into_owned();
    }
    if let Some(style) = cli.style {
        cfg.path_style = Some(style.into());
    }
    if cli.clean_env {
        cfg.inherit_environment = false;
    }
    for (name, value) in &cli.set {
        cfg.variables.insert(name.clone(), value.clone());
    }
    cfg.unset.extend(cli.unset.iter().cloned());
    cfg.validate()?;
    Ok(cfg)
}

/// The only point where this process's environment is read for a context.
fn build_context(cfg: &ContextConfig) -> ExecutionContext {
    let ambient = if cfg.inherit_environment {
        capture_environment()
    } else {
        Vec::new()
    };
    cfg.build_context(ambient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolve_with_global_flags() {
        let cli = Cli::parse_from(["taskctx", "resolve", "cfg/a.json", "--base", "/proj/x"]);
        assert_eq!(cli.base.as_deref(), Some("/proj/x"));
        assert!(matches!(cli.command, Command::Resolve { ref path } if path == "cfg/a.json"));
    }

    #[test]
    fn parse_set_assignments() {
        let cli = Cli::parse_from([
            "taskctx",
            "--set",
            "A=1",
            "--set",
            "B=x=y",
            "env",
            "A",
        ]);
        assert_eq!(
            cli.set,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "x=y".to_string())
            ]
        );
    }

    #[test]
    fn parse_rejects_assignment_without_name() {
        assert!(Cli::try_parse_from(["taskctx", "--set", "=v", "env", "A"]).is_err());
    }

    #[test]
    fn parse_launch_keeps_hyphenated_args() {
        let cli = Cli::parse_from([
            "taskctx", "launch", "--run", "ls", "--", "-la", "--color",
        ]);
        match cli.command {
            Command::Launch {
                run,
                json,
                executable,
                args,
            } => {
                assert!(run);
                assert!(!json);
                assert_eq!(executable, "ls");
                assert_eq!(args, vec!["-la".to_string(), "--color".to_string()]);
            }
            _ => panic!("expected launch"),
        }
    }

    #[test]
    fn build_context_applies_overrides() {
        let cli = Cli::parse_from([
            "taskctx",
            "--base",
            "/proj/y",
            "--style",
            "unix",
            "--clean-env",
            "--set",
            "NUGET_PACKAGES=/b",
            "env",
            "NUGET_PACKAGES",
        ]);
        let cfg = merged_config(&cli).expect("config");
        let ctx = build_context(&cfg);
        assert_eq!(ctx.base_directory(), "/proj/y");
        assert_eq!(ctx.get_environment_variable("NUGET_PACKAGES"), Some("/b"));
        assert_eq!(ctx.get_environment_variable("PATH"), None);
    }
}
