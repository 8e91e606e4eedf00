// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};

use crate::launch::WorkerRequest;
use crate::types::DeploymentMode;

/// Command-line arguments for `skinbridge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "skinbridge",
    version,
    about = "Run the hole skin worker, report its preview and collect its results.",
    long_about = None
)]
#[command(group(
    ArgGroup::new("dirs")
        .required(true)
        .args(["root_data_dir", "input_data_dir"])
))]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Skinbridge.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Skinbridge.toml")]
    pub config: String,

    /// Override `[launcher].mode` from the config file.
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<DeploymentMode>,

    /// Override `[session].timeout` (e.g. "30m").
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Root directory holding `input_data/`, `resources/` and `output_data/`.
    #[arg(long, value_name = "DIR", conflicts_with_all = ["input_data_dir", "resources_dir", "output_data_dir"])]
    pub root_data_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR", requires_all = ["resources_dir", "output_data_dir"])]
    pub input_data_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    pub resources_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    pub output_data_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SKINBRIDGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the worker command line without running it.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Build the worker request from whichever directory flags were given.
    ///
    /// Returns `None` when the flags are incomplete; clap's argument group
    /// normally prevents that.
    pub fn request(&self) -> Option<WorkerRequest> {
        if let Some(root) = &self.root_data_dir {
            return Some(WorkerRequest::Root {
                root_data_dir: root.clone(),
            });
        }
        Some(WorkerRequest::Split {
            input_data_dir: self.input_data_dir.clone()?,
            resources_dir: self.resources_dir.clone()?,
            output_data_dir: self.output_data_dir.clone()?,
        })
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_flag_builds_root_request() {
        let args = CliArgs::try_parse_from(["skinbridge", "--root-data-dir", "/data"]).unwrap();
        assert_eq!(
            args.request(),
            Some(WorkerRequest::Root {
                root_data_dir: PathBuf::from("/data")
            })
        );
    }

    #[test]
    fn split_flags_build_split_request() {
        let args = CliArgs::try_parse_from([
            "skinbridge",
            "--input-data-dir",
            "/in",
            "--resources-dir",
            "/res",
            "--output-data-dir",
            "/out",
            "--mode",
            "packaged",
        ])
        .unwrap();
        assert_eq!(args.mode, Some(DeploymentMode::Packaged));
        assert_eq!(
            args.request(),
            Some(WorkerRequest::Split {
                input_data_dir: PathBuf::from("/in"),
                resources_dir: PathBuf::from("/res"),
                output_data_dir: PathBuf::from("/out"),
            })
        );
    }

    #[test]
    fn root_and_split_flags_conflict() {
        let res = CliArgs::try_parse_from([
            "skinbridge",
            "--root-data-dir",
            "/data",
            "--input-data-dir",
            "/in",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn some_directory_flag_is_required() {
        assert!(CliArgs::try_parse_from(["skinbridge"]).is_err());
    }
}
