// src/launch/request.rs

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::errors::{BridgeError, Result};

/// One orchestrator request. The worker is invoked once per request, never
/// per file.
///
/// Two argument layouts exist for the same worker; both are accepted here so
/// callers only ever deal with this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerRequest {
    Split {
        input_data_dir: PathBuf,
        resources_dir: PathBuf,
        output_data_dir: PathBuf,
    },
    Root {
        root_data_dir: PathBuf,
    },
}

impl WorkerRequest {
    /// Expand a root directory into the three directories the worker derives
    /// from it.
    pub fn split_from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        WorkerRequest::Split {
            input_data_dir: root.join("input_data"),
            resources_dir: root.join("resources"),
            output_data_dir: root.join("output_data"),
        }
    }

    /// Reject requests with empty directory paths.
    pub fn validate(&self) -> Result<()> {
        let named: Vec<(&str, &Path)> = match self {
            WorkerRequest::Split {
                input_data_dir,
                resources_dir,
                output_data_dir,
            } => vec![
                ("input data", input_data_dir.as_path()),
                ("resources", resources_dir.as_path()),
                ("output data", output_data_dir.as_path()),
            ],
            WorkerRequest::Root { root_data_dir } => {
                vec![("root data", root_data_dir.as_path())]
            }
        };

        for (what, path) in named {
            if path.as_os_str().is_empty() {
                return Err(BridgeError::Launch(format!(
                    "{what} directory must not be empty"
                )));
            }
        }
        Ok(())
    }

    /// Typed worker flags, in the order the worker documents them.
    pub fn args(&self) -> Vec<WorkerArg> {
        match self {
            WorkerRequest::Split {
                input_data_dir,
                resources_dir,
                output_data_dir,
            } => vec![
                WorkerArg::dir("--input-data-dir", input_data_dir),
                WorkerArg::dir("--resources-dir", resources_dir),
                WorkerArg::dir("--output-data-dir", output_data_dir),
            ],
            WorkerRequest::Root { root_data_dir } => {
                vec![WorkerArg::dir("--root-data-dir", root_data_dir)]
            }
        }
    }
}

/// A single typed worker argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerArg {
    /// `<flag> <directory>`
    Dir { flag: &'static str, path: PathBuf },
}

impl WorkerArg {
    pub fn dir(flag: &'static str, path: impl Into<PathBuf>) -> Self {
        WorkerArg::Dir {
            flag,
            path: path.into(),
        }
    }

    /// Append this argument's argv form to `out`.
    pub fn push_to(&self, out: &mut Vec<OsString>) {
        match self {
            WorkerArg::Dir { flag, path } => {
                out.push(OsString::from(*flag));
                out.push(path.as_os_str().to_os_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(req: &WorkerRequest) -> Vec<OsString> {
        let mut out = Vec::new();
        for arg in req.args() {
            arg.push_to(&mut out);
        }
        out
    }

    #[test]
    fn split_request_emits_three_flags_in_order() {
        let req = WorkerRequest::Split {
            input_data_dir: "/in".into(),
            resources_dir: "/res".into(),
            output_data_dir: "/out".into(),
        };
        let expected: Vec<OsString> = [
            "--input-data-dir",
            "/in",
            "--resources-dir",
            "/res",
            "--output-data-dir",
            "/out",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        assert_eq!(argv(&req), expected);
    }

    #[test]
    fn root_request_emits_single_flag() {
        let req = WorkerRequest::Root {
            root_data_dir: "/data".into(),
        };
        assert_eq!(
            argv(&req),
            vec![OsString::from("--root-data-dir"), OsString::from("/data")]
        );
    }

    #[test]
    fn split_from_root_uses_worker_layout() {
        match WorkerRequest::split_from_root("/data") {
            WorkerRequest::Split {
                input_data_dir,
                resources_dir,
                output_data_dir,
            } => {
                assert_eq!(input_data_dir, PathBuf::from("/data/input_data"));
                assert_eq!(resources_dir, PathBuf::from("/data/resources"));
                assert_eq!(output_data_dir, PathBuf::from("/data/output_data"));
            }
            other => panic!("expected Split, got {other:?}"),
        }
    }

    #[test]
    fn empty_directory_is_a_launch_error() {
        let req = WorkerRequest::Split {
            input_data_dir: "/in".into(),
            resources_dir: PathBuf::new(),
            output_data_dir: "/out".into(),
        };
        match req.validate() {
            Err(BridgeError::Launch(msg)) => assert!(msg.contains("resources")),
            other => panic!("expected Launch error, got {other:?}"),
        }
    }
}
