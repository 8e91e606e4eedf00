//! Throwaway worker installations for end-to-end tests.
//!
//! The fixture lays out a dev-mode install in a temp dir:
//!
//! ```text
//! <tmp>/venv/bin/python        -> /bin/sh
//! <tmp>/scripts/<command>.py   (shell script body)
//! ```
//!
//! so the real launcher runs `sh <tmp>/scripts/<command>.py --root-data-dir ..`.
//! The script is read by `sh` rather than executed, which avoids ETXTBSY
//! races with files freshly written by parallel tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use skinbridge::config::LauncherSection;
use skinbridge::launch::{ProcessLauncher, WorkerRequest};
use skinbridge::types::DeploymentMode;
use tempfile::TempDir;

use crate::fakes::FakeEnvironment;

pub const COMMAND: &str = "plot_courses";

pub struct WorkerFixture {
    dir: TempDir,
}

impl WorkerFixture {
    /// Install a worker whose behaviour is the given shell script body.
    #[cfg(unix)]
    pub fn new(script_body: &str) -> Result<Self> {
        let dir = tempfile::tempdir()?;

        let bin = dir.path().join("venv").join("bin");
        std::fs::create_dir_all(&bin)?;
        std::os::unix::fs::symlink("/bin/sh", bin.join("python"))?;

        let scripts = dir.path().join("scripts");
        std::fs::create_dir_all(&scripts)?;
        std::fs::write(
            scripts.join(format!("{COMMAND}.py")),
            format!("{script_body}\n"),
        )?;

        std::fs::create_dir_all(dir.path().join("data"))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Dev-mode launcher pointing at this fixture.
    pub fn launcher(&self) -> ProcessLauncher {
        self.launcher_with(FakeEnvironment::at(self.path().join("venv")))
    }

    pub fn launcher_with(&self, env: FakeEnvironment) -> ProcessLauncher {
        let mut section = LauncherSection::default();
        section.mode = DeploymentMode::Dev;
        section.command = COMMAND.to_string();
        section.script_dir = self.path().join("scripts");
        ProcessLauncher::new(section.into(), Arc::new(env))
    }

    pub fn request(&self) -> WorkerRequest {
        WorkerRequest::Root {
            root_data_dir: self.data_dir(),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.path().join("data")
    }
}
