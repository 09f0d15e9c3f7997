use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use super::SANDBOX_MARKER_ENV;
use super::error::{Result, SandboxError};

/// A fully built command line for the process replacement primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to look up on `PATH`; also passed as argv[0].
    pub program: String,
    /// Arguments after argv[0].
    pub args: Vec<OsString>,
    /// Complete environment of the replacement process.
    pub env: BTreeMap<OsString, OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, env: BTreeMap<OsString, OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env,
        }
    }

    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Args as lossy strings, for display and assertions.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Snapshot of the running process that a relaunch has to reproduce.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    /// argv[0] exactly as this process was started.
    pub exe: OsString,
    /// argv[1..], passed through unmodified.
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    pub stdin_is_terminal: bool,
    pub env: BTreeMap<OsString, OsString>,
}

impl LaunchContext {
    pub fn capture() -> Result<Self> {
        let mut argv = std::env::args_os();
        let exe = argv.next().unwrap_or_else(|| OsString::from("hopbox"));
        let cwd = std::env::current_dir().map_err(SandboxError::WorkingDirectoryUnavailable)?;

        Ok(Self {
            exe,
            args: argv.collect(),
            cwd,
            stdin_is_terminal: std::io::stdin().is_terminal(),
            env: std::env::vars_os().collect(),
        })
    }

    /// The current environment with the sandbox marker set to `backend`.
    pub fn env_with_marker(&self, backend: &str) -> BTreeMap<OsString, OsString> {
        let mut env = self.env.clone();
        env.insert(SANDBOX_MARKER_ENV.into(), backend.into());
        env
    }
}
