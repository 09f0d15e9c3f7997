use std::convert::Infallible;
use std::ffi::OsString;
use tracing::debug;

use super::error::{Result, SandboxError};
use super::exec::ProcessReplacer;
use super::invocation::{Invocation, LaunchContext};
use super::launch::LaunchConfig;
use super::probe::CommandRunner;

/// Relaunches through `docker run` / `podman run`.
pub struct ContainerLauncher<'a> {
    runner: &'a dyn CommandRunner,
    replacer: &'a dyn ProcessReplacer,
}

impl<'a> ContainerLauncher<'a> {
    pub fn new(runner: &'a dyn CommandRunner, replacer: &'a dyn ProcessReplacer) -> Self {
        Self { runner, replacer }
    }

    pub fn launch(&self, config: &LaunchConfig, ctx: &LaunchContext) -> Result<Infallible> {
        let command = config.backend().command();
        self.ensure_image(command, config.image())?;

        eprintln!(
            "hopping into sandbox (command: {}, image: {}) ...",
            command,
            config.image()
        );

        self.replacer.replace(build_invocation(config, ctx))
    }

    /// Probe, pull once if missing, probe again.
    pub fn ensure_image(&self, command: &str, image: &str) -> Result<()> {
        if self.image_exists(command, image)? {
            debug!("Image {} already present", image);
            return Ok(());
        }

        eprintln!("Image {} not found locally, attempting to pull...", image);
        eprintln!("Pulling image {} using {}...", image, command);
        self.runner
            .stream(command, &["pull".to_string(), image.to_string()])
            .map_err(|source| SandboxError::ImagePullFailed {
                command: command.to_string(),
                image: image.to_string(),
                source,
            })?;

        if self.image_exists(command, image)? {
            Ok(())
        } else {
            Err(SandboxError::ImageUnavailableAfterPull {
                image: image.to_string(),
            })
        }
    }

    fn image_exists(&self, command: &str, image: &str) -> Result<bool> {
        let args = ["images".to_string(), "-q".to_string(), image.to_string()];
        // A failure here usually means the engine daemon is not running.
        let stdout =
            self.runner
                .capture(command, &args)
                .map_err(|source| SandboxError::ImageProbeFailed {
                    command: command.to_string(),
                    image: image.to_string(),
                    source,
                })?;
        Ok(!stdout.trim().is_empty())
    }
}

/// `<engine> run -i --rm --init [-t] --volume cwd:cwd --workdir cwd
/// --env SANDBOX=<engine> <image> <argv0> <args...>`
pub fn build_invocation(config: &LaunchConfig, ctx: &LaunchContext) -> Invocation {
    let command = config.backend().command();
    let mut invocation = Invocation::new(command, ctx.env.clone());

    invocation.args(["run", "-i", "--rm", "--init"]);
    if ctx.stdin_is_terminal {
        invocation.arg("-t");
    }

    // Same absolute path inside so relative paths in the original args still resolve.
    let mut volume = OsString::from(ctx.cwd.as_os_str());
    volume.push(":");
    volume.push(ctx.cwd.as_os_str());
    invocation.arg("--volume").arg(volume);
    invocation.arg("--workdir").arg(ctx.cwd.as_os_str());

    invocation
        .arg("--env")
        .arg(format!("{}={}", super::SANDBOX_MARKER_ENV, command));

    invocation.arg(config.image());
    invocation.arg(ctx.exe.clone());
    invocation.args(ctx.args.iter().cloned());
    invocation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::detect::Platform;
    use crate::sandbox::launch::{SandboxRequest, build_launch_config};
    use crate::sandbox::probe::{MockCommandRunner, MockExecutableProbe};
    use mockall::Sequence;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    /// Records what it was asked to exec, then fails like a missing binary.
    #[derive(Default)]
    struct RecordingReplacer {
        seen: RefCell<Option<Invocation>>,
    }

    impl ProcessReplacer for RecordingReplacer {
        fn replace(&self, invocation: Invocation) -> Result<Infallible> {
            let program = invocation.program.clone();
            *self.seen.borrow_mut() = Some(invocation);
            Err(SandboxError::ExecutableNotFound(program))
        }
    }

    fn docker_config(image: &str) -> LaunchConfig {
        let mut probe = MockExecutableProbe::new();
        probe.expect_exists().returning(|cmd| cmd == "docker");
        let request = SandboxRequest {
            option: "docker".into(),
            image: Some(image.to_string()),
            ..SandboxRequest::default()
        };
        let env = |_: &str| -> std::result::Result<String, std::env::VarError> {
            Err(std::env::VarError::NotPresent)
        };
        build_launch_config(&request, &env, Platform::Linux, &probe)
            .unwrap()
            .unwrap()
    }

    fn context(tty: bool) -> LaunchContext {
        LaunchContext {
            exe: "/usr/local/bin/hopbox".into(),
            args: vec!["run".into(), "--".into(), "ls".into(), "./src".into()],
            cwd: PathBuf::from("/home/dev/project"),
            stdin_is_terminal: tty,
            env: BTreeMap::from([(OsString::from("TERM"), OsString::from("xterm"))]),
        }
    }

    fn is_images_probe(cmd: &str, args: &[String]) -> bool {
        cmd == "docker" && args == ["images", "-q", "my-image"]
    }

    #[test]
    fn invocation_mounts_cwd_at_same_path() {
        let invocation = build_invocation(&docker_config("my-image"), &context(false));

        assert_eq!(invocation.program, "docker");
        assert_eq!(
            invocation.args_lossy(),
            vec![
                "run",
                "-i",
                "--rm",
                "--init",
                "--volume",
                "/home/dev/project:/home/dev/project",
                "--workdir",
                "/home/dev/project",
                "--env",
                "SANDBOX=docker",
                "my-image",
                "/usr/local/bin/hopbox",
                "run",
                "--",
                "ls",
                "./src",
            ]
        );
        assert_eq!(invocation.env.get(&OsString::from("TERM")).unwrap(), "xterm");
    }

    #[test]
    fn tty_flag_only_with_terminal_stdin() {
        let with_tty = build_invocation(&docker_config("my-image"), &context(true));
        assert_eq!(&with_tty.args_lossy()[..5], ["run", "-i", "--rm", "--init", "-t"]);

        let without = build_invocation(&docker_config("my-image"), &context(false));
        assert!(!without.args_lossy().contains(&"-t".to_string()));
    }

    #[test]
    fn present_image_skips_pull() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .withf(is_images_probe)
            .times(1)
            .returning(|_, _| Ok("abc123\n".to_string()));
        runner.expect_stream().never();

        let replacer = RecordingReplacer::default();
        let err = ContainerLauncher::new(&runner, &replacer)
            .launch(&docker_config("my-image"), &context(false))
            .unwrap_err();

        assert!(matches!(err, SandboxError::ExecutableNotFound(_)));
        let seen = replacer.seen.borrow();
        assert_eq!(seen.as_ref().unwrap().program, "docker");
    }

    #[test]
    fn missing_image_is_pulled_then_reprobed() {
        let mut seq = Sequence::new();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .withf(is_images_probe)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(String::new()));
        runner
            .expect_stream()
            .withf(|cmd, args| cmd == "docker" && args == ["pull", "my-image"])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        runner
            .expect_capture()
            .withf(is_images_probe)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("abc123\n".to_string()));

        let replacer = RecordingReplacer::default();
        ContainerLauncher::new(&runner, &replacer)
            .ensure_image("docker", "my-image")
            .unwrap();
    }

    #[test]
    fn still_missing_after_pull_is_not_retried() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .withf(is_images_probe)
            .times(2)
            .returning(|_, _| Ok("  \n".to_string()));
        runner.expect_stream().times(1).returning(|_, _| Ok(()));

        let replacer = RecordingReplacer::default();
        let err = ContainerLauncher::new(&runner, &replacer)
            .launch(&docker_config("my-image"), &context(false))
            .unwrap_err();

        assert!(matches!(err, SandboxError::ImageUnavailableAfterPull { ref image } if image == "my-image"));
        assert!(replacer.seen.borrow().is_none());
    }

    #[test]
    fn failed_pull_is_reported() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .times(1)
            .returning(|_, _| Ok(String::new()));
        runner
            .expect_stream()
            .times(1)
            .returning(|_, _| Err(std::io::Error::other("registry unreachable")));

        let replacer = RecordingReplacer::default();
        let err = ContainerLauncher::new(&runner, &replacer)
            .ensure_image("docker", "my-image")
            .unwrap_err();
        assert!(matches!(err, SandboxError::ImagePullFailed { .. }));
    }

    #[test]
    fn failed_probe_is_reported() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_capture()
            .times(1)
            .returning(|_, _| Err(std::io::Error::other("daemon not running")));
        runner.expect_stream().never();

        let replacer = RecordingReplacer::default();
        let err = ContainerLauncher::new(&runner, &replacer)
            .ensure_image("docker", "my-image")
            .unwrap_err();
        assert!(matches!(err, SandboxError::ImageProbeFailed { .. }));
    }
}
