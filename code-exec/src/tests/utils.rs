pub mod defaults {
    use crate::SandboxConfig;
    use std::path::Path;
    use tokio::time::Duration;

    pub fn test_config(workspace_root: &Path) -> SandboxConfig {
        SandboxConfig {
            timeout: default_timeout(),
            max_concurrent_executions: 4,
            workspace_root: workspace_root.to_path_buf(),
        }
    }

    pub fn default_timeout() -> Duration {
        Duration::from_secs(10)
    }

    pub fn short_timeout() -> Duration {
        Duration::from_secs(2)
    }

    /// Entries left behind in a workspace root
    pub fn leftover_entries(root: &Path) -> Vec<std::path::PathBuf> {
        match std::fs::read_dir(root) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub mod spy {
    use crate::{CommandRunner, CommandSpec, ExecutionOutcome};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Duration;

    type Script = Box<dyn Fn(&CommandSpec) -> ExecutionOutcome + Send + Sync>;

    /// Records every command instead of spawning it
    pub struct SpyRunner {
        script: Script,
        delay: Duration,
        calls: Mutex<Vec<CommandSpec>>,
        workspace_existed: Mutex<Vec<bool>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl SpyRunner {
        pub fn new<F>(script: F) -> Self
        where
            F: Fn(&CommandSpec) -> ExecutionOutcome + Send + Sync + 'static,
        {
            Self {
                script: Box::new(script),
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
                workspace_existed: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }

        pub fn succeeding() -> Self {
            Self::new(|_| ExecutionOutcome::success("ok\n"))
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        pub fn programs(&self) -> Vec<String> {
            self.calls()
                .iter()
                .map(|spec| spec.program.to_string_lossy().into_owned())
                .collect()
        }

        pub fn working_dirs(&self) -> Vec<PathBuf> {
            self.calls().into_iter().map(|spec| spec.working_dir).collect()
        }

        pub fn workspace_existed(&self) -> Vec<bool> {
            self.workspace_existed.lock().unwrap().clone()
        }

        pub fn peak_in_flight(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CommandRunner for SpyRunner {
        async fn run(&self, spec: CommandSpec) -> ExecutionOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            self.workspace_existed
                .lock()
                .unwrap()
                .push(spec.working_dir.is_dir());
            self.calls.lock().unwrap().push(spec.clone());

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let outcome = (self.script)(&spec);

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            outcome
        }
    }
}

pub mod process {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    /// Whether a process with `pid` still exists and is not a zombie
    pub fn is_running(pid: i32) -> bool {
        if kill(Pid::from_raw(pid), None).is_err() {
            return false;
        }
        // unreaped zombies still answer signal 0
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .map_or(true, |rest| !rest.trim_start().starts_with('Z')),
            Err(_) => true,
        }
    }
}
