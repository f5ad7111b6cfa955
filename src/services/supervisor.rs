use anyhow::Context;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::models::{
    ManagedProgram, ProcessName, ProcessState, RunState, StartOutcome, StartStatus, StopOutcome,
    StopStatus, SupervisorReport,
};
use crate::services::pid_store::{PidMap, PidStore};
use crate::services::process_checker::{is_process_running, terminate_process};

/// 管理 CALC / DB / SIM 三个外部进程
///
/// 不在内存中保存任何状态：每次调用都从 PID 文件读取、对照系统进程表、
/// 修改后写回，读改写全程持有文件锁。
pub struct Supervisor {
    store: PidStore,
    programs: Vec<ManagedProgram>,
    spawn_grace: Duration,
}

impl Supervisor {
    pub fn new(store: PidStore, programs: Vec<ManagedProgram>, spawn_grace: Duration) -> Self {
        Self { store, programs, spawn_grace }
    }

    /// 受管名称与存储中名称的并集
    pub async fn known_names(&self) -> anyhow::Result<Vec<String>> {
        let _lock = self.store.acquire(false).await?;
        let pids = self.store.load();

        let mut names: Vec<String> = self.programs.iter().map(|p| p.name.to_string()).collect();
        for name in pids.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Ok(names)
    }

    /// 查询状态，只读
    pub async fn status(&self, names: &[String]) -> anyhow::Result<BTreeMap<String, ProcessState>> {
        let pids = {
            let _lock = self.store.acquire(false).await?;
            self.store.load()
        };

        let statuses = names
            .iter()
            .map(|name| {
                let pid = pids.get(name).copied();
                let status = match pid {
                    Some(p) if is_process_running(p) => RunState::Running,
                    _ => RunState::Stopped,
                };
                (name.clone(), ProcessState { status, pid })
            })
            .collect();

        Ok(statuses)
    }

    /// 按 CALC、DB、SIM 的顺序启动；单个失败不影响其他进程
    pub async fn start(&self) -> anyhow::Result<SupervisorReport<StartOutcome>> {
        let _lock = self.store.acquire(true).await?;
        let mut pids = self.store.load();
        let mut outcomes = BTreeMap::new();

        for name in ProcessName::START_ORDER {
            let key = name.to_string();

            if let Some(pid) = pids.get(&key).copied().filter(|p| is_process_running(*p)) {
                log::info!("{} already running with PID {}", name, pid);
                outcomes.insert(key, StartOutcome {
                    status: StartStatus::AlreadyRunning,
                    message: format!("Process {} is already running", name),
                    pid: Some(pid),
                });
                continue;
            }

            let command = self
                .programs
                .iter()
                .find(|p| p.name == name)
                .and_then(|p| p.command.as_deref());

            let outcome = match self.spawn_detached(name, command).await {
                Ok(pid) => {
                    log::info!("✓ Started {} with PID {}", name, pid);
                    pids.insert(key.clone(), pid);
                    StartOutcome {
                        status: StartStatus::Success,
                        message: format!("Process {} started successfully", name),
                        pid: Some(pid),
                    }
                }
                Err(e) => {
                    log::warn!("Failed to start {}: {:#}", name, e);
                    StartOutcome {
                        status: StartStatus::Failure,
                        message: format!("Failed to start process {}: {:#}", name, e),
                        pid: None,
                    }
                }
            };
            outcomes.insert(key, outcome);
        }

        let store_error = self.persist(&pids, "start");
        Ok(SupervisorReport { outcomes, store_error })
    }

    /// 停止存储中的进程（`only` 为 None 时停止全部）
    ///
    /// 无论信号是否送达，条目都会从存储中移除；不等待进程真正退出。
    pub async fn stop(&self, only: Option<&[String]>) -> anyhow::Result<SupervisorReport<StopOutcome>> {
        let _lock = self.store.acquire(true).await?;
        let mut pids = self.store.load();

        let targets: Vec<(String, u32)> = pids
            .iter()
            .filter(|(name, _)| only.map_or(true, |names| names.contains(*name)))
            .map(|(name, pid)| (name.clone(), *pid))
            .collect();

        let mut outcomes = BTreeMap::new();

        for (name, pid) in targets {
            let outcome = if is_process_running(pid) {
                if terminate_process(pid) {
                    log::info!("✓ Sent SIGTERM to {} (PID {})", name, pid);
                    StopOutcome {
                        status: StopStatus::Success,
                        message: format!("Process {} with PID {} terminated", name, pid),
                    }
                } else {
                    log::warn!("Failed to signal {} (PID {})", name, pid);
                    StopOutcome {
                        status: StopStatus::Failure,
                        message: format!("Failed to terminate process {} with PID {}", name, pid),
                    }
                }
            } else {
                log::info!("{} (PID {}) was already stopped", name, pid);
                StopOutcome {
                    status: StopStatus::Stopped,
                    message: format!("Process {} with PID {} is already stopped", name, pid),
                }
            };

            pids.remove(&name);
            outcomes.insert(name, outcome);
        }

        let store_error = self.persist(&pids, "stop");
        Ok(SupervisorReport { outcomes, store_error })
    }

    /// 写回 PID 文件；失败不回滚已执行的动作，只把原因带回给调用方
    fn persist(&self, pids: &PidMap, action: &str) -> Option<String> {
        match self.store.save(pids) {
            Ok(()) => {
                log::info!("Recorded {} PIDs in {:?} after {}", pids.len(), self.store.path(), action);
                None
            }
            Err(e) => {
                let e = anyhow::Error::new(e).context(format!("failed to persist PIDs after {}", action));
                log::error!("{:#}", e);
                Some(format!("{:#}", e))
            }
        }
    }

    /// 后台启动进程并返回 PID；标准输入输出全部断开，不等待退出
    async fn spawn_detached(&self, name: ProcessName, command: Option<&str>) -> anyhow::Result<u32> {
        let command = command
            .ok_or_else(|| anyhow::anyhow!("no executable configured for {}", name))?;

        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty command configured for {}", name))?;

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        // 独立进程组，避免随本服务一起收到终端信号
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("cannot launch '{}'", program))?;

        let pid = child
            .id()
            .ok_or_else(|| anyhow::anyhow!("'{}' exited before its PID was read", program))?;

        if !self.spawn_grace.is_zero() {
            tokio::time::sleep(self.spawn_grace).await;
        }

        if let Some(status) = child.try_wait().context("cannot poll child")? {
            anyhow::bail!("'{}' exited immediately ({})", program, status);
        }

        // 返回后 child 句柄被 drop，进程继续运行，退出后由 tokio 回收
        if !is_process_running(pid) {
            anyhow::bail!("'{}' (PID {}) is not running", program, pid);
        }

        Ok(pid)
    }
}
