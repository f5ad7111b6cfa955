use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

/// 受管进程名称（固定集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessName {
    Calc,
    Db,
    Sim,
}

impl ProcessName {
    /// 启动顺序：CALC 先于依赖它的 DB、SIM
    pub const START_ORDER: [ProcessName; 3] = [ProcessName::Calc, ProcessName::Db, ProcessName::Sim];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessName::Calc => "CALC",
            ProcessName::Db => "DB",
            ProcessName::Sim => "SIM",
        }
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 受管程序：名称 + 启动命令行
#[derive(Debug, Clone)]
pub struct ManagedProgram {
    pub name: ProcessName,
    /// 第一个词为可执行文件，其余为参数；未配置时为 None
    pub command: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartStatus {
    Success,
    AlreadyRunning,
    Failure,
}

/// 单个进程的启动结果
#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub status: StartStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    Success,
    Failure,
    Stopped,
}

/// 单个进程的停止结果
#[derive(Debug, Clone, Serialize)]
pub struct StopOutcome {
    pub status: StopStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Stopped,
}

/// 进程运行状态；stopped 时保留过期 PID 便于排查
#[derive(Debug, Clone, Serialize)]
pub struct ProcessState {
    pub status: RunState,
    pub pid: Option<u32>,
}

/// 批量启动/停止的结果
///
/// 已经执行的动作总会返回；PID 文件写入失败时 store_error 携带原因。
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorReport<T> {
    #[serde(flatten)]
    pub outcomes: BTreeMap<String, T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
}

impl<T> Deref for SupervisorReport<T> {
    type Target = BTreeMap<String, T>;

    fn deref(&self) -> &Self::Target {
        &self.outcomes
    }
}
