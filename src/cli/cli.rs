use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{ManagedProgram, ProcessName};

/// Geo Supervisor - 管理 CALC/DB/SIM 进程并导出定位日志
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// 监听端口
    #[arg(short, long, env = "PORT", default_value_t = 9999)]
    pub port: u16,

    /// 监听地址
    #[arg(short = 'a', long, env = "ADDRESS", default_value = "0.0.0.0")]
    pub address: String,

    /// CALC 启动命令
    #[arg(long, env = "PATH_TO_CALC_EXE")]
    pub calc_exe: Option<String>,

    /// DB 启动命令
    #[arg(long, env = "PATH_TO_DB_EXE")]
    pub db_exe: Option<String>,

    /// SIM 启动命令
    #[arg(long, env = "PATH_TO_SIM_EXE")]
    pub sim_exe: Option<String>,

    /// 仿真日志路径
    #[arg(long, env = "PATH_TO_LOG", default_value = "simulation.log")]
    pub log_path: PathBuf,

    /// PID 持久化文件
    #[arg(long, env = "PID_FILE", default_value = "process_info.json")]
    pub pid_file: PathBuf,

    /// 启动后等待多久再做存活检查（毫秒）
    #[arg(long, env = "SPAWN_GRACE_MS", default_value_t = 200)]
    pub spawn_grace_ms: u64,
}

impl CommandArgs {
    pub fn programs(&self) -> Vec<ManagedProgram> {
        ProcessName::START_ORDER
            .into_iter()
            .map(|name| {
                let command = match name {
                    ProcessName::Calc => &self.calc_exe,
                    ProcessName::Db => &self.db_exe,
                    ProcessName::Sim => &self.sim_exe,
                };
                ManagedProgram { name, command: command.clone() }
            })
            .collect()
    }

    pub fn spawn_grace(&self) -> Duration {
        Duration::from_millis(self.spawn_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CommandArgs::try_parse_from(["geo-supervisor"]).unwrap();
        assert_eq!(args.pid_file, PathBuf::from("process_info.json"));
        assert_eq!(args.spawn_grace(), Duration::from_millis(200));
    }

    #[test]
    fn test_programs_follow_start_order() {
        let args = CommandArgs::try_parse_from([
            "geo-supervisor",
            "--calc-exe",
            "/opt/calc --fast",
            "--sim-exe",
            "/opt/sim",
        ])
        .unwrap();

        let programs = args.programs();
        let names: Vec<_> = programs.iter().map(|p| p.name).collect();
        assert_eq!(names, ProcessName::START_ORDER.to_vec());
        assert_eq!(programs[0].command.as_deref(), Some("/opt/calc --fast"));
        assert_eq!(programs[1].command, None);
        assert_eq!(programs[2].command.as_deref(), Some("/opt/sim"));
    }
}
