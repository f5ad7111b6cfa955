use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, Signal, System};

/// 只刷新指定 PID 的进程表视图
fn snapshot(pid: Pid) -> System {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys
}

/// 检查 PID 是否对应一个存活进程
///
/// 只比对 PID，不校验可执行文件；PID 被复用时会误报为运行中。
/// 僵尸进程视为已退出：本服务常驻，未回收的子进程不能算作运行中。
pub fn is_process_running(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }

    let sys_pid = Pid::from_u32(pid);
    let sys = snapshot(sys_pid);

    match sys.process(sys_pid) {
        Some(process) => !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead),
        None => false,
    }
}

/// 向进程发送 SIGTERM，返回信号是否送达
pub fn terminate_process(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }

    let sys_pid = Pid::from_u32(pid);
    let sys = snapshot(sys_pid);

    match sys.process(sys_pid) {
        Some(process) => match process.kill_with(Signal::Term) {
            Some(delivered) => delivered,
            None => {
                log::warn!("SIGTERM is not supported on this platform, falling back to kill");
                process.kill()
            }
        },
        None => {
            log::debug!("PID {} vanished before it could be signalled", pid);
            false
        }
    }
}
