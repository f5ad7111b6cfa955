use crate::cli::CommandArgs;
use crate::services::{PidStore, Supervisor};
use std::path::PathBuf;
use std::sync::Arc;

/// 启动时构建一次，之后只读；跨请求的状态全部在 PID 文件里
pub struct AppStateInner {
    pub supervisor: Supervisor,
    pub log_path: PathBuf,
}

pub type AppState = Arc<AppStateInner>;

pub fn new_state(args: &CommandArgs) -> AppState {
    let store = PidStore::new(args.pid_file.clone());

    Arc::new(AppStateInner {
        supervisor: Supervisor::new(store, args.programs(), args.spawn_grace()),
        log_path: args.log_path.clone(),
    })
}
