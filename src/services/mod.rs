pub mod log_extractor;
pub mod pid_store;
pub mod process_checker;
pub mod supervisor;

pub use pid_store::PidStore;
pub use supervisor::Supervisor;
