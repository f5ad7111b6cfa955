pub mod geo;
pub mod process;

pub use geo::{DeviceLocation, GeoRecord, LogReport, Tower};
pub use process::{
    ManagedProgram, ProcessName, ProcessState, RunState, StartOutcome, StartStatus, StopOutcome,
    StopStatus, SupervisorReport,
};
