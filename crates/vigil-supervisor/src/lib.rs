pub mod error;
pub mod monitor;
pub mod task_type;

pub use error::SupervisorError;
pub use monitor::{HealthMonitor, HealthMonitorConfig, MonitoredResult, Notifier};
pub use task_type::{detect_task_type, TaskType};
