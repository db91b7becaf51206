pub mod detector;
pub mod driver;
pub mod error;
mod ft;
pub mod id;
mod local;
pub mod master_spec;
pub mod message;
pub mod scheduler;
pub mod types;

pub use driver::{DriverHandle, DriverOptions, SchedulerDriver};
pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::Scheduler;
