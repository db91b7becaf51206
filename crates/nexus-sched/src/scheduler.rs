use log::error;

use crate::driver::DriverHandle;
use crate::id::{FrameworkId, OfferId, SlaveId};
use crate::types::{ExecutorInfo, FrameworkMessage, SlaveOffer, TaskStatus};

/// Callbacks through which the driver reports framework events. All
/// methods are invoked from the driver's internal event loop, one at a
/// time and in arrival order; blocking inside a callback stalls every
/// further event. The `driver` handle may be used re-entrantly, e.g. to
/// reply to an offer from within [Scheduler::resource_offer].
pub trait Scheduler: Send + 'static {
    /// The framework name reported to the master at registration.
    fn framework_name(&mut self, _driver: &DriverHandle) -> String {
        "Unnamed Framework".to_string()
    }

    /// The executor the master should associate with this framework.
    fn executor_info(&mut self, _driver: &DriverHandle) -> ExecutorInfo {
        ExecutorInfo::default()
    }

    fn registered(&mut self, driver: &DriverHandle, framework_id: &FrameworkId);

    fn resource_offer(
        &mut self,
        driver: &DriverHandle,
        offer_id: &OfferId,
        offers: &[SlaveOffer],
    );

    fn offer_rescinded(&mut self, driver: &DriverHandle, offer_id: &OfferId);

    fn status_update(&mut self, driver: &DriverHandle, status: &TaskStatus);

    fn framework_message(&mut self, driver: &DriverHandle, message: &FrameworkMessage);

    fn slave_lost(&mut self, driver: &DriverHandle, slave_id: &SlaveId);

    /// Default: log the failure and stop the driver.
    fn error(&mut self, driver: &DriverHandle, code: i32, message: &str) {
        error!("scheduler error: {message} (error code: {code})");
        driver.stop();
    }
}
