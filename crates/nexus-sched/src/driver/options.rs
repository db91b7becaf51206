use std::time::Duration;

use nexus_process::pid::Directory;

use crate::detector::MasterDetector;
use crate::message::MasterMessage;

pub struct DriverOptions {
    /// Master address string; see [crate::master_spec::MasterSpec] for
    /// the accepted forms.
    pub master: String,
    /// Resolver for direct master addresses.
    pub directory: Directory<MasterMessage>,
    /// Election watcher for fault-tolerant mode. Required when `master`
    /// is a coordination-service address; rejected otherwise.
    pub detector: Option<Box<dyn MasterDetector>>,
    /// Identity reported to the master at registration; defaults to the
    /// process owner.
    pub user: Option<String>,
    /// Retransmission interval of the reliable messaging layer; also
    /// bounds how long a stop request can go unobserved.
    pub ft_tick: Duration,
    /// Delivery attempts per reliable send before giving up.
    pub ft_attempt_budget: usize,
}

impl DriverOptions {
    pub fn new(master: impl Into<String>) -> Self {
        Self {
            master: master.into(),
            directory: Directory::new(),
            detector: None,
            user: None,
            ft_tick: Duration::from_secs(1),
            ft_attempt_budget: 10,
        }
    }
}
