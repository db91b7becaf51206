mod core;
mod handler;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nexus_process::pid::Pid;
use tokio::task::AbortHandle;

use crate::detector::MasterDetector;
use crate::ft::FtMessaging;
use crate::id::{FrameworkId, OfferId, SlaveId};
use crate::message::{MasterMessage, SlaveMessage};
use crate::scheduler::Scheduler;
use crate::types::ExecutorInfo;

pub(crate) struct SchedulerActorOptions {
    /// Mailbox address of the actor; doubles as the reliable-message id
    /// prefix and the ack sender identity.
    pub addr: String,
    pub user: String,
    pub fault_tolerant: bool,
    pub detector: Option<Box<dyn MasterDetector>>,
    pub scheduler: Arc<Mutex<Box<dyn Scheduler>>>,
    pub terminate: Arc<AtomicBool>,
    pub ft_tick: Duration,
    pub ft_attempt_budget: usize,
}

pub(crate) struct SchedulerActor {
    scheduler: Arc<Mutex<Box<dyn Scheduler>>>,
    user: String,
    fault_tolerant: bool,
    detector: Option<Box<dyn MasterDetector>>,
    /// Written once by the façade during stop; polled here between
    /// messages and on every tick.
    terminate: Arc<AtomicBool>,
    ft: FtMessaging,
    master: Option<Pid<MasterMessage>>,
    framework_id: Option<FrameworkId>,
    framework_name: String,
    executor: ExecutorInfo,
    /// Outstanding offers: the slave pids found in each offer, kept so a
    /// reply can be wired up without asking the master.
    offers: HashMap<OfferId, HashMap<SlaveId, Pid<SlaveMessage>>>,
    /// The slaves we launched tasks on, so framework messages can go to
    /// the slave directly, bypassing the master.
    slave_pids: HashMap<SlaveId, Pid<SlaveMessage>>,
    /// Death watch on the current master.
    link: Option<AbortHandle>,
}
