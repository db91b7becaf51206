mod actor;
mod event;
mod options;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use nexus_process::actor::ActorHandle;

use crate::detector::{MasterDetector, StaticMasterDetector};
use crate::error::{SchedulerError, SchedulerResult};
use crate::id::{OfferId, TaskId};
use crate::local::LocalCluster;
use crate::master_spec::MasterSpec;
use crate::scheduler::Scheduler;
use crate::types::{FrameworkMessage, Params, TaskDescription};

use actor::{SchedulerActor, SchedulerActorOptions};
pub use event::SchedulerEvent;
pub use options::DriverOptions;

static NEXT_DRIVER_ID: AtomicU64 = AtomicU64::new(1);

/// The command surface handed to [Scheduler] callbacks. Cloneable and
/// lock-free: every method either enqueues an event onto the scheduler
/// actor or flips the termination flag, so it is safe to call from
/// inside a callback without risking deadlock.
#[derive(Clone)]
pub struct DriverHandle {
    handle: ActorHandle<SchedulerActor>,
    terminate: Arc<AtomicBool>,
}

impl DriverHandle {
    pub(crate) fn new(handle: ActorHandle<SchedulerActor>, terminate: Arc<AtomicBool>) -> Self {
        Self { handle, terminate }
    }

    pub fn kill_task(&self, task_id: TaskId) -> SchedulerResult<()> {
        self.send(SchedulerEvent::KillTask { task_id })
    }

    /// Launch tasks against an outstanding offer. The reply is composed
    /// on the scheduler's event loop, where the offer cache lives.
    pub fn reply_to_offer(
        &self,
        offer_id: OfferId,
        tasks: Vec<TaskDescription>,
        params: Params,
    ) -> SchedulerResult<()> {
        self.send(SchedulerEvent::OfferReply {
            offer_id,
            tasks,
            params,
        })
    }

    pub fn revive_offers(&self) -> SchedulerResult<()> {
        self.send(SchedulerEvent::ReviveOffers)
    }

    /// Deliver a payload to one of the framework's tasks; it goes to the
    /// slave directly, bypassing the master.
    pub fn send_framework_message(&self, message: FrameworkMessage) -> SchedulerResult<()> {
        self.send(SchedulerEvent::SendFrameworkMessage { message })
    }

    /// Ask the driver to unregister and terminate. The event loop
    /// observes the request within one reliable-messaging tick even if
    /// the stop event itself is stuck behind a backlog.
    pub fn stop(&self) {
        self.terminate.store(true, Ordering::Release);
        let _ = self.handle.send(SchedulerEvent::Stop);
    }

    fn send(&self, event: SchedulerEvent) -> SchedulerResult<()> {
        self.handle
            .send(event)
            .map_err(|_| SchedulerError::NotRunning)
    }
}

struct Inner {
    scheduler: Arc<Mutex<Box<dyn Scheduler>>>,
    options: DriverOptions,
    handle: Option<ActorHandle<SchedulerActor>>,
    driver: Option<DriverHandle>,
    local: Option<LocalCluster>,
    running: bool,
}

/// The embeddable framework-side driver: locates the master, registers
/// the framework, and shuttles offers, task launches, status updates,
/// and framework messages between the master and the user-supplied
/// [Scheduler].
pub struct SchedulerDriver {
    inner: Mutex<Inner>,
}

impl SchedulerDriver {
    pub fn new(scheduler: Box<dyn Scheduler>, master: impl Into<String>) -> Self {
        Self::with_options(scheduler, DriverOptions::new(master))
    }

    pub fn with_options(scheduler: Box<dyn Scheduler>, options: DriverOptions) -> Self {
        Self {
            inner: Mutex::new(Inner {
                scheduler: Arc::new(Mutex::new(scheduler)),
                options,
                handle: None,
                driver: None,
                local: None,
                running: false,
            }),
        }
    }

    /// Resolve the master, spawn the scheduler event loop, and begin
    /// registration. Configuration problems (an unparseable or
    /// unresolvable master address, fault-tolerant mode without a
    /// detector, an undeterminable user identity) are reported here,
    /// synchronously.
    pub fn start(&self) -> SchedulerResult<()> {
        let mut inner = self.lock();
        if inner.running {
            return Err(SchedulerError::AlreadyRunning);
        }
        let spec = MasterSpec::parse(&inner.options.master)?;
        let user = match &inner.options.user {
            Some(user) => user.clone(),
            None => resolve_user()?,
        };
        let fault_tolerant = spec.is_fault_tolerant();
        let mut local = None;
        let detector = match spec {
            MasterSpec::Zoo { .. } => {
                inner.options.detector.take().ok_or_else(|| {
                    SchedulerError::InvalidArgument(
                        "fault-tolerant mode requires a master detector".to_string(),
                    )
                })?
            }
            MasterSpec::Direct { addr } => {
                if inner.options.detector.is_some() {
                    return Err(SchedulerError::InvalidArgument(
                        "a master detector can only be used with a coordination-service address"
                            .to_string(),
                    ));
                }
                let master = inner.options.directory.lookup(&addr).ok_or_else(|| {
                    SchedulerError::InvalidMasterAddress(format!(
                        "failed to resolve master {addr}"
                    ))
                })?;
                Box::new(StaticMasterDetector::new(master)) as Box<dyn MasterDetector>
            }
            MasterSpec::Local { quiet } => {
                let cluster = LocalCluster::start(quiet);
                let master = cluster.master();
                local = Some(cluster);
                Box::new(StaticMasterDetector::new(master)) as Box<dyn MasterDetector>
            }
        };
        let addr = format!("sched-{}", NEXT_DRIVER_ID.fetch_add(1, Ordering::Relaxed));
        let terminate = Arc::new(AtomicBool::new(false));
        let handle = ActorHandle::<SchedulerActor>::new(
            addr.clone(),
            SchedulerActorOptions {
                addr,
                user,
                fault_tolerant,
                detector: Some(detector),
                scheduler: inner.scheduler.clone(),
                terminate: terminate.clone(),
                ft_tick: inner.options.ft_tick,
                ft_attempt_budget: inner.options.ft_attempt_budget,
            },
        );
        inner.driver = Some(DriverHandle::new(handle.clone(), terminate));
        inner.handle = Some(handle);
        inner.local = local;
        inner.running = true;
        Ok(())
    }

    /// Unregister from the master and terminate the event loop. A second
    /// stop is a no-op.
    pub fn stop(&self) -> SchedulerResult<()> {
        let mut inner = self.lock();
        if !inner.running {
            return Ok(());
        }
        if let Some(driver) = &inner.driver {
            driver.stop();
        }
        inner.running = false;
        Ok(())
    }

    /// Wait until the driver has terminated. Calling this from inside a
    /// [Scheduler] callback deadlocks by construction, since the event
    /// loop being waited on is the one running the callback.
    pub async fn join(&self) -> SchedulerResult<()> {
        let handle = { self.lock().handle.clone() };
        let Some(handle) = handle else {
            return Ok(());
        };
        handle.wait_for_stop().await;
        self.lock().running = false;
        Ok(())
    }

    pub async fn run(&self) -> SchedulerResult<()> {
        self.start()?;
        self.join().await
    }

    pub fn kill_task(&self, task_id: TaskId) -> SchedulerResult<()> {
        self.command()?.kill_task(task_id)
    }

    pub fn reply_to_offer(
        &self,
        offer_id: OfferId,
        tasks: Vec<TaskDescription>,
        params: Params,
    ) -> SchedulerResult<()> {
        self.command()?.reply_to_offer(offer_id, tasks, params)
    }

    pub fn revive_offers(&self) -> SchedulerResult<()> {
        self.command()?.revive_offers()
    }

    pub fn send_framework_message(&self, message: FrameworkMessage) -> SchedulerResult<()> {
        self.command()?.send_framework_message(message)
    }

    fn command(&self) -> SchedulerResult<DriverHandle> {
        let inner = self.lock();
        if !inner.running {
            return Err(SchedulerError::NotRunning);
        }
        inner.driver.clone().ok_or(SchedulerError::NotRunning)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The identity reported to the master; the effective process owner
/// unless the driver options override it.
fn resolve_user() -> SchedulerResult<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .ok()
        .filter(|user| !user.is_empty())
        .ok_or_else(|| {
            SchedulerError::InternalError(
                "failed to determine the current user".to_string(),
            )
        })
}
