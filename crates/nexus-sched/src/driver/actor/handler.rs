use std::sync::MutexGuard;

use log::{debug, info, warn};
use nexus_process::actor::{ActorAction, ActorContext};
use nexus_process::pid::Pid;

use crate::driver::actor::SchedulerActor;
use crate::driver::{DriverHandle, SchedulerEvent};
use crate::ft::GiveUp;
use crate::id::{FrameworkId, FtId, OfferId, SlaveId, TaskId};
use crate::message::{MasterMessage, SlaveMessage};
use crate::scheduler::Scheduler;
use crate::types::{
    FrameworkMessage, Params, SlaveOffer, TaskDescription, TaskState, TaskStatus,
};

impl SchedulerActor {
    pub(super) fn driver_handle(&self, ctx: &ActorContext<Self>) -> DriverHandle {
        DriverHandle::new(ctx.handle().clone(), self.terminate.clone())
    }

    pub(super) fn scheduler(&self) -> MutexGuard<'_, Box<dyn Scheduler>> {
        self.scheduler.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current_framework_id(&self) -> FrameworkId {
        self.framework_id.clone().unwrap_or_default()
    }

    pub(super) fn handle_new_master_detected(
        &mut self,
        ctx: &mut ActorContext<Self>,
        epoch: String,
        master: Pid<MasterMessage>,
    ) -> ActorAction {
        info!("new master at {master} with epoch {epoch}");
        // Offers minted by the previous master are worthless under the
        // new one; drop them before anything can reply against them.
        self.offers.clear();
        self.ft.set_master(master.clone());
        if let Some(link) = self.link.take() {
            link.abort();
        }
        let handle = ctx.handle().clone();
        let watched = master.clone();
        self.link = Some(ctx.spawn(async move {
            watched.closed().await;
            let _ = handle.send(SchedulerEvent::MasterExited {
                master: watched.addr().to_string(),
            });
        }));
        let framework = ctx.handle().pid();
        let message = match &self.framework_id {
            None => MasterMessage::RegisterFramework {
                framework,
                name: self.framework_name.clone(),
                user: self.user.clone(),
                executor: self.executor.clone(),
            },
            Some(framework_id) => MasterMessage::ReregisterFramework {
                framework,
                framework_id: framework_id.clone(),
                name: self.framework_name.clone(),
                user: self.user.clone(),
                executor: self.executor.clone(),
            },
        };
        if master.send(message).is_err() {
            warn!("master {master} went away before registration could be sent");
        }
        self.master = Some(master);
        ActorAction::Continue
    }

    pub(super) fn handle_no_master_detected(&mut self) -> ActorAction {
        warn!("no master currently detected; commands will queue against the last known master");
        ActorAction::Continue
    }

    pub(super) fn handle_registered(
        &mut self,
        ctx: &mut ActorContext<Self>,
        framework_id: FrameworkId,
    ) -> ActorAction {
        info!("registered as framework {framework_id}");
        self.framework_id = Some(framework_id.clone());
        let driver = self.driver_handle(ctx);
        self.scheduler().registered(&driver, &framework_id);
        ActorAction::Continue
    }

    pub(super) fn handle_slot_offer(
        &mut self,
        ctx: &mut ActorContext<Self>,
        offer_id: OfferId,
        offers: Vec<SlaveOffer>,
    ) -> ActorAction {
        debug!("slot offer {offer_id} covering {} slave(s)", offers.len());
        let entry = self.offers.entry(offer_id.clone()).or_default();
        for offer in &offers {
            entry.insert(offer.slave_id.clone(), offer.slave_pid.clone());
        }
        let driver = self.driver_handle(ctx);
        self.scheduler().resource_offer(&driver, &offer_id, &offers);
        ActorAction::Continue
    }

    pub(super) fn handle_rescind_offer(
        &mut self,
        ctx: &mut ActorContext<Self>,
        offer_id: OfferId,
    ) -> ActorAction {
        debug!("offer {offer_id} rescinded");
        self.offers.remove(&offer_id);
        let driver = self.driver_handle(ctx);
        self.scheduler().offer_rescinded(&driver, &offer_id);
        ActorAction::Continue
    }

    pub(super) fn handle_offer_reply(
        &mut self,
        ctx: &mut ActorContext<Self>,
        offer_id: OfferId,
        tasks: Vec<TaskDescription>,
        params: Params,
    ) -> ActorAction {
        // Launching a task against a slave the offer never named would
        // wire it to a dead address; reject such replies outright.
        let invalid = match self.offers.get(&offer_id) {
            None => Some(format!("reply to unknown offer {offer_id}")),
            Some(entry) => tasks
                .iter()
                .find(|task| !entry.contains_key(&task.slave_id))
                .map(|task| {
                    format!(
                        "task {} targets slave {} which is not part of offer {offer_id}",
                        task.task_id, task.slave_id
                    )
                }),
        };
        if let Some(message) = invalid {
            return self.report_error(ctx, -1, message);
        }
        let entry = self.offers.remove(&offer_id).unwrap_or_default();
        // Keep only the slave pids where we run tasks so we can send
        // framework messages directly.
        for task in &tasks {
            if let Some(slave_pid) = entry.get(&task.slave_id) {
                self.slave_pids
                    .insert(task.slave_id.clone(), slave_pid.clone());
            }
        }
        let framework_id = self.current_framework_id();
        if self.fault_tolerant {
            let ft_id = self.ft.next_id();
            debug!("sending slot offer reply reliably as {ft_id}");
            let task_ids = tasks.iter().map(|task| task.task_id.clone()).collect();
            self.ft.reliable_send(
                ft_id.clone(),
                MasterMessage::FtSlotOfferReply {
                    ft_id,
                    origin: ctx.handle().pid(),
                    framework_id,
                    offer_id,
                    tasks,
                    params,
                },
                GiveUp::MarkTasksLost(task_ids),
            );
        } else if let Some(master) = &self.master {
            let _ = master.send(MasterMessage::SlotOfferReply {
                framework_id,
                offer_id,
                tasks,
                params,
            });
        } else {
            warn!("dropping reply to offer {offer_id}: no master known");
        }
        ActorAction::Continue
    }

    pub(super) fn handle_send_framework_message(
        &mut self,
        message: FrameworkMessage,
    ) -> ActorAction {
        let Some(slave_pid) = self.slave_pids.get(&message.slave_id) else {
            warn!(
                "dropping framework message for slave {} with no known address",
                message.slave_id
            );
            return ActorAction::Continue;
        };
        let framework_id = self.current_framework_id();
        if slave_pid
            .send(SlaveMessage::FrameworkMessage {
                framework_id,
                message,
            })
            .is_err()
        {
            warn!("slave {slave_pid} is gone; framework message dropped");
        }
        ActorAction::Continue
    }

    pub(super) fn handle_ft_status_update(
        &mut self,
        ctx: &mut ActorContext<Self>,
        ft_id: FtId,
        origin: Pid<MasterMessage>,
        status: TaskStatus,
    ) -> ActorAction {
        if !self.ft.accept_message_ack(&ft_id, &origin) {
            return ActorAction::Continue;
        }
        debug!("received reliable status update {ft_id}");
        self.handle_status_update(ctx, status)
    }

    pub(super) fn handle_status_update(
        &mut self,
        ctx: &mut ActorContext<Self>,
        status: TaskStatus,
    ) -> ActorAction {
        let driver = self.driver_handle(ctx);
        self.scheduler().status_update(&driver, &status);
        ActorAction::Continue
    }

    pub(super) fn handle_ft_framework_message(
        &mut self,
        ctx: &mut ActorContext<Self>,
        ft_id: FtId,
        origin: Pid<MasterMessage>,
        message: FrameworkMessage,
    ) -> ActorAction {
        if !self.ft.accept_message_ack(&ft_id, &origin) {
            return ActorAction::Continue;
        }
        debug!("received reliable framework message {ft_id}");
        self.handle_framework_message(ctx, message)
    }

    pub(super) fn handle_framework_message(
        &mut self,
        ctx: &mut ActorContext<Self>,
        message: FrameworkMessage,
    ) -> ActorAction {
        let driver = self.driver_handle(ctx);
        self.scheduler().framework_message(&driver, &message);
        ActorAction::Continue
    }

    pub(super) fn handle_slave_lost(
        &mut self,
        ctx: &mut ActorContext<Self>,
        slave_id: SlaveId,
    ) -> ActorAction {
        info!("slave {slave_id} lost");
        self.slave_pids.remove(&slave_id);
        let driver = self.driver_handle(ctx);
        self.scheduler().slave_lost(&driver, &slave_id);
        ActorAction::Continue
    }

    pub(super) fn handle_error(
        &mut self,
        ctx: &mut ActorContext<Self>,
        code: i32,
        message: String,
    ) -> ActorAction {
        let driver = self.driver_handle(ctx);
        self.scheduler().error(&driver, code, &message);
        ActorAction::Continue
    }

    pub(super) fn handle_relay_ack(&mut self, ft_id: FtId, sender: String) -> ActorAction {
        debug!("relay ack for {ft_id} from {sender}");
        self.ft.got_ack(&ft_id);
        ActorAction::Continue
    }

    pub(super) fn handle_master_exited(
        &mut self,
        ctx: &mut ActorContext<Self>,
        master: String,
    ) -> ActorAction {
        if self.master.as_ref().map(|m| m.addr()) != Some(master.as_str()) {
            // A link notification for a master we already moved away from.
            return ActorAction::Continue;
        }
        if self.fault_tolerant {
            warn!("connection to master lost; waiting for a new master");
            ActorAction::Continue
        } else {
            self.report_error(ctx, -1, "Connection to master failed".to_string())
        }
    }

    pub(super) fn handle_kill_task(&mut self, task_id: TaskId) -> ActorAction {
        if let Some(master) = &self.master {
            let _ = master.send(MasterMessage::KillTask {
                framework_id: self.current_framework_id(),
                task_id,
            });
        } else {
            warn!("cannot kill task {task_id}: no master known");
        }
        ActorAction::Continue
    }

    pub(super) fn handle_revive_offers(&mut self) -> ActorAction {
        if let Some(master) = &self.master {
            let _ = master.send(MasterMessage::ReviveOffers {
                framework_id: self.current_framework_id(),
            });
        } else {
            warn!("cannot revive offers: no master known");
        }
        ActorAction::Continue
    }

    /// Run the reliable retransmission tick and surface every send that
    /// exhausted its attempts. A timed-out offer reply turns into one
    /// synthetic lost-task update per task, self-sent so it flows through
    /// the ordinary status update path.
    pub(super) fn run_reliable_tick(&mut self, ctx: &mut ActorContext<Self>) {
        for action in self.ft.send_outstanding() {
            match action {
                GiveUp::Ignore => {}
                GiveUp::MarkTasksLost(task_ids) => {
                    for task_id in task_ids {
                        debug!(
                            "presuming task {task_id} lost: offer reply was never acknowledged"
                        );
                        ctx.send(SchedulerEvent::StatusUpdate {
                            status: TaskStatus::new(task_id, TaskState::Lost, vec![]),
                        });
                    }
                }
            }
        }
    }

    pub(super) fn shut_down(&mut self) -> ActorAction {
        if let Some(master) = &self.master {
            let _ = master.send(MasterMessage::UnregisterFramework {
                framework_id: self.current_framework_id(),
            });
        }
        info!("scheduler driver terminating");
        ActorAction::Stop
    }

    fn report_error(
        &mut self,
        ctx: &mut ActorContext<Self>,
        code: i32,
        message: String,
    ) -> ActorAction {
        warn!("{message}");
        let driver = self.driver_handle(ctx);
        self.scheduler().error(&driver, code, &message);
        ActorAction::Continue
    }
}
