use std::sync::atomic::Ordering;
use std::time::Duration;

use log::info;
use nexus_process::actor::{Actor, ActorAction, ActorContext};

use crate::detector::MasterDetection;
use crate::driver::actor::{SchedulerActor, SchedulerActorOptions};
use crate::driver::SchedulerEvent;
use crate::ft::FtMessaging;
use crate::types::ExecutorInfo;

impl Actor for SchedulerActor {
    type Message = SchedulerEvent;
    type Options = SchedulerActorOptions;

    fn new(options: SchedulerActorOptions) -> Self {
        let ft = FtMessaging::new(
            options.addr,
            options.ft_tick,
            options.ft_attempt_budget,
        );
        Self {
            scheduler: options.scheduler,
            user: options.user,
            fault_tolerant: options.fault_tolerant,
            detector: options.detector,
            terminate: options.terminate,
            ft,
            master: None,
            framework_id: None,
            framework_name: String::new(),
            executor: ExecutorInfo::default(),
            offers: Default::default(),
            slave_pids: Default::default(),
            link: None,
        }
    }

    fn start(&mut self, ctx: &mut ActorContext<Self>) {
        let driver = self.driver_handle(ctx);
        let (name, executor) = {
            let mut scheduler = self.scheduler();
            (
                scheduler.framework_name(&driver),
                scheduler.executor_info(&driver),
            )
        };
        self.framework_name = name;
        self.executor = executor;
        // Both the fault-tolerant and the direct startup paths feed the
        // event loop through a detector; in direct mode it is a static
        // one that emits the configured master immediately.
        if let Some(detector) = self.detector.take() {
            let handle = ctx.handle().clone();
            let mut events = detector.watch();
            ctx.spawn(async move {
                while let Some(detection) = events.recv().await {
                    let event = match detection {
                        MasterDetection::NewMaster { epoch, master } => {
                            SchedulerEvent::NewMasterDetected { epoch, master }
                        }
                        MasterDetection::NoMaster => SchedulerEvent::NoMasterDetected,
                    };
                    if handle.send(event).is_err() {
                        break;
                    }
                }
            });
        }
    }

    fn receive(
        &mut self,
        ctx: &mut ActorContext<Self>,
        message: SchedulerEvent,
    ) -> ActorAction {
        // The acquire load pairs with the release store in the façade's
        // stop; checking between messages keeps shutdown bounded even
        // when the mailbox never runs dry.
        if self.terminate.load(Ordering::Acquire) {
            return self.shut_down();
        }
        match message {
            SchedulerEvent::NewMasterDetected { epoch, master } => {
                self.handle_new_master_detected(ctx, epoch, master)
            }
            SchedulerEvent::NoMasterDetected => self.handle_no_master_detected(),
            SchedulerEvent::Registered { framework_id } => {
                self.handle_registered(ctx, framework_id)
            }
            SchedulerEvent::SlotOffer { offer_id, offers } => {
                self.handle_slot_offer(ctx, offer_id, offers)
            }
            SchedulerEvent::RescindOffer { offer_id } => {
                self.handle_rescind_offer(ctx, offer_id)
            }
            SchedulerEvent::StatusUpdate { status } => {
                self.handle_status_update(ctx, status)
            }
            SchedulerEvent::FtStatusUpdate {
                ft_id,
                origin,
                status,
            } => self.handle_ft_status_update(ctx, ft_id, origin, status),
            SchedulerEvent::FrameworkMessage { message } => {
                self.handle_framework_message(ctx, message)
            }
            SchedulerEvent::FtFrameworkMessage {
                ft_id,
                origin,
                message,
            } => self.handle_ft_framework_message(ctx, ft_id, origin, message),
            SchedulerEvent::SlaveLost { slave_id } => {
                self.handle_slave_lost(ctx, slave_id)
            }
            SchedulerEvent::Error { code, message } => {
                self.handle_error(ctx, code, message)
            }
            SchedulerEvent::RelayAck { ft_id, sender } => {
                self.handle_relay_ack(ft_id, sender)
            }
            SchedulerEvent::MasterExited { master } => {
                self.handle_master_exited(ctx, master)
            }
            SchedulerEvent::OfferReply {
                offer_id,
                tasks,
                params,
            } => self.handle_offer_reply(ctx, offer_id, tasks, params),
            SchedulerEvent::SendFrameworkMessage { message } => {
                self.handle_send_framework_message(message)
            }
            SchedulerEvent::KillTask { task_id } => self.handle_kill_task(task_id),
            SchedulerEvent::ReviveOffers => self.handle_revive_offers(),
            SchedulerEvent::Stop => self.shut_down(),
        }
    }

    fn tick(&mut self, ctx: &mut ActorContext<Self>) -> ActorAction {
        if self.terminate.load(Ordering::Acquire) {
            return self.shut_down();
        }
        self.run_reliable_tick(ctx);
        ActorAction::Continue
    }

    fn tick_interval(&self) -> Option<Duration> {
        Some(self.ft.tick())
    }

    fn stop(self) {
        info!("scheduler event loop stopped");
    }
}
