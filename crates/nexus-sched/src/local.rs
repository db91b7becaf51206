//! An in-process single-node cluster backing the `local` and
//! `localquiet` master addresses: one master actor and one slave, just
//! enough protocol for a framework to register, take offers, launch
//! tasks, and exchange framework messages without a real cluster.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};
use nexus_process::actor::{Actor, ActorAction, ActorContext, ActorHandle};
use nexus_process::pid::{mailbox, Pid};

use crate::driver::SchedulerEvent;
use crate::id::{FrameworkId, FtId, OfferId, SlaveId, TaskId};
use crate::message::{MasterMessage, SlaveMessage};
use crate::types::{Params, SlaveOffer, TaskDescription, TaskState, TaskStatus};

static NEXT_CLUSTER_ID: AtomicU64 = AtomicU64::new(1);

const LOCAL_CPUS: &str = "1";
const LOCAL_MEM: &str = "1073741824";

pub(crate) struct LocalCluster {
    master: Pid<MasterMessage>,
    // Keeps the master actor addressable for the lifetime of the driver
    // run; the actor stops itself once its framework unregisters.
    _handle: ActorHandle<LocalMaster>,
}

impl LocalCluster {
    pub fn start(quiet: bool) -> Self {
        let id = NEXT_CLUSTER_ID.fetch_add(1, Ordering::Relaxed);
        let slave_id = SlaveId::from(format!("local-{id}"));
        let slave = spawn_local_slave(format!("local-slave-{id}"), quiet);
        let mut resources = Params::new();
        resources.insert("cpus".to_string(), LOCAL_CPUS.to_string());
        resources.insert("mem".to_string(), LOCAL_MEM.to_string());
        let handle = ActorHandle::<LocalMaster>::new(
            format!("local-master-{id}"),
            LocalMasterOptions {
                quiet,
                slave_id,
                slave,
                resources,
            },
        );
        Self {
            master: handle.pid(),
            _handle: handle,
        }
    }

    pub fn master(&self) -> Pid<MasterMessage> {
        self.master.clone()
    }
}

struct LocalMasterOptions {
    quiet: bool,
    slave_id: SlaveId,
    slave: Pid<SlaveMessage>,
    resources: Params,
}

struct LocalMaster {
    quiet: bool,
    slave_id: SlaveId,
    slave: Pid<SlaveMessage>,
    resources: Params,
    framework: Option<(FrameworkId, Pid<SchedulerEvent>)>,
    /// Whether any framework has ever registered; once the last one
    /// unregisters the cluster winds down.
    served: bool,
    running_tasks: HashSet<TaskId>,
    outstanding: Option<OfferId>,
    next_framework: u64,
    next_offer: u64,
}

impl LocalMaster {
    fn announce(&self, message: &str) {
        if self.quiet {
            debug!("{message}");
        } else {
            info!("{message}");
        }
    }

    fn offer(&mut self) {
        if self.outstanding.is_some() {
            return;
        }
        let Some((_, framework)) = self.framework.clone() else {
            return;
        };
        let offer_id = OfferId::from(format!("o-{}", self.next_offer));
        self.next_offer += 1;
        self.announce(&format!(
            "offering slave {} to framework as {offer_id}",
            self.slave_id
        ));
        self.outstanding = Some(offer_id.clone());
        let _ = framework.send(SchedulerEvent::SlotOffer {
            offer_id,
            offers: vec![SlaveOffer {
                slave_id: self.slave_id.clone(),
                slave_pid: self.slave.clone(),
                host: "localhost".to_string(),
                params: self.resources.clone(),
            }],
        });
    }

    fn accept_reply(
        &mut self,
        framework_id: FrameworkId,
        offer_id: OfferId,
        tasks: Vec<TaskDescription>,
    ) {
        let Some((current_id, framework)) = self.framework.clone() else {
            warn!("reply from unregistered framework {framework_id}");
            return;
        };
        if current_id != framework_id {
            warn!("reply from unknown framework {framework_id}");
            return;
        }
        if self.outstanding.as_ref() == Some(&offer_id) {
            self.outstanding = None;
        }
        for task in tasks {
            self.announce(&format!("launching task {} on {}", task.task_id, self.slave_id));
            self.running_tasks.insert(task.task_id.clone());
            let status =
                TaskStatus::new(task.task_id.clone(), TaskState::Running, vec![]);
            let _ = self.slave.send(SlaveMessage::RunTask {
                framework: framework.clone(),
                framework_id: framework_id.clone(),
                task,
            });
            let _ = framework.send(SchedulerEvent::StatusUpdate { status });
        }
    }

    fn relay_ack(&self, ctx: &ActorContext<Self>, ft_id: FtId, origin: &Pid<SchedulerEvent>) {
        let _ = origin.send(SchedulerEvent::RelayAck {
            ft_id,
            sender: ctx.handle().name().to_string(),
        });
    }
}

impl Actor for LocalMaster {
    type Message = MasterMessage;
    type Options = LocalMasterOptions;

    fn new(options: LocalMasterOptions) -> Self {
        Self {
            quiet: options.quiet,
            slave_id: options.slave_id,
            slave: options.slave,
            resources: options.resources,
            framework: None,
            served: false,
            running_tasks: HashSet::new(),
            outstanding: None,
            next_framework: 1,
            next_offer: 1,
        }
    }

    fn start(&mut self, _ctx: &mut ActorContext<Self>) {
        self.announce("local cluster master started");
    }

    fn receive(&mut self, ctx: &mut ActorContext<Self>, message: MasterMessage) -> ActorAction {
        match message {
            MasterMessage::RegisterFramework { framework, name, user, .. } => {
                let framework_id = FrameworkId::from(format!("f-{}", self.next_framework));
                self.next_framework += 1;
                self.announce(&format!(
                    "registering framework {name} for {user} as {framework_id}"
                ));
                self.framework = Some((framework_id.clone(), framework.clone()));
                self.served = true;
                self.outstanding = None;
                let _ = framework.send(SchedulerEvent::Registered { framework_id });
                self.offer();
            }
            MasterMessage::ReregisterFramework { framework, framework_id, .. } => {
                self.announce(&format!("framework {framework_id} reregistered"));
                self.framework = Some((framework_id, framework));
                self.served = true;
                self.offer();
            }
            MasterMessage::UnregisterFramework { framework_id } => {
                self.announce(&format!("framework {framework_id} unregistered"));
                self.framework = None;
                if self.served {
                    self.announce("local cluster master shutting down");
                    return ActorAction::Stop;
                }
            }
            MasterMessage::SlotOfferReply { framework_id, offer_id, tasks, .. } => {
                self.accept_reply(framework_id, offer_id, tasks);
            }
            MasterMessage::FtSlotOfferReply {
                ft_id,
                origin,
                framework_id,
                offer_id,
                tasks,
                ..
            } => {
                self.relay_ack(ctx, ft_id, &origin);
                self.accept_reply(framework_id, offer_id, tasks);
            }
            MasterMessage::KillTask { task_id, .. } => {
                if self.running_tasks.remove(&task_id) {
                    self.announce(&format!("killing task {task_id}"));
                    if let Some((_, framework)) = &self.framework {
                        let _ = framework.send(SchedulerEvent::StatusUpdate {
                            status: TaskStatus::new(task_id, TaskState::Killed, vec![]),
                        });
                    }
                } else {
                    warn!("asked to kill unknown task {task_id}");
                }
            }
            MasterMessage::ReviveOffers { .. } => {
                self.offer();
            }
            MasterMessage::FrameworkMessage { framework_id, message } => {
                let _ = self.slave.send(SlaveMessage::FrameworkMessage {
                    framework_id,
                    message,
                });
            }
            MasterMessage::FtFrameworkMessage { ft_id, origin, framework_id, message } => {
                self.relay_ack(ctx, ft_id, &origin);
                let _ = self.slave.send(SlaveMessage::FrameworkMessage {
                    framework_id,
                    message,
                });
            }
            MasterMessage::RelayAck { ft_id, .. } => {
                debug!("local master ignoring relay ack {ft_id}");
            }
        }
        ActorAction::Continue
    }

    fn stop(self) {
        self.announce("local cluster master stopped");
    }
}

/// The slave half of the local cluster: accepts task launches and echoes
/// framework messages back to their framework, so the direct
/// framework-to-slave path has observable behavior in local mode.
fn spawn_local_slave(addr: String, quiet: bool) -> Pid<SlaveMessage> {
    let (pid, mut receiver) = mailbox::<SlaveMessage>(addr);
    tokio::spawn(async move {
        let mut frameworks: HashMap<FrameworkId, Pid<SchedulerEvent>> = HashMap::new();
        while let Some(message) = receiver.recv().await {
            match message {
                SlaveMessage::RunTask { framework, framework_id, task } => {
                    if quiet {
                        debug!("local slave running task {}", task.task_id);
                    } else {
                        info!("local slave running task {}", task.task_id);
                    }
                    frameworks.insert(framework_id, framework);
                }
                SlaveMessage::FrameworkMessage { framework_id, message } => {
                    match frameworks.get(&framework_id) {
                        Some(framework) => {
                            let _ = framework
                                .send(SchedulerEvent::FrameworkMessage { message });
                        }
                        None => {
                            warn!(
                                "local slave dropping message for unknown framework {framework_id}"
                            );
                        }
                    }
                }
            }
        }
    });
    pid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_master_registers_and_offers() {
        let cluster = LocalCluster::start(true);
        let (framework, mut rx) = mailbox::<SchedulerEvent>("fw");
        cluster
            .master()
            .send(MasterMessage::RegisterFramework {
                framework,
                name: "fw".to_string(),
                user: "alice".to_string(),
                executor: Default::default(),
            })
            .unwrap();

        let framework_id = match rx.recv().await {
            Some(SchedulerEvent::Registered { framework_id }) => framework_id,
            other => panic!("expected registration, got {other:?}"),
        };
        let (offer_id, offers) = match rx.recv().await {
            Some(SchedulerEvent::SlotOffer { offer_id, offers }) => (offer_id, offers),
            other => panic!("expected slot offer, got {other:?}"),
        };
        assert_eq!(offers.len(), 1);

        // Launch a task against the offer and watch it start running.
        cluster
            .master()
            .send(MasterMessage::SlotOfferReply {
                framework_id: framework_id.clone(),
                offer_id,
                tasks: vec![TaskDescription {
                    task_id: "t_1".into(),
                    slave_id: offers[0].slave_id.clone(),
                    name: "task".to_string(),
                    params: Params::new(),
                    arg: vec![],
                }],
                params: Params::new(),
            })
            .unwrap();
        match rx.recv().await {
            Some(SchedulerEvent::StatusUpdate { status }) => {
                assert_eq!(status.task_id, TaskId::from("t_1"));
                assert_eq!(status.state, TaskState::Running);
            }
            other => panic!("expected status update, got {other:?}"),
        }

        // The cluster winds down when its framework leaves.
        let master = cluster.master();
        master
            .send(MasterMessage::UnregisterFramework { framework_id })
            .unwrap();
        master.closed().await;
    }
}
