//! Typed wire messages sent by the framework. Inbound traffic from the
//! master arrives as [crate::driver::SchedulerEvent] on the scheduler
//! actor's own mailbox; these enums cover the outbound directions.
//!
//! Messages that participate in reliable delivery carry their `ft_id`
//! and the pid of the original sender so the receiver can acknowledge
//! end to end with [MasterMessage::RelayAck].

use nexus_process::pid::Pid;

use crate::driver::SchedulerEvent;
use crate::id::{FrameworkId, FtId, OfferId, TaskId};
use crate::types::{ExecutorInfo, FrameworkMessage, Params, TaskDescription};

/// Messages addressed to a master.
#[derive(Debug, Clone)]
pub enum MasterMessage {
    RegisterFramework {
        framework: Pid<SchedulerEvent>,
        name: String,
        user: String,
        executor: ExecutorInfo,
    },
    ReregisterFramework {
        framework: Pid<SchedulerEvent>,
        framework_id: FrameworkId,
        name: String,
        user: String,
        executor: ExecutorInfo,
    },
    UnregisterFramework {
        framework_id: FrameworkId,
    },
    SlotOfferReply {
        framework_id: FrameworkId,
        offer_id: OfferId,
        tasks: Vec<TaskDescription>,
        params: Params,
    },
    FtSlotOfferReply {
        ft_id: FtId,
        origin: Pid<SchedulerEvent>,
        framework_id: FrameworkId,
        offer_id: OfferId,
        tasks: Vec<TaskDescription>,
        params: Params,
    },
    KillTask {
        framework_id: FrameworkId,
        task_id: TaskId,
    },
    ReviveOffers {
        framework_id: FrameworkId,
    },
    FrameworkMessage {
        framework_id: FrameworkId,
        message: FrameworkMessage,
    },
    FtFrameworkMessage {
        ft_id: FtId,
        origin: Pid<SchedulerEvent>,
        framework_id: FrameworkId,
        message: FrameworkMessage,
    },
    RelayAck {
        ft_id: FtId,
        sender: String,
    },
}

/// Messages addressed to a slave directly, bypassing the master.
#[derive(Debug, Clone)]
pub enum SlaveMessage {
    FrameworkMessage {
        framework_id: FrameworkId,
        message: FrameworkMessage,
    },
    /// Launch leg of the local single-node cluster; a real slave learns
    /// about tasks from its own master connection.
    RunTask {
        framework: Pid<SchedulerEvent>,
        framework_id: FrameworkId,
        task: TaskDescription,
    },
}
