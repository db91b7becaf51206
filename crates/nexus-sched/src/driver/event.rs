use nexus_process::pid::Pid;

use crate::id::{FrameworkId, FtId, OfferId, SlaveId, TaskId};
use crate::message::MasterMessage;
use crate::types::{FrameworkMessage, Params, SlaveOffer, TaskDescription, TaskStatus};

/// Everything the scheduler actor can observe: wire messages from the
/// master, master-detection events, and commands self-sent on behalf of
/// the driver façade. Funneling all of them through one mailbox is what
/// serializes the framework-side state.
#[derive(Debug)]
pub enum SchedulerEvent {
    NewMasterDetected {
        epoch: String,
        master: Pid<MasterMessage>,
    },
    NoMasterDetected,
    Registered {
        framework_id: FrameworkId,
    },
    SlotOffer {
        offer_id: OfferId,
        offers: Vec<SlaveOffer>,
    },
    RescindOffer {
        offer_id: OfferId,
    },
    StatusUpdate {
        status: TaskStatus,
    },
    FtStatusUpdate {
        ft_id: FtId,
        origin: Pid<MasterMessage>,
        status: TaskStatus,
    },
    FrameworkMessage {
        message: FrameworkMessage,
    },
    FtFrameworkMessage {
        ft_id: FtId,
        origin: Pid<MasterMessage>,
        message: FrameworkMessage,
    },
    SlaveLost {
        slave_id: SlaveId,
    },
    Error {
        code: i32,
        message: String,
    },
    RelayAck {
        ft_id: FtId,
        sender: String,
    },
    /// The link to the named master broke.
    MasterExited {
        master: String,
    },
    /// Self-sent by [crate::driver::DriverHandle::reply_to_offer]; the
    /// wire send happens on the actor so the offer cache is consulted
    /// race-free.
    OfferReply {
        offer_id: OfferId,
        tasks: Vec<TaskDescription>,
        params: Params,
    },
    /// Self-sent; the actor forwards directly to the slave.
    SendFrameworkMessage {
        message: FrameworkMessage,
    },
    KillTask {
        task_id: TaskId,
    },
    ReviveOffers,
    Stop,
}
