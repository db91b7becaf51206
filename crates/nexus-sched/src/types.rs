use std::collections::HashMap;

use nexus_process::pid::Pid;

use crate::id::{SlaveId, TaskId};
use crate::message::SlaveMessage;

/// Free-form key/value configuration attached to offers, tasks, and
/// offer replies.
pub type Params = HashMap<String, String>;

/// How to obtain and start the framework's executor on a slave.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecutorInfo {
    pub uri: String,
    pub arg: Vec<u8>,
}

impl ExecutorInfo {
    pub fn new(uri: impl Into<String>, arg: impl Into<Vec<u8>>) -> Self {
        Self {
            uri: uri.into(),
            arg: arg.into(),
        }
    }
}

/// A time-bounded grant of resources on one slave, as presented to the
/// framework inside a slot offer.
#[derive(Debug, Clone)]
pub struct SlaveOffer {
    pub slave_id: SlaveId,
    pub slave_pid: Pid<SlaveMessage>,
    pub host: String,
    pub params: Params,
}

/// A task the framework wants to launch against an offer.
#[derive(Debug, Clone)]
pub struct TaskDescription {
    pub task_id: TaskId,
    pub slave_id: SlaveId,
    pub name: String,
    pub params: Params,
    pub arg: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Staging,
    Starting,
    Running,
    Finished,
    Failed,
    Killed,
    Lost,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            TaskState::Staging => "STAGING",
            TaskState::Starting => "STARTING",
            TaskState::Running => "RUNNING",
            TaskState::Finished => "FINISHED",
            TaskState::Failed => "FAILED",
            TaskState::Killed => "KILLED",
            TaskState::Lost => "LOST",
        };
        write!(f, "{value}")
    }
}

#[derive(Debug, Clone)]
pub struct TaskStatus {
    pub task_id: TaskId,
    pub state: TaskState,
    pub data: Vec<u8>,
}

impl TaskStatus {
    pub fn new(task_id: TaskId, state: TaskState, data: impl Into<Vec<u8>>) -> Self {
        Self {
            task_id,
            state,
            data: data.into(),
        }
    }
}

/// An opaque payload exchanged between the framework scheduler and one of
/// its running tasks.
#[derive(Debug, Clone)]
pub struct FrameworkMessage {
    pub slave_id: SlaveId,
    pub task_id: TaskId,
    pub data: Vec<u8>,
}

impl FrameworkMessage {
    pub fn new(slave_id: SlaveId, task_id: TaskId, data: impl Into<Vec<u8>>) -> Self {
        Self {
            slave_id,
            task_id,
            data: data.into(),
        }
    }
}
