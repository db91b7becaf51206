//! Master detection. The coordination-service client itself lives
//! outside this crate; a detector is anything that can produce a stream
//! of [MasterDetection] events for the scheduler to follow.

use nexus_process::pid::Pid;
use tokio::sync::mpsc;

use crate::message::MasterMessage;

#[derive(Debug, Clone)]
pub enum MasterDetection {
    NewMaster {
        /// Increases across master incarnations; produced by the
        /// coordination service (or synthesized as `"0"` in direct mode).
        epoch: String,
        master: Pid<MasterMessage>,
    },
    NoMaster,
}

pub trait MasterDetector: Send + 'static {
    /// Consume the detector and return its event stream. The stream ends
    /// when the detector shuts down.
    fn watch(self: Box<Self>) -> mpsc::UnboundedReceiver<MasterDetection>;
}

/// A detector for a fixed master: emits a single `NewMaster` event and
/// then stays silent. This is how the direct-address and local-cluster
/// startup paths are unified with the fault-tolerant one.
pub struct StaticMasterDetector {
    master: Pid<MasterMessage>,
}

impl StaticMasterDetector {
    pub fn new(master: Pid<MasterMessage>) -> Self {
        Self { master }
    }
}

impl MasterDetector for StaticMasterDetector {
    fn watch(self: Box<Self>) -> mpsc::UnboundedReceiver<MasterDetection> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(MasterDetection::NewMaster {
            epoch: "0".to_string(),
            master: self.master,
        });
        rx
    }
}

/// Adapter for an external election watcher: the coordination-service
/// client pushes events into the sender half and the driver follows the
/// receiver half.
pub struct ChannelMasterDetector {
    receiver: mpsc::UnboundedReceiver<MasterDetection>,
}

impl ChannelMasterDetector {
    pub fn channel() -> (mpsc::UnboundedSender<MasterDetection>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { receiver: rx })
    }
}

impl MasterDetector for ChannelMasterDetector {
    fn watch(self: Box<Self>) -> mpsc::UnboundedReceiver<MasterDetection> {
        self.receiver
    }
}

#[cfg(test)]
mod tests {
    use nexus_process::pid::mailbox;

    use super::*;

    #[tokio::test]
    async fn test_static_detector_emits_one_master() {
        let (master, _rx) = mailbox::<MasterMessage>("master");
        let detector = Box::new(StaticMasterDetector::new(master));
        let mut events = detector.watch();
        match events.recv().await {
            Some(MasterDetection::NewMaster { epoch, master }) => {
                assert_eq!(epoch, "0");
                assert_eq!(master.addr(), "master");
            }
            other => panic!("unexpected detection: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_channel_detector_forwards_events() {
        let (tx, detector) = ChannelMasterDetector::channel();
        let mut events = Box::new(detector).watch();
        let (master, _rx) = mailbox::<MasterMessage>("m1");
        tx.send(MasterDetection::NewMaster {
            epoch: "e1".to_string(),
            master,
        })
        .unwrap();
        tx.send(MasterDetection::NoMaster).unwrap();
        assert!(matches!(
            events.recv().await,
            Some(MasterDetection::NewMaster { .. })
        ));
        assert!(matches!(events.recv().await, Some(MasterDetection::NoMaster)));
    }
}
