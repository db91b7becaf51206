//! End-to-end smoke test against the in-process single-node cluster
//! behind the `local` master address.

use std::time::Duration;

use nexus_sched::driver::{DriverOptions, SchedulerDriver};
use nexus_sched::id::{FrameworkId, OfferId, SlaveId, TaskId};
use nexus_sched::scheduler::Scheduler;
use nexus_sched::types::{
    FrameworkMessage, Params, SlaveOffer, TaskDescription, TaskState, TaskStatus,
};
use nexus_sched::DriverHandle;
use tokio::sync::mpsc;
use tokio::time::timeout;

#[derive(Debug)]
enum CallbackEvent {
    Registered(FrameworkId),
    Offer(OfferId, Vec<SlaveOffer>),
    Status(TaskStatus),
    Message(FrameworkMessage),
}

struct RecordingScheduler {
    events: mpsc::UnboundedSender<CallbackEvent>,
}

impl Scheduler for RecordingScheduler {
    fn framework_name(&mut self, _: &DriverHandle) -> String {
        "local-test".to_string()
    }

    fn registered(&mut self, _: &DriverHandle, framework_id: &FrameworkId) {
        let _ = self
            .events
            .send(CallbackEvent::Registered(framework_id.clone()));
    }

    fn resource_offer(&mut self, _: &DriverHandle, offer_id: &OfferId, offers: &[SlaveOffer]) {
        let _ = self
            .events
            .send(CallbackEvent::Offer(offer_id.clone(), offers.to_vec()));
    }

    fn offer_rescinded(&mut self, _: &DriverHandle, _: &OfferId) {}

    fn status_update(&mut self, _: &DriverHandle, status: &TaskStatus) {
        let _ = self.events.send(CallbackEvent::Status(status.clone()));
    }

    fn framework_message(&mut self, _: &DriverHandle, message: &FrameworkMessage) {
        let _ = self.events.send(CallbackEvent::Message(message.clone()));
    }

    fn slave_lost(&mut self, _: &DriverHandle, _: &SlaveId) {}
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<CallbackEvent>) -> CallbackEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a callback")
        .expect("callback channel closed")
}

#[tokio::test]
async fn test_local_cluster_lifecycle() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (tx, mut events) = mpsc::unbounded_channel();
    let mut options = DriverOptions::new("local");
    options.user = Some("alice".to_string());
    let driver =
        SchedulerDriver::with_options(Box::new(RecordingScheduler { events: tx }), options);
    driver.start().unwrap();

    let _framework_id = match recv(&mut events).await {
        CallbackEvent::Registered(framework_id) => framework_id,
        other => panic!("expected registration, got {other:?}"),
    };

    let (offer_id, slave_id) = match recv(&mut events).await {
        CallbackEvent::Offer(offer_id, offers) => {
            assert_eq!(offers.len(), 1);
            assert_eq!(offers[0].host, "localhost");
            assert!(offers[0].params.contains_key("cpus"));
            (offer_id, offers[0].slave_id.clone())
        }
        other => panic!("expected an offer, got {other:?}"),
    };

    driver
        .reply_to_offer(
            offer_id,
            vec![TaskDescription {
                task_id: "t_1".into(),
                slave_id: slave_id.clone(),
                name: "sleeper".to_string(),
                params: Params::new(),
                arg: Vec::new(),
            }],
            Params::new(),
        )
        .unwrap();
    match recv(&mut events).await {
        CallbackEvent::Status(status) => {
            assert_eq!(status.task_id, TaskId::from("t_1"));
            assert_eq!(status.state, TaskState::Running);
        }
        other => panic!("expected running update, got {other:?}"),
    }

    // The local slave echoes framework messages back to the framework.
    driver
        .send_framework_message(FrameworkMessage::new(
            slave_id,
            "t_1".into(),
            b"ping".to_vec(),
        ))
        .unwrap();
    match recv(&mut events).await {
        CallbackEvent::Message(message) => assert_eq!(message.data, b"ping"),
        other => panic!("expected echoed message, got {other:?}"),
    }

    driver.kill_task("t_1".into()).unwrap();
    match recv(&mut events).await {
        CallbackEvent::Status(status) => {
            assert_eq!(status.task_id, TaskId::from("t_1"));
            assert_eq!(status.state, TaskState::Killed);
        }
        other => panic!("expected killed update, got {other:?}"),
    }

    // With the previous offer consumed, reviving produces a fresh one.
    driver.revive_offers().unwrap();
    match recv(&mut events).await {
        CallbackEvent::Offer(_, offers) => assert_eq!(offers.len(), 1),
        other => panic!("expected a fresh offer, got {other:?}"),
    }

    driver.stop().unwrap();
    timeout(Duration::from_secs(1), driver.join())
        .await
        .expect("join should return after stop")
        .unwrap();
}
