//! Reliable messaging between the framework and the master: outgoing
//! messages are retransmitted on a periodic tick until acknowledged,
//! and incoming reliable messages are deduplicated by `(id, origin)`
//! while the acknowledgement is re-emitted for every copy seen.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use log::{debug, warn};
use nexus_process::pid::Pid;
use tokio::time::Instant;

use crate::id::{FtId, TaskId};
use crate::message::MasterMessage;

/// Upper bound on remembered inbound message ids; age-based trimming is
/// the primary mechanism and this is a backstop for pathological peers.
const RECENT_CAP: usize = 16384;

/// The domain fallback to run when a reliable send exhausts its attempts.
#[derive(Debug)]
pub(crate) enum GiveUp {
    Ignore,
    /// The send was a slot-offer reply; without an acknowledgement the
    /// named tasks must be presumed lost.
    MarkTasksLost(Vec<TaskId>),
}

struct PendingSend {
    message: MasterMessage,
    deadline: Instant,
    attempts: usize,
    on_give_up: GiveUp,
}

type DedupeKey = (FtId, String);

pub(crate) struct FtMessaging {
    /// Address of the owning scheduler; used as the id prefix and as the
    /// `sender` field of outgoing acknowledgements.
    origin: String,
    tick: Duration,
    attempt_budget: usize,
    master: Option<Pid<MasterMessage>>,
    next_seq: u64,
    pending: HashMap<FtId, PendingSend>,
    seen: HashSet<DedupeKey>,
    recent: VecDeque<(DedupeKey, Instant)>,
}

impl FtMessaging {
    pub fn new(origin: impl Into<String>, tick: Duration, attempt_budget: usize) -> Self {
        Self {
            origin: origin.into(),
            tick,
            attempt_budget,
            master: None,
            next_seq: 0,
            pending: HashMap::new(),
            seen: HashSet::new(),
            recent: VecDeque::new(),
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Point every pending and future send at a new master. Entries that
    /// are already in flight are retransmitted to the new destination on
    /// the next tick.
    pub fn set_master(&mut self, master: Pid<MasterMessage>) {
        self.master = Some(master);
    }

    /// Strictly increasing ids, unique for the lifetime of this driver.
    pub fn next_id(&mut self) -> FtId {
        let id = FtId::from(format!("{}:{}", self.origin, self.next_seq));
        self.next_seq += 1;
        id
    }

    /// Enqueue a message for at-least-once delivery and transmit the
    /// first copy right away when a master is known.
    pub fn reliable_send(&mut self, id: FtId, message: MasterMessage, on_give_up: GiveUp) {
        let mut entry = PendingSend {
            message,
            deadline: Instant::now(),
            attempts: 0,
            on_give_up,
        };
        if let Some(master) = &self.master {
            let _ = master.send(entry.message.clone());
            entry.attempts = 1;
            entry.deadline = Instant::now() + self.tick;
        }
        self.pending.insert(id, entry);
    }

    /// The retransmission tick. Every entry whose deadline has passed is
    /// either retransmitted to the currently-known master or, once its
    /// attempt budget is spent, dropped; the give-up actions of dropped
    /// entries are returned for the owner to run.
    pub fn send_outstanding(&mut self) -> Vec<GiveUp> {
        let now = Instant::now();
        let mut given_up = Vec::new();
        let expired: Vec<FtId> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            let Some(entry) = self.pending.get_mut(&id) else {
                continue;
            };
            if entry.attempts >= self.attempt_budget {
                warn!("giving up on reliable message {id} after {} attempts", entry.attempts);
                if let Some(entry) = self.pending.remove(&id) {
                    given_up.push(entry.on_give_up);
                }
                continue;
            }
            let Some(master) = &self.master else {
                // Nowhere to send; hold the entry without burning attempts
                // until a master is detected.
                continue;
            };
            debug!("retransmitting reliable message {id} (attempt {})", entry.attempts + 1);
            let _ = master.send(entry.message.clone());
            entry.attempts += 1;
            entry.deadline = now + self.tick;
        }
        given_up
    }

    /// An end-to-end acknowledgement arrived for one of our sends.
    pub fn got_ack(&mut self, id: &FtId) {
        if self.pending.remove(id).is_some() {
            debug!("got final ack for {id}");
        } else {
            debug!("ignoring ack for unknown or completed message {id}");
        }
    }

    /// Record an inbound reliable message and acknowledge it to its
    /// original sender. Returns true the first time a given
    /// `(id, origin)` pair is seen and false for duplicates; the
    /// acknowledgement is emitted in both cases so a sender that missed
    /// the first ack stops retransmitting.
    pub fn accept_message_ack(&mut self, id: &FtId, origin: &Pid<MasterMessage>) -> bool {
        let _ = origin.send(MasterMessage::RelayAck {
            ft_id: id.clone(),
            sender: self.origin.clone(),
        });
        let now = Instant::now();
        self.trim_recent(now);
        let key = (id.clone(), origin.addr().to_string());
        if self.seen.contains(&key) {
            debug!("dropping duplicate reliable message {id} from {}", origin.addr());
            return false;
        }
        self.seen.insert(key.clone());
        self.recent.push_back((key, now));
        true
    }

    /// Retention must exceed the sender's total retry window; four times
    /// that window leaves a comfortable margin.
    fn retention(&self) -> Duration {
        self.tick * (self.attempt_budget as u32).max(1) * 4
    }

    fn trim_recent(&mut self, now: Instant) {
        let horizon = self.retention();
        while let Some((key, seen_at)) = self.recent.front() {
            if self.recent.len() > RECENT_CAP || now.duration_since(*seen_at) > horizon {
                self.seen.remove(key);
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }
}
