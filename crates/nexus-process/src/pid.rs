use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

/// A typed address for a mailbox. A `Pid` can be cloned freely and sent
/// across tasks; messages submitted through it are delivered in order.
/// Equality and hashing consider only the address string, so a `Pid`
/// received over the wire compares equal to a locally minted one for the
/// same endpoint.
pub struct Pid<M> {
    addr: Arc<str>,
    sender: mpsc::UnboundedSender<M>,
}

impl<M> Pid<M> {
    pub(crate) fn new(addr: Arc<str>, sender: mpsc::UnboundedSender<M>) -> Self {
        Self { addr, sender }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn send(&self, message: M) -> Result<(), mpsc::error::SendError<M>> {
        self.sender.send(message)
    }

    /// Resolves once the receiving side of the mailbox is gone.
    /// This is the liveness hook for peers: await it to observe the death
    /// of the process behind the address.
    pub async fn closed(&self) {
        self.sender.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<M> Clone for Pid<M> {
    fn clone(&self) -> Self {
        Self {
            addr: self.addr.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<M> PartialEq for Pid<M> {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl<M> Eq for Pid<M> {}

impl<M> std::hash::Hash for Pid<M> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
    }
}

impl<M> fmt::Debug for Pid<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pid").field(&self.addr).finish()
    }
}

impl<M> fmt::Display for Pid<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// Create a raw addressable endpoint that is not backed by an actor.
/// Useful for peers driven by hand, such as test doubles.
pub fn mailbox<M>(addr: impl Into<Arc<str>>) -> (Pid<M>, mpsc::UnboundedReceiver<M>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Pid::new(addr.into(), tx), rx)
}

/// A name registry mapping address strings to live pids. This stands in
/// for resolving a peer out of a configured address: callers look up the
/// address they were given and treat a miss as a configuration error.
pub struct Directory<M> {
    inner: Arc<RwLock<HashMap<String, Pid<M>>>>,
}

impl<M> Clone for Directory<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M> Default for Directory<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Directory<M> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register(&self, pid: Pid<M>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.insert(pid.addr().to_string(), pid);
    }

    pub fn lookup(&self, addr: &str) -> Option<Pid<M>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.get(addr).cloned()
    }

    pub fn remove(&self, addr: &str) -> Option<Pid<M>> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.remove(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mailbox_delivers_in_order() {
        let (pid, mut rx) = mailbox::<u32>("peer");
        assert_eq!(pid.addr(), "peer");
        pid.send(1).unwrap();
        pid.send(2).unwrap();
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test]
    async fn test_pid_closed_resolves_on_receiver_drop() {
        let (pid, rx) = mailbox::<u32>("peer");
        assert!(!pid.is_closed());
        drop(rx);
        pid.closed().await;
        assert!(pid.is_closed());
        assert!(pid.send(1).is_err());
    }

    #[tokio::test]
    async fn test_pid_equality_is_by_address() {
        let (a, _rx_a) = mailbox::<u32>("same");
        let (b, _rx_b) = mailbox::<u32>("same");
        let (c, _rx_c) = mailbox::<u32>("other");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_directory_register_and_lookup() {
        let directory = Directory::<u32>::new();
        let (pid, _rx) = mailbox::<u32>("master");
        directory.register(pid);
        assert!(directory.lookup("master").is_some());
        assert!(directory.lookup("missing").is_none());
        assert!(directory.remove("master").is_some());
        assert!(directory.lookup("master").is_none());
    }
}
