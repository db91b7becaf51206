use std::sync::Arc;
use std::time::Duration;

use log::error;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinSet};

use crate::pid::Pid;

pub trait Actor: Sized + Send + 'static {
    type Message: Send + 'static;
    type Options;

    fn new(options: Self::Options) -> Self;
    fn start(&mut self, ctx: &mut ActorContext<Self>);
    /// Process one message and return the next action.
    /// All messages are processed sequentially in a single task, so this
    /// method must not block; long-running work belongs in tasks spawned
    /// via [ActorContext::spawn].
    fn receive(&mut self, ctx: &mut ActorContext<Self>, message: Self::Message)
        -> ActorAction;
    /// Invoked when no message arrives within [Actor::tick_interval].
    /// Actors with no periodic work keep the default.
    fn tick(&mut self, _ctx: &mut ActorContext<Self>) -> ActorAction {
        ActorAction::Continue
    }
    /// The timed-receive bound of the event loop. Returning [None] makes
    /// the loop block until the next message.
    fn tick_interval(&self) -> Option<Duration> {
        None
    }
    fn stop(self);
}

pub enum ActorAction {
    Continue,
    Stop,
}

pub struct ActorContext<T: Actor> {
    handle: ActorHandle<T>,
    /// A set of tasks spawned by the actor when processing messages.
    /// All these tasks will be aborted when the context is dropped.
    tasks: JoinSet<()>,
}

impl<T: Actor> ActorContext<T> {
    fn new(handle: &ActorHandle<T>) -> Self {
        Self {
            handle: handle.clone(),
            tasks: JoinSet::new(),
        }
    }

    pub fn handle(&self) -> &ActorHandle<T> {
        &self.handle
    }

    /// Send a message to the actor itself. The mailbox is unbounded, so
    /// self-sends from within a handler can never block the event loop.
    pub fn send(&self, message: T::Message) {
        // The receiver is owned by the running event loop, so this can only
        // fail after the loop has decided to stop.
        let _ = self.handle.send(message);
    }

    /// Spawn a task and save the handle in the context.
    pub fn spawn(
        &mut self,
        task: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> AbortHandle {
        self.tasks.spawn(task)
    }

    /// Join tasks that have completed and log unexpected failures.
    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            match result {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    error!("failed to join task spawned by actor: {e}");
                }
            }
        }
    }
}

pub struct ActorHandle<T: Actor> {
    name: Arc<str>,
    sender: mpsc::UnboundedSender<T::Message>,
    stopped: watch::Receiver<bool>,
}

impl<T: Actor> Clone for ActorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sender: self.sender.clone(),
            stopped: self.stopped.clone(),
        }
    }
}

impl<T: Actor> ActorHandle<T> {
    pub fn new(name: impl Into<Arc<str>>, options: T::Options) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let (stopped_tx, stopped_rx) = watch::channel::<bool>(false);
        let handle = Self {
            name,
            sender: tx,
            stopped: stopped_rx,
        };
        let runner = ActorRunner {
            actor: T::new(options),
            ctx: ActorContext::new(&handle),
            receiver: rx,
            stopped: stopped_tx,
        };
        // The actor runs detached; the event loop task stops by itself
        // when the stop action is taken.
        tokio::spawn(runner.run());
        handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The typed address of the actor's mailbox.
    pub fn pid(&self) -> Pid<T::Message> {
        Pid::new(self.name.clone(), self.sender.clone())
    }

    pub fn send(
        &self,
        message: T::Message,
    ) -> Result<(), mpsc::error::SendError<T::Message>> {
        self.sender.send(message)
    }

    pub async fn wait_for_stop(mut self) {
        // We ignore the receiver error since the sender must have been
        // dropped in this case, which means the actor has stopped.
        let _ = self.stopped.wait_for(|x| *x).await;
    }
}

struct ActorRunner<T: Actor> {
    actor: T,
    ctx: ActorContext<T>,
    receiver: mpsc::UnboundedReceiver<T::Message>,
    stopped: watch::Sender<bool>,
}

impl<T: Actor> ActorRunner<T> {
    async fn run(mut self) {
        self.actor.start(&mut self.ctx);
        loop {
            let message = match self.actor.tick_interval() {
                Some(interval) => {
                    match tokio::time::timeout(interval, self.receiver.recv()).await {
                        Ok(message) => message,
                        Err(_) => match self.actor.tick(&mut self.ctx) {
                            ActorAction::Continue => {
                                self.ctx.reap();
                                continue;
                            }
                            ActorAction::Stop => break,
                        },
                    }
                }
                None => self.receiver.recv().await,
            };
            let Some(message) = message else {
                break;
            };
            match self.actor.receive(&mut self.ctx, message) {
                ActorAction::Continue => {}
                ActorAction::Stop => break,
            }
            self.ctx.reap();
        }
        self.actor.stop();
        let _ = self.stopped.send(true);
    }
}
