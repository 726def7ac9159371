//! Per-layer usage owner.
//!
//! Every layer's used quota is owned by one task. Writers (scanner, write
//! path, evictor) send commands over an unbounded channel and never block;
//! the owner applies them in arrival order and publishes each new total on a
//! watch channel for readers.
//!
//! ```text
//! scanner ──┐
//! writes ───┼──► mpsc ──► UsageOwner ──► watch ──► used_quota()
//! evictor ──┘
//! ```

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use super::error::QuotaError;
use super::units::Quota;

/// Commands understood by the usage owner.
#[derive(Debug)]
enum UsageCommand {
    Add(u64),
    Subtract(u64),
    Reset,
    /// Reply with the total once every earlier command is applied.
    Sync(oneshot::Sender<Quota>),
}

/// Sending half of a layer's usage owner.
///
/// Cloning is cheap; the owner stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct UsageHandle {
    layer: String,
    tx: mpsc::UnboundedSender<UsageCommand>,
    current: watch::Receiver<Quota>,
}

impl UsageHandle {
    /// Spawn the owner task for `layer`, starting from `initial`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(layer: &str, initial: Quota) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (publish, current) = watch::channel(initial);

        let owner = UsageOwner {
            layer: layer.to_string(),
            used: initial.bytes(),
            rx,
            publish,
        };
        tokio::spawn(owner.run());

        Self {
            layer: layer.to_string(),
            tx,
            current,
        }
    }

    pub fn add(&self, bytes: u64) -> Result<(), QuotaError> {
        self.send(UsageCommand::Add(bytes))
    }

    pub fn subtract(&self, bytes: u64) -> Result<(), QuotaError> {
        self.send(UsageCommand::Subtract(bytes))
    }

    pub fn reset(&self) -> Result<(), QuotaError> {
        self.send(UsageCommand::Reset)
    }

    /// Latest published total. May lag behind commands still in flight.
    pub fn current(&self) -> Quota {
        *self.current.borrow()
    }

    /// Total after every command sent before this call has been applied.
    pub async fn settled(&self) -> Result<Quota, QuotaError> {
        let (reply, response) = oneshot::channel();
        self.send(UsageCommand::Sync(reply))?;
        response.await.map_err(|_| self.closed())
    }

    fn send(&self, command: UsageCommand) -> Result<(), QuotaError> {
        self.tx.send(command).map_err(|_| self.closed())
    }

    fn closed(&self) -> QuotaError {
        QuotaError::OwnerClosed(self.layer.clone())
    }
}

/// The single writer of a layer's used quota.
struct UsageOwner {
    layer: String,
    used: u128,
    rx: mpsc::UnboundedReceiver<UsageCommand>,
    publish: watch::Sender<Quota>,
}

impl UsageOwner {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            self.apply(command);
        }
        debug!(layer = %self.layer, used_bytes = %self.used, "Usage owner stopped");
    }

    fn apply(&mut self, command: UsageCommand) {
        let before = self.used;
        match command {
            UsageCommand::Add(bytes) => {
                self.used = match self.used.checked_add(u128::from(bytes)) {
                    Some(used) => used,
                    None => {
                        warn!(layer = %self.layer, bytes, "Used quota overflow, saturating");
                        u128::MAX
                    }
                };
            }
            UsageCommand::Subtract(bytes) => {
                self.used = match self.used.checked_sub(u128::from(bytes)) {
                    Some(used) => used,
                    None => {
                        warn!(
                            layer = %self.layer,
                            used_bytes = %self.used,
                            bytes,
                            "Used quota would go negative, clamping to zero"
                        );
                        0
                    }
                };
            }
            UsageCommand::Reset => self.used = 0,
            UsageCommand::Sync(reply) => {
                // requester may have gone away
                let _ = reply.send(Quota::from_bytes(self.used));
                return;
            }
        }

        if self.used != before {
            self.publish.send_replace(Quota::from_bytes(self.used));
        }
    }
}
