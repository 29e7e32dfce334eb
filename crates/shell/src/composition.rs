//! Mounts session-dependent fragments (header, footer) while a user is
//! signed in and removes them on logout.
//!
//! Store notifications are handled synchronously: a login edge queues one
//! compose request for the driver task, a logout edge detaches mounted
//! fragments before `dispatch` returns. Loads already in flight when the
//! session ends are not aborted; their results are dropped when they arrive.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use fragment_loader::{FragmentLoader, LoadOutcome};
use session_store::{select_is_authenticated, SessionState, SessionStore, Subscription};
use shared::domain::{FragmentDescriptor, MountPoint, MountRecord};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::surface::RenderSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    Mounting,
    Mounted,
}

enum Slot {
    Unmounted,
    Mounting,
    Mounted(MountRecord),
}

struct MountTable {
    authenticated: bool,
    // Bumped on every auth edge; a compose request only mounts while its
    // epoch is current.
    epoch: u64,
    slots: HashMap<MountPoint, Slot>,
}

struct ComposeRequest {
    epoch: u64,
}

struct Composer {
    store: Arc<SessionStore>,
    loader: FragmentLoader,
    surface: Arc<dyn RenderSurface>,
    dependents: Vec<FragmentDescriptor>,
    table: Mutex<MountTable>,
    requests: mpsc::UnboundedSender<ComposeRequest>,
    pending: watch::Sender<usize>,
}

impl Composer {
    fn observe(&self, state: &SessionState) {
        let authenticated = select_is_authenticated(Some(state));
        let mut table = lock(&self.table);
        if authenticated == table.authenticated {
            return;
        }
        table.authenticated = authenticated;
        table.epoch += 1;
        let epoch = table.epoch;

        if authenticated {
            for descriptor in &self.dependents {
                table
                    .slots
                    .insert(descriptor.mount_point.clone(), Slot::Mounting);
            }
            self.pending.send_modify(|pending| *pending += 1);
            info!(epoch, "session started; composing dependent fragments");
            if self.requests.send(ComposeRequest { epoch }).is_err() {
                warn!(epoch, "composition driver stopped; fragments will not mount");
                self.pending
                    .send_modify(|pending| *pending = pending.saturating_sub(1));
            }
        } else {
            for descriptor in &self.dependents {
                let previous = table
                    .slots
                    .insert(descriptor.mount_point.clone(), Slot::Unmounted);
                if matches!(previous, Some(Slot::Mounted(_))) {
                    self.surface.detach(&descriptor.mount_point);
                }
            }
            info!(epoch, "session ended; dependent fragments unmounted");
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        lock(&self.table).epoch == epoch
    }

    async fn compose(&self, request: ComposeRequest) {
        for descriptor in &self.dependents {
            if !self.is_current(request.epoch) {
                debug!(
                    epoch = request.epoch,
                    "compose request superseded; skipping remaining fragments"
                );
                return;
            }
            let outcome = self.loader.load(descriptor).await;
            self.mount_if_current(request.epoch, descriptor, outcome);
        }
    }

    fn mount_if_current(&self, epoch: u64, descriptor: &FragmentDescriptor, outcome: LoadOutcome) {
        let mount_point = &descriptor.mount_point;
        let mut table = lock(&self.table);
        if table.epoch != epoch || !self.store.is_authenticated() {
            debug!(%mount_point, epoch, "discarding fragment resolved after session ended");
            return;
        }

        if let LoadOutcome::Fallback { reason, .. } = &outcome {
            warn!(%mount_point, error = %reason, "mounting fallback in place of remote fragment");
        }
        self.surface.attach(outcome.renderable(), mount_point);
        let record = MountRecord {
            mount_point: mount_point.clone(),
            origin: outcome.origin(),
            renderable: outcome.into_renderable(),
            mounted_at: Utc::now(),
        };
        table.slots.insert(mount_point.clone(), Slot::Mounted(record));
        debug!(%mount_point, epoch, "fragment mounted");
    }
}

async fn drive(composer: Arc<Composer>, mut requests: mpsc::UnboundedReceiver<ComposeRequest>) {
    while let Some(request) = requests.recv().await {
        composer.compose(request).await;
        composer
            .pending
            .send_modify(|pending| *pending = pending.saturating_sub(1));
    }
}

pub struct ShellController {
    composer: Arc<Composer>,
    _subscription: Subscription,
    driver: JoinHandle<()>,
    idle: watch::Receiver<usize>,
}

impl ShellController {
    /// Subscribes to `store` and starts the composition driver. Must be
    /// called from within a Tokio runtime.
    pub fn attach(
        store: Arc<SessionStore>,
        loader: FragmentLoader,
        surface: Arc<dyn RenderSurface>,
        dependents: Vec<FragmentDescriptor>,
    ) -> Self {
        let (requests, receiver) = mpsc::unbounded_channel();
        let (pending, idle) = watch::channel(0);
        let slots = dependents
            .iter()
            .map(|descriptor| (descriptor.mount_point.clone(), Slot::Unmounted))
            .collect();
        let composer = Arc::new(Composer {
            store: Arc::clone(&store),
            loader,
            surface,
            dependents,
            table: Mutex::new(MountTable {
                authenticated: false,
                epoch: 0,
                slots,
            }),
            requests,
            pending,
        });
        let driver = tokio::spawn(drive(Arc::clone(&composer), receiver));

        // The replayed state comes first, so a session that already exists
        // counts as a login edge.
        let observer = Arc::downgrade(&composer);
        let subscription = store.subscribe_current(move |state| {
            if let Some(composer) = observer.upgrade() {
                composer.observe(state);
            }
        });

        Self {
            composer,
            _subscription: subscription,
            driver,
            idle,
        }
    }

    pub fn mount_state(&self, mount_point: &MountPoint) -> MountState {
        match lock(&self.composer.table).slots.get(mount_point) {
            Some(Slot::Mounting) => MountState::Mounting,
            Some(Slot::Mounted(_)) => MountState::Mounted,
            Some(Slot::Unmounted) | None => MountState::Unmounted,
        }
    }

    pub fn mounted(&self, mount_point: &MountPoint) -> Option<MountRecord> {
        match lock(&self.composer.table).slots.get(mount_point) {
            Some(Slot::Mounted(record)) => Some(record.clone()),
            _ => None,
        }
    }

    /// Resolves once every queued compose request has finished.
    pub async fn wait_idle(&self) {
        let mut idle = self.idle.clone();
        let _ = idle.wait_for(|pending| *pending == 0).await;
    }

    pub fn shutdown(self) {}
}

impl Drop for ShellController {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/composition_tests.rs"]
mod tests;
