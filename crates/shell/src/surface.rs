//! Rendering collaborators the shell attaches fragments to.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use shared::domain::{MountPoint, Renderable};
use tracing::info;

pub trait RenderSurface: Send + Sync {
    fn attach(&self, renderable: &Renderable, mount_point: &MountPoint);
    fn detach(&self, mount_point: &MountPoint);
}

/// Writes mount changes to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSurface;

impl RenderSurface for ConsoleSurface {
    fn attach(&self, renderable: &Renderable, mount_point: &MountPoint) {
        info!(%mount_point, component = %renderable.component, "attached");
        println!("[{mount_point}] {}", renderable.template);
    }

    fn detach(&self, mount_point: &MountPoint) {
        info!(%mount_point, "detached");
        println!("[{mount_point}] <empty>");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Attached {
        mount_point: MountPoint,
        component: String,
    },
    Detached {
        mount_point: MountPoint,
    },
}

/// Keeps mounted renderables in memory.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    mounted: Mutex<BTreeMap<MountPoint, Renderable>>,
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mounted(&self, mount_point: &MountPoint) -> Option<Renderable> {
        lock(&self.mounted).get(mount_point).cloned()
    }

    pub fn is_empty(&self, mount_point: &MountPoint) -> bool {
        !lock(&self.mounted).contains_key(mount_point)
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        lock(&self.events).clone()
    }
}

impl RenderSurface for RecordingSurface {
    fn attach(&self, renderable: &Renderable, mount_point: &MountPoint) {
        lock(&self.mounted).insert(mount_point.clone(), renderable.clone());
        lock(&self.events).push(SurfaceEvent::Attached {
            mount_point: mount_point.clone(),
            component: renderable.component.clone(),
        });
    }

    fn detach(&self, mount_point: &MountPoint) {
        lock(&self.mounted).remove(mount_point);
        lock(&self.events).push(SurfaceEvent::Detached {
            mount_point: mount_point.clone(),
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
