use super::*;
use std::collections::BTreeMap;

use async_trait::async_trait;
use fragment_loader::{ModuleResolver, StaticModuleResolver};
use shared::{
    domain::{ExposedModule, MountOrigin, Renderable},
    error::LoadError,
    protocol::{Export, RemoteEntry, SessionAction},
};
use tokio::sync::{oneshot, Notify};
use url::Url;

use crate::surface::{RecordingSurface, SurfaceEvent};

fn header_location() -> Url {
    Url::parse("http://localhost:4201/remoteEntry.js").expect("url")
}

fn footer_location() -> Url {
    Url::parse("http://localhost:4202/remoteEntry.js").expect("url")
}

fn component_entry(name: &str, symbol: &str, template: &str) -> RemoteEntry {
    let mut module = BTreeMap::new();
    module.insert(
        symbol.to_string(),
        Export::Component(Renderable::new(symbol, template)),
    );
    let mut exposes = BTreeMap::new();
    exposes.insert(ExposedModule::default(), module);
    RemoteEntry {
        name: name.to_string(),
        exposes,
    }
}

fn dependents() -> Vec<FragmentDescriptor> {
    vec![
        FragmentDescriptor::new(header_location(), "HeaderComponent", MountPoint::header()),
        FragmentDescriptor::new(footer_location(), "FooterComponent", MountPoint::footer()),
    ]
}

async fn healthy_resolver() -> Arc<StaticModuleResolver> {
    let resolver = Arc::new(StaticModuleResolver::new());
    resolver
        .insert(
            header_location(),
            component_entry("mfeHeader", "HeaderComponent", "<header/>"),
        )
        .await;
    resolver
        .insert(
            footer_location(),
            component_entry("mfeFooter", "FooterComponent", "<footer/>"),
        )
        .await;
    resolver
}

struct Harness {
    store: Arc<SessionStore>,
    surface: Arc<RecordingSurface>,
    controller: ShellController,
}

fn harness(resolver: Arc<dyn ModuleResolver>) -> Harness {
    let store = SessionStore::new();
    let surface = Arc::new(RecordingSurface::new());
    let controller = ShellController::attach(
        Arc::clone(&store),
        FragmentLoader::new(resolver),
        surface.clone(),
        dependents(),
    );
    Harness {
        store,
        surface,
        controller,
    }
}

/// Holds each resolve until the test releases it.
struct GatedResolver {
    inner: Arc<StaticModuleResolver>,
    gates: Mutex<HashMap<Url, oneshot::Receiver<()>>>,
    started: Notify,
    calls: Mutex<Vec<Url>>,
}

impl GatedResolver {
    fn new(inner: Arc<StaticModuleResolver>) -> (Arc<Self>, HashMap<Url, oneshot::Sender<()>>) {
        let mut gates = HashMap::new();
        let mut releases = HashMap::new();
        for location in [header_location(), footer_location()] {
            let (tx, rx) = oneshot::channel();
            gates.insert(location.clone(), rx);
            releases.insert(location, tx);
        }
        let resolver = Arc::new(Self {
            inner,
            gates: Mutex::new(gates),
            started: Notify::new(),
            calls: Mutex::new(Vec::new()),
        });
        (resolver, releases)
    }

    fn calls(&self) -> Vec<Url> {
        self.calls.lock().expect("calls").clone()
    }
}

#[async_trait]
impl ModuleResolver for GatedResolver {
    async fn resolve(&self, location: &Url) -> Result<RemoteEntry, LoadError> {
        self.calls.lock().expect("calls").push(location.clone());
        let gate = self.gates.lock().expect("gates").remove(location);
        self.started.notify_one();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.inner.resolve(location).await
    }
}

#[tokio::test]
async fn login_mounts_header_then_footer() {
    let h = harness(healthy_resolver().await);
    assert_eq!(
        h.controller.mount_state(&MountPoint::header()),
        MountState::Unmounted
    );

    h.store
        .dispatch(SessionAction::login("John Doe"))
        .expect("login");
    assert_eq!(
        h.controller.mount_state(&MountPoint::header()),
        MountState::Mounting
    );
    h.controller.wait_idle().await;

    assert_eq!(
        h.surface.events(),
        vec![
            SurfaceEvent::Attached {
                mount_point: MountPoint::header(),
                component: "HeaderComponent".to_string(),
            },
            SurfaceEvent::Attached {
                mount_point: MountPoint::footer(),
                component: "FooterComponent".to_string(),
            },
        ]
    );
    assert_eq!(
        h.controller.mount_state(&MountPoint::footer()),
        MountState::Mounted
    );
    let record = h
        .controller
        .mounted(&MountPoint::header())
        .expect("header record");
    assert_eq!(record.origin, MountOrigin::Fragment);
}

#[tokio::test]
async fn logout_detaches_synchronously() {
    let h = harness(healthy_resolver().await);
    h.store.dispatch(SessionAction::login("John")).expect("login");
    h.controller.wait_idle().await;

    h.store.dispatch(SessionAction::Logout).expect("logout");

    // No await between dispatch and these checks.
    assert!(h.surface.is_empty(&MountPoint::header()));
    assert!(h.surface.is_empty(&MountPoint::footer()));
    assert_eq!(
        h.controller.mount_state(&MountPoint::header()),
        MountState::Unmounted
    );
    assert!(h.controller.mounted(&MountPoint::footer()).is_none());
}

#[tokio::test]
async fn repeated_authenticated_notifications_do_not_remount() {
    let h = harness(healthy_resolver().await);
    h.store.dispatch(SessionAction::login("John")).expect("login");
    h.controller.wait_idle().await;

    h.store
        .dispatch(SessionAction::update_user_name("Johnny"))
        .expect("rename");
    h.store
        .dispatch(SessionAction::login("Johnny Again"))
        .expect("second login");
    h.controller.wait_idle().await;

    let attaches = h
        .surface
        .events()
        .into_iter()
        .filter(|event| matches!(event, SurfaceEvent::Attached { .. }))
        .count();
    assert_eq!(attaches, 2);
}

#[tokio::test]
async fn logout_while_logged_out_detaches_nothing() {
    let h = harness(healthy_resolver().await);
    h.store.dispatch(SessionAction::Logout).expect("logout");
    h.store.dispatch(SessionAction::Logout).expect("logout");
    assert!(h.surface.events().is_empty());
}

#[tokio::test]
async fn failed_fragment_mounts_fallback_without_blocking_the_other() {
    let resolver = Arc::new(StaticModuleResolver::new());
    resolver
        .insert(
            footer_location(),
            component_entry("mfeFooter", "FooterComponent", "<footer/>"),
        )
        .await;
    let h = harness(resolver);

    h.store.dispatch(SessionAction::login("John")).expect("login");
    h.controller.wait_idle().await;

    assert_eq!(
        h.surface.mounted(&MountPoint::header()),
        Some(Renderable::unavailable())
    );
    assert_eq!(
        h.controller
            .mounted(&MountPoint::header())
            .expect("header record")
            .origin,
        MountOrigin::Fallback
    );
    assert_eq!(
        h.surface
            .mounted(&MountPoint::footer())
            .expect("footer")
            .component,
        "FooterComponent"
    );
}

#[tokio::test]
async fn header_resolving_after_logout_is_discarded() {
    let (resolver, mut releases) = GatedResolver::new(healthy_resolver().await);
    let h = harness(resolver.clone());

    h.store.dispatch(SessionAction::login("John")).expect("login");
    resolver.started.notified().await;
    assert_eq!(
        h.controller.mount_state(&MountPoint::header()),
        MountState::Mounting
    );

    h.store.dispatch(SessionAction::Logout).expect("logout");
    releases
        .remove(&header_location())
        .expect("header gate")
        .send(())
        .expect("release header");
    h.controller.wait_idle().await;

    assert!(h.surface.is_empty(&MountPoint::header()));
    assert!(h.surface.events().is_empty());
    assert_eq!(
        h.controller.mount_state(&MountPoint::header()),
        MountState::Unmounted
    );
    // The footer load never starts once the session is gone.
    assert_eq!(resolver.calls(), vec![header_location()]);
}

#[tokio::test]
async fn result_from_previous_session_never_mounts_into_new_one() {
    let (resolver, mut releases) = GatedResolver::new(healthy_resolver().await);
    let h = harness(resolver.clone());

    h.store.dispatch(SessionAction::login("John")).expect("login");
    resolver.started.notified().await;
    h.store.dispatch(SessionAction::Logout).expect("logout");
    h.store.dispatch(SessionAction::login("Jane")).expect("relogin");

    // Releasing the first session's header lets the second session proceed;
    // its own loads go straight through since the gates are spent.
    releases
        .remove(&header_location())
        .expect("header gate")
        .send(())
        .expect("release header");
    releases
        .remove(&footer_location())
        .expect("footer gate")
        .send(())
        .expect("release footer");
    h.controller.wait_idle().await;

    let attaches: Vec<_> = h
        .surface
        .events()
        .into_iter()
        .filter(|event| matches!(event, SurfaceEvent::Attached { .. }))
        .collect();
    assert_eq!(attaches.len(), 2, "exactly one header and one footer: {attaches:?}");
    assert_eq!(
        resolver.calls(),
        vec![header_location(), header_location(), footer_location()]
    );
}

#[tokio::test]
async fn existing_session_is_composed_on_attach() {
    let store = SessionStore::new();
    store.dispatch(SessionAction::login("John")).expect("login");
    let surface = Arc::new(RecordingSurface::new());

    let controller = ShellController::attach(
        Arc::clone(&store),
        FragmentLoader::new(healthy_resolver().await),
        surface.clone(),
        dependents(),
    );
    controller.wait_idle().await;

    assert!(!surface.is_empty(&MountPoint::header()));
    assert!(!surface.is_empty(&MountPoint::footer()));
}

#[tokio::test]
async fn attach_during_logout_delivery_stays_unmounted() {
    let store = SessionStore::new();
    store.dispatch(SessionAction::login("John")).expect("login");

    let (entered_tx, entered_rx) = std::sync::mpsc::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let entered_tx = Mutex::new(entered_tx);
    let release_rx = Mutex::new(release_rx);
    let _slow = store.subscribe(move |state| {
        if !state.is_authenticated {
            let _ = lock(&entered_tx).send(());
            let _ = lock(&release_rx).recv();
        }
    });

    let logout_store = Arc::clone(&store);
    let logout = std::thread::spawn(move || logout_store.dispatch(SessionAction::Logout));
    entered_rx.recv().expect("logout delivery started");
    let release = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(50));
        let _ = release_tx.send(());
    });

    let surface = Arc::new(RecordingSurface::new());
    let controller = ShellController::attach(
        Arc::clone(&store),
        FragmentLoader::new(healthy_resolver().await),
        surface.clone(),
        dependents(),
    );
    logout.join().expect("logout thread").expect("logout");
    release.join().expect("release thread");
    controller.wait_idle().await;

    assert_eq!(
        controller.mount_state(&MountPoint::header()),
        MountState::Unmounted
    );
    assert_eq!(
        controller.mount_state(&MountPoint::footer()),
        MountState::Unmounted
    );
    assert!(surface.events().is_empty());
}

#[tokio::test]
async fn shutdown_releases_store_subscription() {
    let h = harness(healthy_resolver().await);
    assert_eq!(h.store.subscriber_count(), 1);

    h.controller.shutdown();
    assert_eq!(h.store.subscriber_count(), 0);

    h.store.dispatch(SessionAction::login("John")).expect("login");
    assert!(h.surface.events().is_empty());
}
