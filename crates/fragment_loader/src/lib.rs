//! Remote fragment loading with fallback.
//!
//! A fragment is addressed by its remote entry location, the module exposed
//! by that entry, and the symbol exported from that module. Loading never
//! fails from the caller's point of view: any problem along the way yields
//! the descriptor's fallback together with the reason.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{FragmentDescriptor, MountOrigin, Renderable},
    error::LoadError,
    protocol::{Export, RemoteEntry, RouteEntry},
};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

#[async_trait]
pub trait ModuleResolver: Send + Sync {
    async fn resolve(&self, location: &Url) -> Result<RemoteEntry, LoadError>;
}

/// Fetches remote entry documents over HTTP.
pub struct HttpModuleResolver {
    http: Client,
}

impl HttpModuleResolver {
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }
}

#[async_trait]
impl ModuleResolver for HttpModuleResolver {
    async fn resolve(&self, location: &Url) -> Result<RemoteEntry, LoadError> {
        let network_error = |err: reqwest::Error| LoadError::Network {
            location: location.to_string(),
            message: err.to_string(),
        };

        let res = self
            .http
            .get(location.clone())
            .send()
            .await
            .map_err(network_error)?;
        let status = res.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                location: location.to_string(),
                status: status.as_u16(),
            });
        }

        let body = res.bytes().await.map_err(network_error)?;
        serde_json::from_slice(&body).map_err(|err| LoadError::Instantiation {
            location: location.to_string(),
            message: err.to_string(),
        })
    }
}

/// Serves remote entries registered in memory.
#[derive(Default)]
pub struct StaticModuleResolver {
    entries: RwLock<HashMap<Url, RemoteEntry>>,
    latency: Option<Duration>,
}

impl StaticModuleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn insert(&self, location: Url, entry: RemoteEntry) {
        self.entries.write().await.insert(location, entry);
    }

    pub async fn remove(&self, location: &Url) -> Option<RemoteEntry> {
        self.entries.write().await.remove(location)
    }
}

#[async_trait]
impl ModuleResolver for StaticModuleResolver {
    async fn resolve(&self, location: &Url) -> Result<RemoteEntry, LoadError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.entries
            .read()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| LoadError::Network {
                location: location.to_string(),
                message: "no remote registered at this location".to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Fragment(Renderable),
    Fallback {
        renderable: Renderable,
        reason: LoadError,
    },
}

impl LoadOutcome {
    pub fn renderable(&self) -> &Renderable {
        match self {
            Self::Fragment(renderable) | Self::Fallback { renderable, .. } => renderable,
        }
    }

    pub fn into_renderable(self) -> Renderable {
        match self {
            Self::Fragment(renderable) | Self::Fallback { renderable, .. } => renderable,
        }
    }

    pub fn origin(&self) -> MountOrigin {
        match self {
            Self::Fragment(_) => MountOrigin::Fragment,
            Self::Fallback { .. } => MountOrigin::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Resolves fragment descriptors through a [`ModuleResolver`]. Every call
/// goes back to the resolver; nothing is cached between calls.
#[derive(Clone)]
pub struct FragmentLoader {
    resolver: Arc<dyn ModuleResolver>,
}

impl FragmentLoader {
    pub fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        Self { resolver }
    }

    pub async fn load(&self, descriptor: &FragmentDescriptor) -> LoadOutcome {
        let result = match self.fetch_export(descriptor).await {
            Ok(Export::Component(renderable)) => Ok(renderable),
            Ok(other) => Err(LoadError::WrongExportKind {
                location: descriptor.location.to_string(),
                symbol: descriptor.exported_symbol.clone(),
                expected: "component",
                found: other.kind_name(),
            }),
            Err(err) => Err(err),
        };

        match result {
            Ok(renderable) => {
                debug!(
                    location = %descriptor.location,
                    symbol = %descriptor.exported_symbol,
                    "remote fragment loaded"
                );
                LoadOutcome::Fragment(renderable)
            }
            Err(reason) => {
                warn!(
                    location = %descriptor.location,
                    symbol = %descriptor.exported_symbol,
                    kind = ?reason.kind(),
                    error = %reason,
                    "remote fragment unavailable; using fallback"
                );
                LoadOutcome::Fallback {
                    renderable: descriptor.fallback.clone(),
                    reason,
                }
            }
        }
    }

    /// Loads a route table export. Any failure yields an empty table.
    pub async fn load_routes(&self, descriptor: &FragmentDescriptor) -> Vec<RouteEntry> {
        match self.fetch_export(descriptor).await {
            Ok(Export::Routes { routes }) => routes,
            Ok(other) => {
                warn!(
                    location = %descriptor.location,
                    symbol = %descriptor.exported_symbol,
                    found = other.kind_name(),
                    "remote export is not a route table; using no routes"
                );
                Vec::new()
            }
            Err(error) => {
                warn!(
                    location = %descriptor.location,
                    symbol = %descriptor.exported_symbol,
                    %error,
                    "remote routes unavailable; using no routes"
                );
                Vec::new()
            }
        }
    }

    async fn fetch_export(&self, descriptor: &FragmentDescriptor) -> Result<Export, LoadError> {
        let mut entry = self.resolver.resolve(&descriptor.location).await?;
        let mut module = entry
            .exposes
            .remove(&descriptor.exposed_module)
            .ok_or_else(|| LoadError::MissingModule {
                location: descriptor.location.to_string(),
                module: descriptor.exposed_module.to_string(),
            })?;
        module
            .remove(&descriptor.exported_symbol)
            .ok_or_else(|| LoadError::MissingSymbol {
                location: descriptor.location.to_string(),
                module: descriptor.exposed_module.to_string(),
                symbol: descriptor.exported_symbol.clone(),
            })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
