//! Path navigation over the shell route table.
//!
//! Routes are matched in declaration order by whole path segments. An empty
//! route path matches without consuming anything, so a `""` route can host
//! child routes such as `products`. Remote child tables and remote components
//! are fetched only once their route is on the matching path.

use fragment_loader::FragmentLoader;
use futures::future::BoxFuture;
use shared::{
    domain::Renderable,
    protocol::{RouteEntry, RouteTarget},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("no route matches '{path}'")]
    NotFound { path: String },
}

pub struct Navigator {
    loader: FragmentLoader,
    routes: Vec<RouteEntry>,
}

impl Navigator {
    pub fn new(loader: FragmentLoader, routes: Vec<RouteEntry>) -> Self {
        Self { loader, routes }
    }

    /// Returns the renderables along the matched route, outermost first.
    pub async fn navigate(&self, path: &str) -> Result<Vec<Renderable>, NavigationError> {
        let segments = split_path(path);
        match self.resolve(&self.routes, &segments).await {
            Some(chain) => {
                debug!(path, depth = chain.len(), "navigation resolved");
                Ok(chain)
            }
            None => Err(NavigationError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    fn resolve<'a>(
        &'a self,
        routes: &'a [RouteEntry],
        segments: &'a [&'a str],
    ) -> BoxFuture<'a, Option<Vec<Renderable>>> {
        Box::pin(async move {
            for route in routes {
                let route_segments = split_path(&route.path);
                if !segments.starts_with(&route_segments) {
                    continue;
                }
                let rest = &segments[route_segments.len()..];

                let mut children = route.children.clone();
                if let RouteTarget::Children(descriptor) = &route.target {
                    children.extend(self.loader.load_routes(descriptor).await);
                }

                let inner = self.resolve(&children, rest).await;
                let inner = match inner {
                    Some(chain) => chain,
                    // A fully consumed path still matches a route whose
                    // children render nothing.
                    None if rest.is_empty() => Vec::new(),
                    None => continue,
                };

                let mut chain = Vec::with_capacity(inner.len() + 1);
                match &route.target {
                    RouteTarget::Local(renderable) => chain.push(renderable.clone()),
                    RouteTarget::Component(descriptor) => {
                        chain.push(self.loader.load(descriptor).await.into_renderable())
                    }
                    RouteTarget::Children(_) | RouteTarget::None => {}
                }
                chain.extend(inner);
                return Some(chain);
            }
            None
        })
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
