use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ExposedModule, FragmentDescriptor, Renderable};

/// Transition requests accepted by the session store. Any fragment may
/// dispatch these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SessionAction {
    Login { name: String },
    UpdateUserName { name: String },
    Logout,
}

impl SessionAction {
    pub fn login(name: impl Into<String>) -> Self {
        Self::Login { name: name.into() }
    }

    pub fn update_user_name(name: impl Into<String>) -> Self {
        Self::UpdateUserName { name: name.into() }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Login { .. } => "[User] Login",
            Self::UpdateUserName { .. } => "[User] Update Name",
            Self::Logout => "[User] Logout",
        }
    }
}

/// Document served at a remote's `remoteEntry` location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    #[serde(default)]
    pub exposes: BTreeMap<ExposedModule, RemoteModule>,
}

pub type RemoteModule = BTreeMap<String, Export>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Export {
    Component(Renderable),
    Routes { routes: Vec<RouteEntry> },
}

impl Export {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Component(_) => "component",
            Self::Routes { .. } => "route table",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub path: String,
    #[serde(default)]
    pub target: RouteTarget,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteEntry>,
}

impl RouteEntry {
    pub fn new(path: impl Into<String>, target: RouteTarget) -> Self {
        Self {
            path: path.into(),
            target,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<RouteEntry>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RouteTarget {
    #[default]
    None,
    Local(Renderable),
    Component(FragmentDescriptor),
    Children(FragmentDescriptor),
}
