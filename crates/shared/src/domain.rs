use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

macro_rules! label_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

label_newtype!(MountPoint);
label_newtype!(ExposedModule);

impl MountPoint {
    pub fn header() -> Self {
        Self::new("header")
    }

    pub fn footer() -> Self {
        Self::new("footer")
    }

    pub fn outlet() -> Self {
        Self::new("outlet")
    }
}

impl Default for ExposedModule {
    fn default() -> Self {
        Self::new("./Component")
    }
}

/// Opaque value handed to the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renderable {
    pub component: String,
    pub template: String,
}

impl Renderable {
    pub fn new(component: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            template: template.into(),
        }
    }

    pub fn unavailable() -> Self {
        Self::new(
            "FallbackComponent",
            "<div style=\"padding: 40px; text-align: center;\"><p>Content unavailable</p></div>",
        )
    }
}

/// Where a fragment comes from and where it lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentDescriptor {
    pub location: Url,
    #[serde(default)]
    pub exposed_module: ExposedModule,
    pub exported_symbol: String,
    pub mount_point: MountPoint,
    #[serde(default = "Renderable::unavailable")]
    pub fallback: Renderable,
}

impl FragmentDescriptor {
    pub fn new(location: Url, exported_symbol: impl Into<String>, mount_point: MountPoint) -> Self {
        Self {
            location,
            exposed_module: ExposedModule::default(),
            exported_symbol: exported_symbol.into(),
            mount_point,
            fallback: Renderable::unavailable(),
        }
    }

    pub fn with_exposed_module(mut self, exposed_module: ExposedModule) -> Self {
        self.exposed_module = exposed_module;
        self
    }

    pub fn with_fallback(mut self, fallback: Renderable) -> Self {
        self.fallback = fallback;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountOrigin {
    Fragment,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountRecord {
    pub mount_point: MountPoint,
    pub renderable: Renderable,
    pub origin: MountOrigin,
    pub mounted_at: DateTime<Utc>,
}
