use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use shared::{
    domain::{ExposedModule, FragmentDescriptor, MountPoint, Renderable},
    protocol::{RouteEntry, RouteTarget},
};
use tracing::warn;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "shell.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    pub header_entry: Url,
    pub footer_entry: Url,
    pub home_entry: Url,
    pub about_entry: Url,
    pub contact_entry: Url,
    /// Only read by the in-memory `--demo` remotes. Over HTTP the products
    /// route comes from the home remote's own route table.
    pub products_entry: Url,
    pub fallback_text: String,
    pub fetch_timeout_ms: Option<u64>,
    pub log_filter: String,
}

impl Settings {
    /// Remotes served from `localhost:4201` through `localhost:4206`.
    pub fn local() -> Result<Self, url::ParseError> {
        Ok(Self {
            header_entry: local_remote(4201)?,
            footer_entry: local_remote(4202)?,
            home_entry: local_remote(4203)?,
            about_entry: local_remote(4204)?,
            contact_entry: local_remote(4205)?,
            products_entry: local_remote(4206)?,
            fallback_text: "Content unavailable".into(),
            fetch_timeout_ms: None,
            log_filter: "info".into(),
        })
    }
}

fn local_remote(port: u16) -> Result<Url, url::ParseError> {
    Url::parse(&format!("http://localhost:{port}/remoteEntry.js"))
}

/// Optional overrides read from the settings file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    header_entry: Option<Url>,
    footer_entry: Option<Url>,
    home_entry: Option<Url>,
    about_entry: Option<Url>,
    contact_entry: Option<Url>,
    products_entry: Option<Url>,
    fallback_text: Option<String>,
    fetch_timeout_ms: Option<u64>,
    log_filter: Option<String>,
}

/// Defaults, then `path` if it exists, then `APP__*` environment variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::local().context("invalid built-in remote location")?;

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?;
        apply_file_settings(&mut settings, file_cfg);
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.header_entry {
        settings.header_entry = v;
    }
    if let Some(v) = file_cfg.footer_entry {
        settings.footer_entry = v;
    }
    if let Some(v) = file_cfg.home_entry {
        settings.home_entry = v;
    }
    if let Some(v) = file_cfg.about_entry {
        settings.about_entry = v;
    }
    if let Some(v) = file_cfg.contact_entry {
        settings.contact_entry = v;
    }
    if let Some(v) = file_cfg.products_entry {
        settings.products_entry = v;
    }
    if let Some(v) = file_cfg.fallback_text {
        settings.fallback_text = v;
    }
    if file_cfg.fetch_timeout_ms.is_some() {
        settings.fetch_timeout_ms = file_cfg.fetch_timeout_ms;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let url_overrides: [(&str, &mut Url); 6] = [
        ("APP__HEADER_ENTRY", &mut settings.header_entry),
        ("APP__FOOTER_ENTRY", &mut settings.footer_entry),
        ("APP__HOME_ENTRY", &mut settings.home_entry),
        ("APP__ABOUT_ENTRY", &mut settings.about_entry),
        ("APP__CONTACT_ENTRY", &mut settings.contact_entry),
        ("APP__PRODUCTS_ENTRY", &mut settings.products_entry),
    ];
    for (key, slot) in url_overrides {
        if let Some(v) = lookup(key) {
            match Url::parse(&v) {
                Ok(url) => *slot = url,
                Err(error) => warn!(key, value = %v, %error, "ignoring invalid remote url"),
            }
        }
    }

    if let Some(v) = lookup("APP__FALLBACK_TEXT") {
        settings.fallback_text = v;
    }
    if let Some(v) = lookup("APP__FETCH_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.fetch_timeout_ms = Some(parsed);
        }
    }
    if let Some(v) = lookup("RUST_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

impl Settings {
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }

    pub fn fallback(&self) -> Renderable {
        Renderable::new(
            "FallbackComponent",
            format!(
                "<div style=\"padding: 40px; text-align: center;\"><p>{}</p></div>",
                self.fallback_text
            ),
        )
    }

    fn component(&self, location: &Url, symbol: &str, mount_point: MountPoint) -> FragmentDescriptor {
        FragmentDescriptor::new(location.clone(), symbol, mount_point).with_fallback(self.fallback())
    }

    /// Fragments mounted while a session is active, in mount order.
    pub fn session_fragments(&self) -> Vec<FragmentDescriptor> {
        vec![
            self.component(&self.header_entry, "HeaderComponent", MountPoint::header()),
            self.component(&self.footer_entry, "FooterComponent", MountPoint::footer()),
        ]
    }

    pub fn route_table(&self) -> Vec<RouteEntry> {
        let home_routes = FragmentDescriptor::new(self.home_entry.clone(), "routes", MountPoint::outlet())
            .with_exposed_module(ExposedModule::new("./routes"));
        vec![
            RouteEntry::new("", RouteTarget::Children(home_routes)),
            RouteEntry::new(
                "about",
                RouteTarget::Component(self.component(
                    &self.about_entry,
                    "AboutComponent",
                    MountPoint::outlet(),
                )),
            ),
            RouteEntry::new(
                "contact",
                RouteTarget::Component(self.component(
                    &self.contact_entry,
                    "ContactComponent",
                    MountPoint::outlet(),
                )),
            ),
        ]
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
