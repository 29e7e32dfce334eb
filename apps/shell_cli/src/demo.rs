//! In-memory remotes for running the shell without any remote servers. The
//! contact remote is left out on purpose so its route shows the fallback.

use std::{collections::BTreeMap, time::Duration};

use fragment_loader::StaticModuleResolver;
use shared::{
    domain::{ExposedModule, FragmentDescriptor, MountPoint, Renderable},
    protocol::{Export, RemoteEntry, RouteEntry, RouteTarget},
};
use shell::Settings;

const DEMO_LATENCY: Duration = Duration::from_millis(25);

fn remote(name: &str, module: &str, symbol: &str, export: Export) -> RemoteEntry {
    let mut exports = BTreeMap::new();
    exports.insert(symbol.to_string(), export);
    let mut exposes = BTreeMap::new();
    exposes.insert(ExposedModule::new(module), exports);
    RemoteEntry {
        name: name.to_string(),
        exposes,
    }
}

fn component(name: &str, symbol: &str, template: &str) -> RemoteEntry {
    remote(
        name,
        "./Component",
        symbol,
        Export::Component(Renderable::new(symbol, template)),
    )
}

pub async fn resolver(settings: &Settings) -> StaticModuleResolver {
    let resolver = StaticModuleResolver::new().with_latency(DEMO_LATENCY);

    resolver
        .insert(
            settings.header_entry.clone(),
            component("mfeHeader", "HeaderComponent", "<header>MFE Shop</header>"),
        )
        .await;
    resolver
        .insert(
            settings.footer_entry.clone(),
            component("mfeFooter", "FooterComponent", "<footer>(c) MFE Shop</footer>"),
        )
        .await;
    resolver
        .insert(
            settings.about_entry.clone(),
            component("mfeAbout", "AboutComponent", "<section>About us</section>"),
        )
        .await;
    resolver
        .insert(
            settings.products_entry.clone(),
            component(
                "mfeProducts",
                "ProductsComponent",
                "<section>Products</section>",
            ),
        )
        .await;

    let products = FragmentDescriptor::new(
        settings.products_entry.clone(),
        "ProductsComponent",
        MountPoint::outlet(),
    )
    .with_fallback(settings.fallback());
    let home_routes = vec![RouteEntry::new(
        "",
        RouteTarget::Local(Renderable::new("HomeComponent", "<main>Home</main>")),
    )
    .with_children(vec![RouteEntry::new(
        "products",
        RouteTarget::Component(products),
    )])];
    resolver
        .insert(
            settings.home_entry.clone(),
            remote(
                "mfeHome",
                "./routes",
                "routes",
                Export::Routes {
                    routes: home_routes,
                },
            ),
        )
        .await;

    resolver
}
