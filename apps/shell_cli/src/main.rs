use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fragment_loader::{FragmentLoader, HttpModuleResolver, ModuleResolver};
use session_store::SessionStore;
use shared::{domain::MountPoint, protocol::SessionAction};
use shell::{
    config::DEFAULT_SETTINGS_FILE, load_settings, ConsoleSurface, LoginForm, Navigator,
    RenderSurface, Settings, ShellController, UpdateNameForm,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod demo;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    /// Serve remotes from memory instead of fetching them over HTTP.
    #[arg(long)]
    demo: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in, visit routes, optionally rename the user, then sign out.
    Session {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long = "visit")]
        visits: Vec<String>,
        #[arg(long)]
        rename: Option<String>,
    },
    /// Resolve a single route and print what it renders.
    Navigate { path: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli.config)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .init();

    let resolver: Arc<dyn ModuleResolver> = if cli.demo {
        Arc::new(demo::resolver(&settings).await)
    } else {
        Arc::new(
            HttpModuleResolver::new(settings.fetch_timeout())
                .context("failed to build remote entry http client")?,
        )
    };
    let loader = FragmentLoader::new(resolver);
    let surface: Arc<dyn RenderSurface> = Arc::new(ConsoleSurface);

    match cli.command {
        Command::Session {
            username,
            password,
            visits,
            rename,
        } => {
            run_session(
                &settings,
                loader,
                surface,
                LoginForm::new(username, password),
                &visits,
                rename,
            )
            .await
        }
        Command::Navigate { path } => {
            let navigator = Navigator::new(loader, settings.route_table());
            show_route(&navigator, surface.as_ref(), &path).await;
            Ok(())
        }
    }
}

async fn run_session(
    settings: &Settings,
    loader: FragmentLoader,
    surface: Arc<dyn RenderSurface>,
    login: LoginForm,
    visits: &[String],
    rename: Option<String>,
) -> Result<()> {
    let store = SessionStore::new();
    let controller = ShellController::attach(
        Arc::clone(&store),
        loader.clone(),
        Arc::clone(&surface),
        settings.session_fragments(),
    );
    let navigator = Navigator::new(loader, settings.route_table());

    if let Err(err) = login.submit(&store) {
        println!("{err}");
        return Ok(());
    }
    println!(
        "Welcome, {}!",
        store.user_name().unwrap_or_else(|| "guest".to_string())
    );
    controller.wait_idle().await;

    for path in visits {
        show_route(&navigator, surface.as_ref(), path).await;
    }

    if let Some(new_username) = rename {
        let mut form = UpdateNameForm::default();
        form.toggle();
        form.new_username = new_username;
        match form.submit(&store) {
            Ok(state) => println!(
                "Signed in as {}",
                state.name.as_deref().unwrap_or_default()
            ),
            Err(err) => println!("{err}"),
        }
    }

    store
        .dispatch(SessionAction::Logout)
        .context("failed to sign out")?;
    surface.detach(&MountPoint::outlet());
    info!("signed out");
    controller.shutdown();
    Ok(())
}

async fn show_route(navigator: &Navigator, surface: &dyn RenderSurface, path: &str) {
    match navigator.navigate(path).await {
        Ok(chain) => match chain.last() {
            Some(leaf) => surface.attach(leaf, &MountPoint::outlet()),
            None => surface.detach(&MountPoint::outlet()),
        },
        Err(err) => {
            warn!(path, error = %err, "navigation failed");
            println!("{err}");
        }
    }
}
