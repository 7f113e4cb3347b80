mod bootstrap;

use anyhow::Result;
use clap::Parser;
use ginga_core::config::ActorConfig;
use ginga_core::identity::IdentityTable;
use ginga_core::settings::Settings;
use ginga_runtime::actor::GingaActor;
use ginga_runtime::commands::{CommandHandler, CommandServer};
use ginga_runtime::hub::HubListener;
use ginga_viewer::dispatcher::ChannelDispatcher;
use ginga_viewer::remote::RemoteViewer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = Settings::parse();
    bootstrap::setup_logging(settings.log_directive())?;

    let config = ActorConfig::load(settings.config.as_deref())?;
    let identity = IdentityTable::new(&config.identity.hosts, &config.identity.default_name);
    let name = identity.resolve_local().to_string();

    tracing::info!("{} v{} starting", name, env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Hub: {}:{}, Viewer: {}:{}, Cameras: {}",
        config.hub.host,
        config.hub.port,
        config.viewer.host,
        config.viewer.port,
        config.cameras.ids.len()
    );

    let viewer = RemoteViewer::from_config(&config.viewer);
    let actor = GingaActor::new(name.clone(), &config, ChannelDispatcher::new(viewer));

    let commands = CommandServer::bind(&config.commands, CommandHandler::new(name)).await?;
    let (rx, hub) = HubListener::from_config(&config.hub).start();

    tokio::select! {
        _ = actor.run(rx) => {
            tracing::info!("hub listener stopped");
        }
        _ = commands.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received; shutting down");
        }
    }
    hub.abort();

    Ok(())
}
