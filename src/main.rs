//! Jim Player - a local media player for the terminal
//! Scans a music folder and plays it through an EQ, limiter and fade chain

mod app;
mod audio;
mod error;
mod features;
mod player;

use std::path::PathBuf;

use anyhow::Context;

use crate::features::{PlaylistStore, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let settings = Settings::load();
    let playlists = PlaylistStore::load();

    let mut service = player::spawn_player().context("Failed to start player")?;
    let events = service
        .take_event_rx()
        .context("Player events already taken")?;

    // Folder from the command line wins over the last one scanned
    let root = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| settings.library.last_root.clone());

    let mut app = app::App::new(
        service.handle.clone(),
        settings,
        Settings::file_path(),
        playlists,
    );

    if let Some(root) = root {
        if let Err(e) = app.update(app::Command::Scan(root)).await {
            eprintln!("{:#}", e);
        }
    }

    app.run(events).await?;
    service.join(std::time::Duration::from_secs(2))
}
