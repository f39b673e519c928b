//! Command handlers - thin dispatcher delegating to submodules

mod library;
mod playback;
mod playlist;
mod queue;
mod settings;

use anyhow::Result;

use super::command::{Command, HELP};
use super::{App, Flow};

impl App {
    /// Apply one console command
    pub async fn update(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Scan(root) => self.scan(root).await?,
            Command::Status => self.show_status().await,
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(Flow::Quit),
            command => {
                // Try each handler in order until one handles the command
                let handled = self
                    .handle_library(&command)
                    .or_else(|| self.handle_playback(&command))
                    .or_else(|| self.handle_queue(&command))
                    .or_else(|| self.handle_settings(&command))
                    .or_else(|| self.handle_playlist(&command));
                match handled {
                    Some(result) => result?,
                    None => tracing::warn!("Unhandled command: {:?}", command),
                }
            }
        }
        Ok(Flow::Continue)
    }
}
