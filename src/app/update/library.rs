//! Library scanning and browsing

use std::path::PathBuf;

use anyhow::Result;

use crate::app::command::Command;
use crate::app::App;
use crate::features::Library;
use crate::features::import::scan_library;

impl App {
    /// Scan `root`, hand the result to the player and remember the folder
    pub async fn scan(&mut self, root: PathBuf) -> Result<()> {
        let tracks = scan_library(root.clone(), self.scan_config.clone()).await?;
        println!("Found {} tracks in {}", tracks.len(), root.display());

        self.library = Library::new(root.clone(), tracks);
        self.covers.clear();
        let playback = &self.settings.playback;
        self.library.apply_crossfade(|path| playback.crossfade_enabled(path));
        self.player.select_library(self.library.tracks().to_vec());

        if !self.queue_restored {
            self.queue_restored = true;
            let saved = self.library.resolve_paths(&self.settings.saved_queue);
            if !saved.is_empty() {
                tracing::info!("Restoring queue of {} tracks", saved.len());
                self.player.load_playlist(saved);
            }
        }

        self.settings.library.last_root = Some(root);
        self.persist_settings();
        Ok(())
    }

    /// Handle library browsing commands
    pub(super) fn handle_library(&mut self, command: &Command) -> Option<Result<()>> {
        match command {
            Command::List => {
                for (artist, albums) in self.library.organize() {
                    println!("{}", artist);
                    for (album, tracks) in albums {
                        println!("  {}", album);
                        for track in tracks {
                            println!("    [{}] {}", track.id, track.title);
                        }
                    }
                }
                Some(Ok(()))
            }

            Command::Search(query) => {
                let found = self.library.search(query);
                if found.is_empty() {
                    println!("No matches for \"{}\"", query);
                }
                for track in found {
                    println!("[{}] {} ({})", track.id, track, track.album);
                }
                Some(Ok(()))
            }

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::app::Command;
    use crate::app::update::tests::Rig;
    use crate::player::PlayerCommand;

    fn write_library(root: &std::path::Path) {
        for relative in ["Low/Secret Name/Soon.mp3", "Low/Secret Name/Weight of Water.mp3", "single.ogg"] {
            let path = root.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"not really media").unwrap();
        }
    }

    #[tokio::test]
    async fn test_scan_selects_library_and_restores_queue() {
        let music = tempfile::tempdir().unwrap();
        write_library(music.path());

        let mut settings = crate::features::Settings::default();
        let soon = music.path().join("Low/Secret Name/Soon.mp3");
        settings.saved_queue = vec![music.path().join("gone.mp3"), soon.clone()];
        settings.playback.crossfade_tracks.insert(soon.clone());
        let mut rig = Rig::with_settings(settings);

        rig.app
            .update(Command::Scan(music.path().to_path_buf()))
            .await
            .unwrap();

        assert_eq!(rig.app.library().len(), 3);
        assert!(rig.app.library().find_by_path(&soon).is_some_and(|t| t.crossfade));

        let sent = rig.drain();
        assert!(matches!(&sent[0], PlayerCommand::SelectLibrary(tracks) if tracks.len() == 3));
        match &sent[1] {
            PlayerCommand::LoadPlaylist(tracks) => {
                assert_eq!(tracks.len(), 1);
                assert_eq!(tracks[0].path, soon);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(
            rig.saved_settings().library.last_root.as_deref(),
            Some(music.path())
        );

        // Second scan does not restore again
        rig.app
            .update(Command::Scan(music.path().to_path_buf()))
            .await
            .unwrap();
        let sent = rig.drain();
        assert_eq!(sent.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_missing_folder_fails() {
        let mut rig = Rig::new();
        let missing = rig.dir.path().join("nowhere");
        assert!(rig.app.update(Command::Scan(missing)).await.is_err());
        assert!(rig.drain().is_empty());
    }

    #[tokio::test]
    async fn test_browsing_sends_nothing() {
        let mut rig = Rig::new().with_library();
        rig.app.update(Command::List).await.unwrap();
        rig.app.update(Command::Search("low".into())).await.unwrap();
        assert!(rig.drain().is_empty());
    }
}
