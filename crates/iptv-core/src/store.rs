//! Persistence for playlists, the last played channel and first-run state

use crate::{
    config::PlayerConfig,
    types::{Playlist, PlaylistId},
    Error, Result,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const KEY_PLAYLISTS: &str = "iptv_playlists";
pub const KEY_CURRENT_PLAYLIST: &str = "iptv_current_playlist";
pub const KEY_LAST_CHANNEL: &str = "iptv_last_channel";
pub const KEY_SETTINGS: &str = "iptv_settings";
pub const KEY_FIRST_TIME: &str = "iptv_first_time";

const ALL_KEYS: [&str; 5] = [
    KEY_PLAYLISTS,
    KEY_CURRENT_PLAYLIST,
    KEY_LAST_CHANNEL,
    KEY_SETTINGS,
    KEY_FIRST_TIME,
];

/// String key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String) -> Result<()>;

    /// Removing a missing key is not an error
    fn delete(&mut self, key: &str) -> Result<()>;
}

/// In-process store, lost on exit
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file, rewritten on every change
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open `path`. A missing file starts empty; an unreadable one is
    /// reported and also starts empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupt store file, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = entries.len(), "Store opened");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)
            .map_err(|e| Error::Store(format!("{}: {}", self.path.display(), e)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Last played position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastChannel {
    pub playlist_id: PlaylistId,
    pub channel_index: usize,
    pub timestamp: DateTime<Utc>,
}

/// Typed view over a [`KeyValueStore`]
#[derive(Debug, Clone, Default)]
pub struct Library<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Library<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn save_playlists(&mut self, playlists: &[Playlist]) -> Result<()> {
        self.save_json(KEY_PLAYLISTS, &playlists)?;
        info!(count = playlists.len(), "Playlists saved");
        Ok(())
    }

    pub fn load_playlists(&self) -> Vec<Playlist> {
        self.load_json(KEY_PLAYLISTS).unwrap_or_default()
    }

    /// Append `playlist` to the saved collection
    pub fn add_playlist(&mut self, playlist: Playlist) -> Result<()> {
        let mut playlists = self.load_playlists();
        playlists.push(playlist);
        self.save_playlists(&playlists)
    }

    /// Delete a saved playlist. Returns true when it was the current one;
    /// the current id is cleared and the caller should stop playback.
    pub fn remove_playlist(&mut self, id: &PlaylistId) -> Result<bool> {
        let mut playlists = self.load_playlists();
        let before = playlists.len();
        playlists.retain(|p| &p.id != id);
        if playlists.len() == before {
            debug!(%id, "No such playlist");
            return Ok(false);
        }
        self.save_playlists(&playlists)?;

        let was_current = self.load_current_playlist().as_ref() == Some(id);
        if was_current {
            self.store.delete(KEY_CURRENT_PLAYLIST)?;
            info!(%id, "Current playlist removed");
        }
        Ok(was_current)
    }

    /// Playlist to open at startup: the saved current one, or the first
    /// saved playlist when no current id was stored. A current id that no
    /// longer matches any playlist yields `None`.
    pub fn current_playlist(&self) -> Option<Playlist> {
        let mut playlists = self.load_playlists().into_iter();
        match self.load_current_playlist() {
            Some(id) => playlists.find(|p| p.id == id),
            None => playlists.next(),
        }
    }

    /// Current playlist and the channel index to resume at, if the saved
    /// last channel belongs to it and is still in range
    pub fn resume_point(&self) -> Option<(Playlist, usize)> {
        let playlist = self.current_playlist()?;
        let last = self.load_last_channel()?;

        if last.playlist_id != playlist.id {
            debug!(saved = %last.playlist_id, current = %playlist.id, "Last channel is from another playlist");
            return None;
        }
        if last.channel_index >= playlist.len() {
            warn!(index = last.channel_index, len = playlist.len(), "Saved channel index out of range");
            return None;
        }

        Some((playlist, last.channel_index))
    }

    pub fn save_current_playlist(&mut self, id: &PlaylistId) -> Result<()> {
        self.store.set(KEY_CURRENT_PLAYLIST, id.as_str().to_string())
    }

    pub fn load_current_playlist(&self) -> Option<PlaylistId> {
        self.store.get(KEY_CURRENT_PLAYLIST).map(PlaylistId)
    }

    /// Remember `channel_index` of `playlist_id`, stamped with the current time
    pub fn save_last_channel(&mut self, playlist_id: &PlaylistId, channel_index: usize) -> Result<()> {
        let last = LastChannel {
            playlist_id: playlist_id.clone(),
            channel_index,
            timestamp: Utc::now(),
        };
        self.save_json(KEY_LAST_CHANNEL, &last)
    }

    pub fn load_last_channel(&self) -> Option<LastChannel> {
        self.load_json(KEY_LAST_CHANNEL)
    }

    pub fn save_settings(&mut self, settings: &PlayerConfig) -> Result<()> {
        self.save_json(KEY_SETTINGS, settings)
    }

    pub fn load_settings(&self) -> Option<PlayerConfig> {
        self.load_json(KEY_SETTINGS)
    }

    pub fn is_first_run(&self) -> bool {
        self.store.get(KEY_FIRST_TIME).is_none()
    }

    pub fn mark_not_first_run(&mut self) -> Result<()> {
        self.store.set(KEY_FIRST_TIME, "false".to_string())
    }

    /// Remove every key this library owns
    pub fn clear(&mut self) -> Result<()> {
        for key in ALL_KEYS {
            self.store.delete(key)?;
        }
        info!("Library cleared");
        Ok(())
    }

    fn save_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, json)
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Failed to load stored value");
                None
            }
        }
    }
}
