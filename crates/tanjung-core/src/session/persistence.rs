//! Persistence adapters for the session store.
//!
//! State is stored as two entries, the chat collection and the active chat id,
//! both plain JSON/text with no versioning.

use super::model::{Chat, SessionState};
use crate::errors::StoreError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

pub const CHATS_ENTRY: &str = "chats.json";
pub const ACTIVE_CHAT_ENTRY: &str = "active_chat";

pub trait Persistence {
    /// Invalid or missing data yields the bootstrap state.
    fn load(&self) -> SessionState;
    fn save(&self, state: &SessionState) -> Result<(), StoreError>;
}

/// Two files in a data directory.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    dir: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data dir>/tanjung`
    pub fn default_location() -> Result<Self, StoreError> {
        let dir = dirs::data_dir().ok_or(StoreError::NoDataDir)?;
        Ok(Self::new(dir.join("tanjung")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_chats(&self) -> Option<Vec<Chat>> {
        let path = self.dir.join(CHATS_ENTRY);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(chats) => Some(chats),
            Err(e) => {
                log::warn!("Ignoring unreadable chat history {}: {}", path.display(), e);
                None
            }
        }
    }

    fn read_active(&self) -> Option<String> {
        let content = fs::read_to_string(self.dir.join(ACTIVE_CHAT_ENTRY)).ok()?;
        let id = content.trim();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    }

    /// Writes to a sibling temp file and renames it over `entry`, so a
    /// reader never sees a half-written entry.
    fn write_entry(&self, entry: &str, contents: &[u8]) -> Result<(), StoreError> {
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(contents)?;
        file.as_file().sync_all()?;
        file.persist(self.dir.join(entry)).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Persistence for JsonFilePersistence {
    fn load(&self) -> SessionState {
        SessionState::rehydrate(self.read_chats().unwrap_or_default(), self.read_active())
    }

    fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        self.write_entry(CHATS_ENTRY, serde_json::to_string(&state.chats)?.as_bytes())?;
        self.write_entry(ACTIVE_CHAT_ENTRY, state.active_chat_id.as_bytes())?;
        Ok(())
    }
}

/// In-process storage; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    slot: Arc<Mutex<Option<SessionState>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SessionState) -> Self {
        let persistence = Self::default();
        *persistence.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(state);
        persistence
    }

    pub fn stored(&self) -> Option<SessionState> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> SessionState {
        match self.stored() {
            Some(state) => SessionState::rehydrate(state.chats, Some(state.active_chat_id)),
            None => SessionState::default(),
        }
    }

    fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::Message;

    fn sample_state() -> SessionState {
        let mut first = Chat::new("c1");
        first.messages = vec![
            Message::user("Apa itu React?", vec!["preview-1".to_string()]),
            Message::assistant("React adalah library UI."),
        ];
        first.title = Chat::derive_title(&first.messages);
        SessionState {
            chats: vec![Chat::bootstrap(), first, Chat::new("c2")],
            active_chat_id: "c1".to_string(),
        }
    }

    #[test]
    fn test_file_round_trip_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path().join("store"));
        let state = sample_state();

        persistence.save(&state).unwrap();
        assert_eq!(persistence.load(), state);
    }

    #[test]
    fn test_repeated_saves_leave_only_the_two_entries() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path());
        let mut state = sample_state();

        for i in 0..5 {
            state.chats.push(Chat::new(&format!("extra-{}", i)));
            persistence.save(&state).unwrap();
        }

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![ACTIVE_CHAT_ENTRY.to_string(), CHATS_ENTRY.to_string()]);
        assert_eq!(persistence.load(), state);
    }

    #[test]
    fn test_abandoned_temp_file_does_not_touch_saved_state() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path());
        let state = sample_state();
        persistence.save(&state).unwrap();

        // A write that died before its rename.
        let mut partial = NamedTempFile::new_in(dir.path()).unwrap();
        partial.write_all(b"[{\"id\":\"c1\",\"mess").unwrap();
        let (_file, _path) = partial.keep().unwrap();

        let loaded = persistence.load();
        assert_eq!(loaded.chats.len(), 3);
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_missing_files_give_default() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path());
        assert_eq!(persistence.load(), SessionState::default());
    }

    #[test]
    fn test_corrupt_chats_give_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CHATS_ENTRY), "{not json").unwrap();
        fs::write(dir.path().join(ACTIVE_CHAT_ENTRY), "c1").unwrap();

        let persistence = JsonFilePersistence::new(dir.path());
        assert_eq!(persistence.load(), SessionState::default());
    }

    #[test]
    fn test_reads_browser_style_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CHATS_ENTRY),
            r#"[{"id":"1700000000000","messages":[{"role":"user","text":"hai","images":[]},{"role":"ai","text":"halo","typing":false}],"title":"hai"}]"#,
        )
        .unwrap();
        fs::write(dir.path().join(ACTIVE_CHAT_ENTRY), "1700000000000").unwrap();

        let state = JsonFilePersistence::new(dir.path()).load();
        assert_eq!(state.active_chat_id, "1700000000000");
        assert_eq!(state.chats[0].messages.len(), 2);
        assert_eq!(state.chats[0].messages[1].typing, Some(false));
    }

    #[test]
    fn test_memory_persistence_shares_slot() {
        let persistence = MemoryPersistence::new();
        let handle = persistence.clone();
        persistence.save(&sample_state()).unwrap();
        assert_eq!(handle.stored(), Some(sample_state()));
        assert_eq!(handle.save_count(), 1);
    }
}
