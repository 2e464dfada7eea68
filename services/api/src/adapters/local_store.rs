//! services/api/src/adapters/local_store.rs
//!
//! This module contains the storage adapter, which is the concrete implementation
//! of the `StorageService` port from the `core` crate. It keeps two JSON records
//! in a key-value backend: the session user and the joke library.

use crate::adapters::kv_backend::KeyValueBackend;
use aussie_joke_core::domain::{Joke, SlangTerm, User, VocabularyWord};
use aussie_joke_core::ports::{PortError, PortResult, StorageService};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Key of the single session user record.
pub const USER_KEY: &str = "aussie_joke_user";
/// Key of the joke library, a map from joke id to the full joke.
pub const LIBRARY_KEY: &str = "aussie_joke_library";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A storage adapter that implements the `StorageService` port.
pub struct LocalStorageAdapter {
    backend: Box<dyn KeyValueBackend>,
}

impl LocalStorageAdapter {
    /// Creates a new `LocalStorageAdapter`.
    pub fn new(backend: impl KeyValueBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Reads and decodes the record under `key`.
    ///
    /// A record that does not decode is logged and treated as absent.
    fn read_record<T: DeserializeOwned>(&self, key: &str) -> PortResult<Option<T>> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Ignoring malformed record under '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    fn write_record<T: Serialize>(&self, key: &str, record: &T) -> PortResult<()> {
        let raw = serde_json::to_string(record).map_err(|e| PortError::Storage(e.to_string()))?;
        self.backend.put(key, &raw)
    }

    fn read_library(&self) -> PortResult<BTreeMap<String, JokeRecord>> {
        Ok(self.read_record(LIBRARY_KEY)?.unwrap_or_default())
    }
}

//=========================================================================================
// "Impure" Storage Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize)]
struct UserRecord {
    username: String,
    favorites: Vec<String>,
}
impl UserRecord {
    fn from_domain(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            favorites: user.favorites.clone(),
        }
    }

    fn to_domain(self) -> User {
        // Collapse duplicate ids, keeping the first occurrence.
        let mut favorites: Vec<String> = Vec::with_capacity(self.favorites.len());
        for id in self.favorites {
            if !favorites.contains(&id) {
                favorites.push(id);
            }
        }
        User {
            username: self.username,
            favorites,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SlangRecord {
    term: String,
    definition: String,
}

#[derive(Serialize, Deserialize)]
struct VocabularyRecord {
    word: String,
    definition: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JokeRecord {
    id: String,
    content: String,
    punchline: String,
    why_its_funny: String,
    contains_wordplay: bool,
    contains_slang: bool,
    slang: Vec<SlangRecord>,
    vocabulary: Vec<VocabularyRecord>,
    category: String,
    /// Unix epoch milliseconds.
    created_at: i64,
}
impl JokeRecord {
    fn from_domain(joke: &Joke) -> Self {
        Self {
            id: joke.id.clone(),
            content: joke.content.clone(),
            punchline: joke.punchline.clone(),
            why_its_funny: joke.why_its_funny.clone(),
            contains_wordplay: joke.contains_wordplay,
            contains_slang: joke.contains_slang,
            slang: joke
                .slang
                .iter()
                .map(|s| SlangRecord {
                    term: s.term.clone(),
                    definition: s.definition.clone(),
                })
                .collect(),
            vocabulary: joke
                .vocabulary
                .iter()
                .map(|v| VocabularyRecord {
                    word: v.word.clone(),
                    definition: v.definition.clone(),
                })
                .collect(),
            category: joke.category.clone(),
            created_at: joke.created_at.timestamp_millis(),
        }
    }

    fn to_domain(self) -> Joke {
        let created_at = DateTime::<Utc>::from_timestamp_millis(self.created_at).unwrap_or_else(|| {
            warn!("Joke {} has an out-of-range timestamp", self.id);
            DateTime::<Utc>::default()
        });
        Joke {
            id: self.id,
            content: self.content,
            punchline: self.punchline,
            why_its_funny: self.why_its_funny,
            contains_wordplay: self.contains_wordplay,
            contains_slang: self.contains_slang,
            slang: self
                .slang
                .into_iter()
                .map(|s| SlangTerm {
                    term: s.term,
                    definition: s.definition,
                })
                .collect(),
            vocabulary: self
                .vocabulary
                .into_iter()
                .map(|v| VocabularyWord {
                    word: v.word,
                    definition: v.definition,
                })
                .collect(),
            category: self.category,
            created_at,
        }
    }
}

//=========================================================================================
// `StorageService` Trait Implementation
//=========================================================================================

impl StorageService for LocalStorageAdapter {
    fn login(&self, username: &str) -> PortResult<User> {
        if let Some(existing) = self.current_user()? {
            if existing.username == username {
                debug!("Re-entering existing session for '{}'", username);
                return Ok(existing);
            }
            info!(
                "Replacing stored session of '{}' with '{}'",
                existing.username, username
            );
        }

        let user = User::new(username);
        self.write_record(USER_KEY, &UserRecord::from_domain(&user))?;
        Ok(user)
    }

    fn current_user(&self) -> PortResult<Option<User>> {
        Ok(self
            .read_record::<UserRecord>(USER_KEY)?
            .map(UserRecord::to_domain))
    }

    fn logout(&self) -> PortResult<()> {
        self.backend.delete(USER_KEY)
    }

    fn toggle_favorite(&self, joke: &Joke) -> PortResult<User> {
        let mut user = self.current_user()?.ok_or(PortError::NoSession)?;

        // The library is written first so every favorited id has an entry.
        let mut library = self.read_library()?;
        library.insert(joke.id.clone(), JokeRecord::from_domain(joke));
        self.write_record(LIBRARY_KEY, &library)?;

        user.toggle_favorite(&joke.id);
        self.write_record(USER_KEY, &UserRecord::from_domain(&user))?;
        Ok(user)
    }

    fn favorites(&self) -> PortResult<Vec<Joke>> {
        let Some(user) = self.current_user()? else {
            return Ok(Vec::new());
        };
        let Some(mut library) = self.read_record::<BTreeMap<String, JokeRecord>>(LIBRARY_KEY)? else {
            return Ok(Vec::new());
        };

        Ok(user
            .favorites
            .iter()
            .filter_map(|id| {
                let record = library.remove(id);
                if record.is_none() {
                    warn!("Favorite {} has no library entry, skipping it", id);
                }
                record
            })
            .map(JokeRecord::to_domain)
            .collect())
    }
}
