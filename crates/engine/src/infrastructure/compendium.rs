//! JSON-file backed monster compendium.

use std::collections::HashMap;
use std::path::Path;

use combatdesk_domain::{MonsterId, MonsterTemplate};

use crate::infrastructure::persistence::PersistenceError;
use crate::infrastructure::ports::CompendiumPort;

/// Monster templates loaded once at startup.
#[derive(Debug, Default)]
pub struct JsonCompendium {
    monsters: HashMap<MonsterId, MonsterTemplate>,
}

impl JsonCompendium {
    pub fn from_monsters(monsters: impl IntoIterator<Item = MonsterTemplate>) -> Self {
        Self {
            monsters: monsters.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    /// Load a JSON array of templates. No path, or a path that does not
    /// exist, gives an empty compendium.
    pub async fn load(path: Option<&Path>) -> Result<Self, PersistenceError> {
        let Some(path) = path else {
            tracing::info!("No compendium configured, monster adds will fail");
            return Ok(Self::default());
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Compendium file not found, starting empty");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let monsters: Vec<MonsterTemplate> = serde_json::from_slice(&bytes)?;
        tracing::info!(path = %path.display(), count = monsters.len(), "Loaded compendium");
        Ok(Self::from_monsters(monsters))
    }

    pub fn len(&self) -> usize {
        self.monsters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monsters.is_empty()
    }
}

impl CompendiumPort for JsonCompendium {
    fn monster(&self, id: MonsterId) -> Option<MonsterTemplate> {
        self.monsters.get(&id).cloned()
    }

    fn list(&self) -> Vec<MonsterTemplate> {
        let mut monsters: Vec<MonsterTemplate> = self.monsters.values().cloned().collect();
        monsters.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        monsters
    }
}
