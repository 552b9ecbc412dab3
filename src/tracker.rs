//! Run-local record of which games are already ingested.

use anyhow::Result;
use std::collections::HashSet;
use tracing::info;

use crate::store::GameStore;

/// Game ids already persisted, plus those accepted earlier in this run.
///
/// Loaded fresh from the store at the start of every cycle and never written
/// back: the persisted rows themselves are the durable record.
#[derive(Debug, Default, Clone)]
pub struct IngestedGameSet {
    ids: HashSet<String>,
}

impl IngestedGameSet {
    pub async fn load(store: &dyn GameStore) -> Result<Self> {
        let ids = store.known_game_ids().await?;
        info!("Loaded {} known game id(s) from the store", ids.len());
        Ok(Self { ids })
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.ids.contains(game_id)
    }

    /// Record an accepted game. Returns false if it was already present.
    pub fn mark(&mut self, game_id: &str) -> bool {
        self.ids.insert(game_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
