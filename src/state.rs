use std::sync::Arc;

use crate::auth::AuthGuard;
use crate::polls::PollManager;
use crate::store::PollStore;
use crate::votes::VoteLedger;

#[derive(Clone)]
pub struct AppState {
    pub polls: PollManager,
    pub votes: VoteLedger,
    pub auth: AuthGuard,
}

impl AppState {
    pub fn new(store: Arc<dyn PollStore>, auth: AuthGuard) -> Self {
        Self {
            polls: PollManager::new(store.clone()),
            votes: VoteLedger::new(store),
            auth,
        }
    }
}
