//! Admin user-management list. Same paging contract as the incident list.

use std::sync::Arc;

use tracing::warn;

use crate::backend::{UserBackend, UserPages};
use crate::error::ClientError;
use crate::model::User;
use crate::pagination::{ListSnapshot, LoadOutcome, PaginationController};
use crate::role_gate::Role;
use crate::screen_state::{ScreenState, StateSubscriber};

/// State owner for the user management screen.
pub struct UserListScreen<B: UserBackend> {
    backend: Arc<B>,
    pages: PaginationController<UserPages<B>>,
}

impl<B: UserBackend> UserListScreen<B> {
    pub fn new(backend: Arc<B>, page_size: u32) -> Self {
        let pages = PaginationController::new(UserPages(Arc::clone(&backend)), page_size);
        Self { backend, pages }
    }

    pub async fn load_initial(&self) -> LoadOutcome {
        self.pages.load_initial().await
    }

    pub async fn load_more(&self) -> LoadOutcome {
        self.pages.load_more().await
    }

    pub fn state(&self) -> ScreenState {
        self.pages.snapshot().state
    }

    pub fn list(&self) -> ListSnapshot<User> {
        self.pages.snapshot()
    }

    pub fn subscribe(&self) -> StateSubscriber<ListSnapshot<User>> {
        self.pages.subscribe()
    }

    pub async fn change_role(&self, id: i64, role: Role) -> Result<(), ClientError> {
        match self.backend.update_user_role(id, role).await {
            Ok(updated) => {
                self.pages.upsert(updated);
                Ok(())
            }
            Err(err) => Err(self.mutation_failed(id, "change role", err)),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        match self.backend.delete_user(id).await {
            Ok(()) => {
                self.pages.remove(id);
                Ok(())
            }
            Err(err) => Err(self.mutation_failed(id, "delete", err)),
        }
    }

    pub fn dispose(&self) {
        self.pages.dispose();
    }

    fn mutation_failed(&self, id: i64, action: &str, err: ClientError) -> ClientError {
        if err.is_unauthorized() {
            self.pages.mark_unauthorized();
        }
        warn!(id, action, error = %err, "User mutation failed");
        err
    }
}
