//! Staff incident list: paginated incidents, search/filter state, and the
//! status/priority/delete actions.

use std::sync::Arc;

use tracing::warn;

use crate::backend::{IncidentBackend, IncidentPages};
use crate::error::ClientError;
use crate::filter::{FilterState, FilteredIncidentsView};
use crate::model::{Incident, Priority, Status};
use crate::pagination::{ListSnapshot, LoadOutcome, PaginationController};
use crate::screen_state::{ScreenState, StateHolder, StateSubscriber};

/// State owner for the incident list screen.
pub struct IncidentListScreen<B: IncidentBackend> {
    backend: Arc<B>,
    pages: PaginationController<IncidentPages<B>>,
    filters: StateHolder<FilterState>,
}

impl<B: IncidentBackend> IncidentListScreen<B> {
    pub fn new(backend: Arc<B>, page_size: u32) -> Self {
        let pages = PaginationController::new(IncidentPages(Arc::clone(&backend)), page_size);
        Self {
            backend,
            pages,
            filters: StateHolder::new(FilterState::default()),
        }
    }

    pub async fn load_initial(&self) -> LoadOutcome {
        self.pages.load_initial().await
    }

    pub async fn load_more(&self) -> LoadOutcome {
        self.pages.load_more().await
    }

    /// Request pages until the backend reports no more, a request fails, or
    /// the screen is disposed. Returns the last outcome.
    pub async fn load_all(&self) -> LoadOutcome {
        let mut outcome = self.pages.load_initial().await;
        while matches!(outcome, LoadOutcome::Loaded { .. }) && self.pages.snapshot().has_more {
            outcome = self.pages.load_more().await;
        }
        outcome
    }

    pub fn state(&self) -> ScreenState {
        self.pages.snapshot().state
    }

    pub fn list(&self) -> ListSnapshot<Incident> {
        self.pages.snapshot()
    }

    pub fn subscribe_list(&self) -> StateSubscriber<ListSnapshot<Incident>> {
        self.pages.subscribe()
    }

    pub fn subscribe_filters(&self) -> StateSubscriber<FilterState> {
        self.filters.subscribe()
    }

    pub fn filters(&self) -> FilterState {
        self.filters.snapshot()
    }

    /// Edit the filter state in place. Subscribers are woken only if it changed.
    pub fn update_filters<F>(&self, edit: F)
    where
        F: FnOnce(&mut FilterState),
    {
        self.filters.update(|filters| {
            let before = filters.clone();
            edit(filters);
            *filters != before
        });
    }

    pub fn set_search(&self, text: impl Into<String>) {
        let text = text.into();
        self.update_filters(|f| f.search = text);
    }

    pub fn toggle_priority(&self, value: &str) {
        self.update_filters(|f| {
            f.toggle_priority(value);
        });
    }

    pub fn toggle_status(&self, value: &str) {
        self.update_filters(|f| {
            f.toggle_status(value);
        });
    }

    pub fn toggle_category(&self, value: &str) {
        self.update_filters(|f| {
            f.toggle_category(value);
        });
    }

    pub fn clear_filters(&self) {
        self.update_filters(FilterState::clear);
    }

    /// What the list renders right now.
    pub fn view(&self) -> FilteredIncidentsView {
        let list = self.pages.snapshot();
        let filters = self.filters.snapshot();
        FilteredIncidentsView::compute(&list.items, &filters, list.has_more)
    }

    pub async fn change_status(&self, id: i64, status: Status) -> Result<(), ClientError> {
        match self.backend.update_incident_status(id, status).await {
            Ok(updated) => {
                self.pages.upsert(updated);
                Ok(())
            }
            Err(err) => Err(self.mutation_failed(id, "change status", err)),
        }
    }

    pub async fn change_priority(&self, id: i64, priority: Priority) -> Result<(), ClientError> {
        match self.backend.update_incident_priority(id, priority).await {
            Ok(updated) => {
                self.pages.upsert(updated);
                Ok(())
            }
            Err(err) => Err(self.mutation_failed(id, "change priority", err)),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        match self.backend.delete_incident(id).await {
            Ok(()) => {
                self.pages.remove(id);
                Ok(())
            }
            Err(err) => Err(self.mutation_failed(id, "delete", err)),
        }
    }

    /// Tear down: cancel any outstanding fetch and stop applying results.
    pub fn dispose(&self) {
        self.pages.dispose();
    }

    /// Cached data is left alone; only a rejected session changes the screen.
    fn mutation_failed(&self, id: i64, action: &str, err: ClientError) -> ClientError {
        if err.is_unauthorized() {
            self.pages.mark_unauthorized();
        }
        warn!(id, action, error = %err, "Incident mutation failed");
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, GeoPoint};
    use chrono::Utc;
    use std::sync::Mutex;

    fn incident(id: i64, category: Category, priority: Priority) -> Incident {
        let now = Utc::now();
        Incident {
            id,
            category,
            description: format!("incident {id}"),
            priority,
            status: Status::Reported,
            location: GeoPoint {
                latitude: 45.8,
                longitude: 15.9,
            },
            image_urls: vec![],
            created_at: now,
            updated_at: now,
            completed_at: None,
            due_at: None,
            anonymous: false,
            reporter_id: None,
        }
    }

    /// In-memory backend holding a fixed incident table.
    struct MemoryBackend {
        incidents: Mutex<Vec<Incident>>,
        fail_mutations_with: Mutex<Option<ClientError>>,
    }

    impl MemoryBackend {
        fn new(incidents: Vec<Incident>) -> Arc<Self> {
            Arc::new(Self {
                incidents: Mutex::new(incidents),
                fail_mutations_with: Mutex::new(None),
            })
        }

        fn fail_with(&self, err: ClientError) {
            *self.fail_mutations_with.lock().unwrap() = Some(err);
        }

        fn mutate(&self, id: i64, edit: impl FnOnce(&mut Incident)) -> Result<Incident, ClientError> {
            if let Some(err) = self.fail_mutations_with.lock().unwrap().clone() {
                return Err(err);
            }
            let mut incidents = self.incidents.lock().unwrap();
            let incident = incidents
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| ClientError::Unknown("404".into()))?;
            edit(incident);
            Ok(incident.clone())
        }
    }

    impl IncidentBackend for MemoryBackend {
        async fn fetch_incidents_page(
            &self,
            page: u32,
            page_size: u32,
        ) -> Result<Vec<Incident>, ClientError> {
            let incidents = self.incidents.lock().unwrap();
            Ok(incidents
                .iter()
                .skip((page * page_size) as usize)
                .take(page_size as usize)
                .cloned()
                .collect())
        }

        async fn update_incident_status(&self, id: i64, status: Status) -> Result<Incident, ClientError> {
            self.mutate(id, |i| i.status = status)
        }

        async fn update_incident_priority(
            &self,
            id: i64,
            priority: Priority,
        ) -> Result<Incident, ClientError> {
            self.mutate(id, |i| i.priority = priority)
        }

        async fn delete_incident(&self, id: i64) -> Result<(), ClientError> {
            if let Some(err) = self.fail_mutations_with.lock().unwrap().clone() {
                return Err(err);
            }
            self.incidents.lock().unwrap().retain(|i| i.id != id);
            Ok(())
        }
    }

    fn table() -> Vec<Incident> {
        (1..=5)
            .map(|id| {
                let category = if id % 2 == 0 { Category::Traffic } else { Category::Crime };
                let priority = if id == 3 { Priority::Critical } else { Priority::Low };
                incident(id, category, priority)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_load_all_walks_every_page() {
        let screen = IncidentListScreen::new(MemoryBackend::new(table()), 2);

        let outcome = screen.load_all().await;

        assert!(matches!(outcome, LoadOutcome::Loaded { page: 2, received: 1, .. }));
        let view = screen.view();
        assert_eq!(view.total_known, 5);
        assert!(!view.has_more);
        assert!(!view.has_active_filters);
    }

    #[tokio::test]
    async fn test_view_follows_filters() {
        let screen = IncidentListScreen::new(MemoryBackend::new(table()), 10);
        screen.load_initial().await;

        screen.toggle_category("traffic");
        let ids: Vec<i64> = screen.view().incidents.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 4]);

        screen.clear_filters();
        screen.set_search("critical");
        let ids: Vec<i64> = screen.view().incidents.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3]);
        assert!(screen.view().has_active_filters);
    }

    #[tokio::test]
    async fn test_mutations_update_cached_list() {
        let screen = IncidentListScreen::new(MemoryBackend::new(table()), 10);
        screen.load_initial().await;

        screen.change_status(1, Status::Resolved).await.unwrap();
        screen.change_priority(2, Priority::High).await.unwrap();
        screen.delete(5).await.unwrap();

        let list = screen.list();
        assert_eq!(list.items.len(), 4);
        assert_eq!(list.items[0].status, Status::Resolved);
        assert_eq!(list.items[1].priority, Priority::High);
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_data() {
        let backend = MemoryBackend::new(table());
        let screen = IncidentListScreen::new(Arc::clone(&backend), 10);
        screen.load_initial().await;
        let before = screen.list();

        backend.fail_with(ClientError::Network("timeout".into()));
        let err = screen.delete(1).await.unwrap_err();

        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(screen.list(), before);
        assert_eq!(screen.state(), ScreenState::Loaded);
    }

    #[tokio::test]
    async fn test_rejected_mutation_forces_unauthorized() {
        let backend = MemoryBackend::new(table());
        let screen = IncidentListScreen::new(Arc::clone(&backend), 10);
        screen.load_initial().await;

        backend.fail_with(ClientError::Unauthorized);
        let err = screen.change_status(1, Status::InProgress).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(screen.state(), ScreenState::Unauthorized);
        assert_eq!(screen.load_initial().await, LoadOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_filter_subscribers_only_see_real_changes() {
        let screen = IncidentListScreen::new(MemoryBackend::new(table()), 10);
        let mut filters = screen.subscribe_filters();

        screen.set_search("");
        screen.set_search("bins");

        let seen = filters.changed().await.unwrap();
        assert_eq!(seen.search, "bins");
    }
}
