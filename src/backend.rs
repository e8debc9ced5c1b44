//! Backend collaborator contracts consumed by the list screens.
//!
//! [`crate::client::ApiClient`] implements these over HTTP; tests implement
//! them in memory. Any call may resolve to [`ClientError::Unauthorized`],
//! which screens treat differently from every other failure.

use std::future::Future;
use std::sync::Arc;

use crate::error::ClientError;
use crate::model::{Incident, Priority, Status, User};
use crate::pagination::PageSource;
use crate::role_gate::Role;

/// Incident queries and staff mutations.
pub trait IncidentBackend: Send + Sync {
    fn fetch_incidents_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<Incident>, ClientError>> + Send;

    fn update_incident_status(
        &self,
        id: i64,
        status: Status,
    ) -> impl Future<Output = Result<Incident, ClientError>> + Send;

    fn update_incident_priority(
        &self,
        id: i64,
        priority: Priority,
    ) -> impl Future<Output = Result<Incident, ClientError>> + Send;

    fn delete_incident(&self, id: i64) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// User-account queries and admin mutations.
pub trait UserBackend: Send + Sync {
    fn fetch_users_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<User>, ClientError>> + Send;

    fn update_user_role(
        &self,
        id: i64,
        role: Role,
    ) -> impl Future<Output = Result<User, ClientError>> + Send;

    fn delete_user(&self, id: i64) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// Pages of incidents from an [`IncidentBackend`].
pub struct IncidentPages<B>(pub Arc<B>);

impl<B: IncidentBackend> PageSource for IncidentPages<B> {
    type Item = Incident;

    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<Incident>, ClientError>> + Send {
        self.0.fetch_incidents_page(page, page_size)
    }
}

/// Pages of users from a [`UserBackend`].
pub struct UserPages<B>(pub Arc<B>);

impl<B: UserBackend> PageSource for UserPages<B> {
    type Item = User;

    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<User>, ClientError>> + Send {
        self.0.fetch_users_page(page, page_size)
    }
}
