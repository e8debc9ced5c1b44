//! Civicwatch - headless client core for an incident-reporting service.
//!
//! # Overview
//!
//! Citizens report incidents (crime, environment, communal, traffic) with a
//! location and photos; staff browse, filter and manage them, and admins
//! manage user accounts. This crate is everything behind the screens: the
//! filter engine, paginated list synchronization, role-gated navigation and
//! the REST client. A UI binds to the published snapshots and renders them.
//!
//! # Modules
//!
//! - [`model`]: Incidents, users and the enumerated labels
//! - [`filter`]: Search/filter state and the [`filter::FilteredIncidentsView`]
//! - [`pagination`]: Page-by-page loading with de-duplication and cancellation
//! - [`screen_state`]: The shared Idle/Loading/Loaded/Error/Unauthorized machine
//! - [`role_gate`]: Which navigation entries a role may see
//! - [`session`]: Bearer token and the role carried in it
//! - [`backend`]: Collaborator traits the screens depend on
//! - [`client`]: HTTP implementation of those traits
//! - [`incident_list`], [`user_list`]: Screen state owners
//! - [`config`]: Environment configuration

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod incident_list;
pub mod model;
pub mod pagination;
pub mod role_gate;
pub mod screen_state;
pub mod session;
pub mod user_list;
