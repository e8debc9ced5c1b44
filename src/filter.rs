//! Incident search and filtering.
//!
//! Filtering is a pure function over the known incidents and a
//! [`FilterState`]. It never re-sorts: incidents come out in the order the
//! pages were fetched.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::Incident;

/// Search text plus the selected priority, status and category values.
///
/// An empty set places no constraint on its field. Values are compared
/// case-insensitively against the incident's labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub search: String,
    pub priorities: BTreeSet<String>,
    pub statuses: BTreeSet<String>,
    pub categories: BTreeSet<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_priorities<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priorities = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_statuses<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_categories<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = values.into_iter().map(Into::into).collect();
        self
    }

    /// Flip membership of a priority chip. Returns the new membership.
    pub fn toggle_priority(&mut self, value: &str) -> bool {
        toggle(&mut self.priorities, value)
    }

    pub fn toggle_status(&mut self, value: &str) -> bool {
        toggle(&mut self.statuses, value)
    }

    pub fn toggle_category(&mut self, value: &str) -> bool {
        toggle(&mut self.categories, value)
    }

    /// Reset every field to "no constraint".
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when the search text or any of the three sets narrows the list.
    pub fn has_active_filters(&self) -> bool {
        !self.query().is_empty()
            || !self.priorities.is_empty()
            || !self.statuses.is_empty()
            || !self.categories.is_empty()
    }

    fn query(&self) -> &str {
        self.search.trim()
    }

    /// Whether a single incident passes all four predicates.
    pub fn matches(&self, incident: &Incident) -> bool {
        self.matches_search(incident)
            && set_matches(&self.priorities, |v| incident.priority.matches_label(v))
            && set_matches(&self.statuses, |v| incident.status.matches_label(v))
            && set_matches(&self.categories, |v| incident.category.matches_label(v))
    }

    fn matches_search(&self, incident: &Incident) -> bool {
        let query = self.query();
        if query.is_empty() {
            return true;
        }
        let needle = query.to_lowercase();

        // Alias labels count too, so "normal" finds MEDIUM incidents.
        [
            incident.category.label(),
            incident.description.as_str(),
            incident.priority.label(),
            incident.status.label(),
        ]
        .into_iter()
        .chain(incident.priority.aliases().iter().copied())
        .chain(incident.status.aliases().iter().copied())
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

fn toggle(set: &mut BTreeSet<String>, value: &str) -> bool {
    let existing = set.iter().find(|v| v.eq_ignore_ascii_case(value)).cloned();
    match existing {
        Some(v) => {
            set.remove(&v);
            false
        }
        None => {
            set.insert(value.to_string());
            true
        }
    }
}

fn set_matches(set: &BTreeSet<String>, field_matches: impl Fn(&str) -> bool) -> bool {
    set.is_empty() || set.iter().any(|v| field_matches(v.as_str()))
}

/// Stable filter: keep every incident that passes `state`, in input order.
pub fn filter_incidents<'a>(incidents: &'a [Incident], state: &FilterState) -> Vec<&'a Incident> {
    incidents.iter().filter(|i| state.matches(i)).collect()
}

/// What the incident list UI renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredIncidentsView {
    /// Incidents passing the current filters, in fetch order.
    pub incidents: Vec<Incident>,

    /// Number of incidents known to the client before filtering.
    pub total_known: usize,

    pub has_active_filters: bool,

    /// Whether more pages can be requested from the backend.
    pub has_more: bool,
}

impl FilteredIncidentsView {
    pub fn compute(incidents: &[Incident], state: &FilterState, has_more: bool) -> Self {
        Self {
            incidents: filter_incidents(incidents, state).into_iter().cloned().collect(),
            total_known: incidents.len(),
            has_active_filters: state.has_active_filters(),
            has_more,
        }
    }

    pub fn visible_count(&self) -> usize {
        self.incidents.len()
    }
}
