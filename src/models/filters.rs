use serde::Serialize;

use super::enums::{Priority, SortBy};

/// Query string of `GET /clients/`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Client-side narrowing of an already fetched list.
#[derive(Debug, Clone, PartialEq)]
pub struct AgendaFilter {
    pub search: String,
    pub priority: Option<Priority>,
    pub sort: SortBy,
}

impl Default for AgendaFilter {
    fn default() -> Self {
        Self {
            search: String::new(),
            priority: None,
            sort: SortBy::Time,
        }
    }
}
