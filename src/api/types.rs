//! Response envelopes of the appointment backend.

use serde::{Deserialize, Serialize};

use crate::models::Appointment;

/// Page of `GET /clients/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPage {
    #[serde(default)]
    pub clients: Vec<Appointment>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u32,
}

impl ClientPage {
    /// True when `page` (1-based) is the last one reported.
    pub fn is_last(&self, page: u32) -> bool {
        page >= self.pagination.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_envelope() {
        let page: ClientPage = serde_json::from_str(
            r#"{
                "clients": [{
                    "uuid": "a1", "name": "Anna", "lastname": "Nowak",
                    "telephone": "600700800", "title": "Visit",
                    "time_from": "2024-01-01T09:00:00", "time_to": "2024-01-01T10:00:00"
                }],
                "pagination": {"total": 1, "total_pages": 1}
            }"#,
        )
        .unwrap();
        assert_eq!(page.clients.len(), 1);
        assert_eq!(page.pagination.total, 1);
        assert!(page.is_last(1));
    }

    #[test]
    fn missing_pagination_means_single_page() {
        let page: ClientPage = serde_json::from_str(r#"{"clients": []}"#).unwrap();
        assert!(page.is_last(1));
    }
}
