//! Offset/limit paging shared by the listing and message collections.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_LISTING_LIMIT: u32 = 20;
pub const DEFAULT_MESSAGE_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LISTING_LIMIT,
            offset: 0,
        }
    }
}

impl PageRequest {
    /// Parses raw query values. Unparsable values fall back to the defaults and the
    /// limit is clamped to `1..=MAX_LIMIT`.
    pub fn from_params(limit: Option<&str>, offset: Option<&str>, default_limit: u32) -> Self {
        let limit = limit
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(default_limit)
            .clamp(1, MAX_LIMIT);
        let offset = offset
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        Self { limit, offset }
    }
}

/// One page of results as reported by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching rows, when the store reports it.
    pub total: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
pub struct Pagination {
    pub total: Option<u64>,
    pub limit: u32,
    pub offset: u64,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: Option<u64>, request: PageRequest) -> Self {
        let has_more = total.is_some_and(|t| {
            request
                .offset
                .checked_add(u64::from(request.limit))
                .is_some_and(|end| end < t)
        });
        Self {
            total,
            limit: request.limit,
            offset: request.offset,
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_or_garbage_params() {
        let page = PageRequest::from_params(None, None, DEFAULT_LISTING_LIMIT);
        assert_eq!(page, PageRequest { limit: 20, offset: 0 });
        let page = PageRequest::from_params(Some("ten"), Some("-4"), DEFAULT_MESSAGE_LIMIT);
        assert_eq!(page, PageRequest { limit: 50, offset: 0 });
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(PageRequest::from_params(Some("0"), None, 20).limit, 1);
        assert_eq!(PageRequest::from_params(Some("5000"), None, 20).limit, MAX_LIMIT);
    }

    #[test]
    fn has_more_requires_known_total_beyond_window() {
        let req = PageRequest { limit: 20, offset: 0 };
        assert!(Pagination::new(Some(21), req).has_more);
        assert!(!Pagination::new(Some(20), req).has_more);
        assert!(!Pagination::new(None, req).has_more);

        let past_end = PageRequest { limit: 20, offset: 40 };
        assert!(!Pagination::new(Some(30), past_end).has_more);

        let huge = PageRequest::from_params(Some("100"), Some("18446744073709551615"), 20);
        assert_eq!(huge.offset, u64::MAX);
        assert!(!Pagination::new(Some(u64::MAX), huge).has_more);
    }

    #[test]
    fn serializes_has_more_in_camel_case() {
        let json = serde_json::to_value(Pagination::new(Some(3), PageRequest { limit: 2, offset: 0 })).unwrap();
        assert_eq!(json["hasMore"], serde_json::json!(true));
        assert_eq!(json["total"], serde_json::json!(3));
    }
}
