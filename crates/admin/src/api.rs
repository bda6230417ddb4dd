//! JSON response envelope and pagination shared by every API route.
//!
//! Every endpoint answers with
//! `{"success": bool, "data"?: T, "error"?: string, "message"?: string}`.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Uniform response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// Successful response with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
        }
    }

    /// Failed response.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }
}

/// Result type returned by JSON handlers.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// `?page=&limit=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    /// Page number, 1-based. Values below 1 become 1.
    #[must_use]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

/// Pagination block returned alongside list data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Build the block for `params` over `total` rows.
    #[must_use]
    pub fn new(params: PageParams, total: i64) -> Self {
        let page = params.page();
        let limit = params.limit();
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
            has_next: page.saturating_mul(limit) < total,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_omits_empty_fields() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": [1, 2]}));

        let json = serde_json::to_value(ApiResponse::failure("nope")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "nope"}));

        let json = serde_json::to_value(ApiResponse::ok(1).with_message("saved")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "data": 1, "message": "saved"})
        );
    }

    #[test]
    fn test_page_params_defaults_and_clamping() {
        let params = PageParams::default();
        assert_eq!((params.page(), params.limit(), params.offset()), (1, 10, 0));

        let params = PageParams {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!((params.page(), params.limit()), (1, MAX_PAGE_SIZE));

        let params = PageParams {
            page: Some(3),
            limit: Some(20),
        };
        assert_eq!(params.offset(), 40);
    }

    #[test]
    fn test_pagination_flags() {
        let params = PageParams {
            page: Some(2),
            limit: Some(10),
        };
        let pagination = Pagination::new(params, 25);
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next);
        assert!(pagination.has_prev);

        let last = Pagination::new(
            PageParams {
                page: Some(3),
                limit: Some(10),
            },
            25,
        );
        assert!(!last.has_next);

        let far = Pagination::new(
            PageParams {
                page: Some(i64::MAX),
                limit: Some(10),
            },
            5,
        );
        assert!(!far.has_next);
        assert!(far.has_prev);
        assert_eq!(far.total_pages, 1);

        let empty = Pagination::new(PageParams::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }
}
