//! Pagination types and utilities for consistent pagination across all endpoints

use database_layer::Query;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{ApiResponse, PaginationInfo, ResponseMetadata};

/// Standard pagination parameters for list endpoints
#[derive(Debug, Deserialize, IntoParams, Clone, Default)]
pub struct PaginationParams {
    #[param(example = 1, minimum = 1)]
    pub page: Option<u32>,

    #[param(example = 20, minimum = 1, maximum = 100)]
    pub page_size: Option<u32>,
}

impl PaginationParams {
    /// Get the page number (defaults to 1, minimum 1)
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get the page size (defaults to 20, clamped between 1 and 100)
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.page_size())
    }

    /// Applies limit and offset to a store query.
    pub fn apply(&self, query: Query) -> Query {
        query.limit(u64::from(self.page_size())).offset(self.offset())
    }

    /// Calculate total pages given a total count
    pub fn total_pages(&self, total_count: u64) -> u32 {
        if total_count == 0 {
            return 1;
        }
        let pages = total_count.div_ceil(u64::from(self.page_size()));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Create response metadata with pagination info
    pub fn to_metadata(&self, total_count: u64) -> ResponseMetadata {
        let total_pages = self.total_pages(total_count);

        ResponseMetadata {
            pagination: Some(PaginationInfo {
                page: self.page(),
                page_size: self.page_size(),
                total_pages,
                has_next: self.page() < total_pages,
                has_previous: self.page() > 1,
            }),
            total_count: Some(total_count),
        }
    }

    /// Wrap data with pagination metadata
    pub fn wrap_response<T>(&self, data: T, total_count: u64) -> ApiResponse<T> {
        crate::error::api_success_with_meta(data, self.to_metadata(total_count))
    }
}
