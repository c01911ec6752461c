//! Query parameters and envelope shared by the paginated listings.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    config::AppConfig,
    dao::models::{PageRequest, SortDirection, SortField},
    error::ServiceError,
};

/// Query string accepted by list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number (default 1).
    pub page: Option<u64>,
    /// Items per page (default and maximum come from the configuration).
    pub page_size: Option<u64>,
    /// Column to order by; prefix with `-` for descending order.
    pub sort_by: Option<String>,
}

/// Totals attached to every page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PageInfo {
    pub total_pages: u64,
    pub total_items: u64,
}

impl PageInfo {
    /// Compute totals for `total_items` split in pages of `page_size`.
    pub fn new(total_items: u64, page_size: u64) -> Self {
        Self {
            total_pages: total_items.div_ceil(page_size.max(1)),
            total_items,
        }
    }
}

impl ListQuery {
    /// Validate the query and translate it into a storage page request.
    ///
    /// `sortable` maps the public column names to the storage fields they order by.
    pub fn to_page_request(
        &self,
        config: &AppConfig,
        sortable: &[(&str, SortField)],
    ) -> Result<PageRequest, ServiceError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ServiceError::InvalidInput("page must be at least 1".into()));
        }

        let page_size = self.page_size(config);
        if page_size == 0 || page_size > config.max_page_size {
            return Err(ServiceError::InvalidInput(format!(
                "page_size must be between 1 and {}",
                config.max_page_size
            )));
        }

        let request = PageRequest::new((page - 1).saturating_mul(page_size), page_size);
        let Some(sort_by) = self.sort_by.as_deref().filter(|value| !value.is_empty()) else {
            return Ok(request);
        };

        let (name, direction) = match sort_by.strip_prefix('-') {
            Some(name) => (name, SortDirection::Descending),
            None => (sort_by, SortDirection::Ascending),
        };
        let field = sortable
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, field)| *field)
            .ok_or_else(|| {
                let allowed: Vec<_> = sortable.iter().map(|(name, _)| *name).collect();
                ServiceError::InvalidInput(format!(
                    "sort_by must be one of {} (optionally prefixed with '-')",
                    allowed.join(", ")
                ))
            })?;

        Ok(request.sorted_by(field, direction))
    }

    /// Effective page size once defaults are applied.
    pub fn page_size(&self, config: &AppConfig) -> u64 {
        self.page_size.unwrap_or(config.default_page_size)
    }
}
