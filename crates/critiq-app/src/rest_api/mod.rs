use critiq_dal::{Batch, ListingParams};
use garde::Validate;
use serde::Serialize;

use crate::{error::ApiResult, state::AppState};

pub mod category;
pub mod comment;
pub mod genre;
pub mod review;
pub mod title;

// Fixed page size per resource kind.
pub const TITLES_PAGE_SIZE: u32 = 20;
pub const REVIEWS_PAGE_SIZE: u32 = 10;
pub const COMMENTS_PAGE_SIZE: u32 = 8;

#[derive(Debug, Clone, Validate, serde::Deserialize)]
#[garde(allow_unvalidated)]
pub struct Paging {
    page: Option<u32>,
    #[garde(length(max = 255))]
    pub search: Option<String>,
}

impl Paging {
    pub fn listing_params(&self, page_size: u32) -> ListingParams {
        let page = i64::from(self.page.unwrap_or(1).max(1));
        ListingParams::new((page - 1) * i64::from(page_size), i64::from(page_size))
    }
}

/// Listing envelope: total count plus absolute links to the neighbour
/// pages.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    count: u64,
    next: Option<String>,
    previous: Option<String>,
    results: Vec<T>,
}

fn page_bounds(offset: i64, total: u64, page_size: u32) -> (u64, u64) {
    let page = (offset as u64) / page_size as u64 + 1;
    let total_pages = total.div_ceil(page_size as u64).max(1);
    (page, total_pages)
}

/// Wrap a batch into the pagination envelope, building neighbour page
/// URLs from the current request URI.
pub fn paginate<T: Serialize>(
    state: &AppState,
    uri: &http::Uri,
    batch: Batch<T>,
    page_size: u32,
) -> ApiResult<Page<T>> {
    let (page, total_pages) = page_bounds(batch.offset, batch.total, page_size);
    let next = if page < total_pages {
        Some(page_url(state, uri, page + 1)?)
    } else {
        None
    };
    let previous = if page > 1 {
        Some(page_url(state, uri, page - 1)?)
    } else {
        None
    };
    Ok(Page {
        count: batch.total,
        next,
        previous,
        results: batch.rows,
    })
}

fn page_url(state: &AppState, uri: &http::Uri, page: u64) -> ApiResult<String> {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let mut url = state.build_url(path_and_query)?;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("page", &page.to_string());
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_params_offsets() {
        let paging = Paging {
            page: None,
            search: None,
        };
        let params = paging.listing_params(20);
        assert_eq!(params.offset, 0);
        assert_eq!(params.limit, 20);

        let paging = Paging {
            page: Some(3),
            search: None,
        };
        let params = paging.listing_params(10);
        assert_eq!(params.offset, 20);
        assert_eq!(params.limit, 10);

        // page 0 is treated as the first page
        let paging = Paging {
            page: Some(0),
            search: None,
        };
        let params = paging.listing_params(10);
        assert_eq!(params.offset, 0);

        // far-out pages must not wrap around
        let paging = Paging {
            page: Some(u32::MAX),
            search: None,
        };
        let params = paging.listing_params(20);
        assert_eq!(params.offset, (u32::MAX as i64 - 1) * 20);
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(0, 0, 10), (1, 1));
        assert_eq!(page_bounds(0, 25, 10), (1, 3));
        assert_eq!(page_bounds(10, 25, 10), (2, 3));
        assert_eq!(page_bounds(20, 25, 10), (3, 3));
        assert_eq!(page_bounds(0, 8, 8), (1, 1));
    }
}
