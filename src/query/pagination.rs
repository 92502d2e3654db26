use crate::query::QueryError;

pub const MIN_PAGE: u64 = 1;
pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MIN_PAGE_SIZE: u64 = 1;
pub const MAX_PAGE_SIZE: u64 = 100;

/// A requested page, as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    pub fn window(&self) -> Result<PageWindow, QueryError> {
        paginate(self.page, self.page_size)
    }
}

/// The slice of a result set a page maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64
}

/// Maps a 1-based page of `page_size` records onto an offset and limit.
///
/// `page` must be at least 1 and `page_size` within `1..=100`; anything else is
/// rejected before the store is consulted.
pub fn paginate(page: u64, page_size: u64) -> Result<PageWindow, QueryError> {
    if page < MIN_PAGE {
        return Err(QueryError::invalid("page", format!("must be at least {MIN_PAGE}, got {page}")));
    }

    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(QueryError::invalid(
            "page_size",
            format!("must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}, got {page_size}")
        ));
    }

    let offset = (page - 1).checked_mul(page_size)
        .ok_or_else(|| QueryError::invalid("page", format!("{page} is too large")))?;

    Ok(PageWindow {
        offset,
        limit: page_size
    })
}
