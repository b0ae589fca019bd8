//! Page arithmetic for record listings

/// Records per page in list responses
pub const PAGE_SIZE: i64 = 100;

/// Where one page of a result set starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page actually served
    pub page: i64,
    pub total_pages: i64,
    /// Rows to skip (SQL `OFFSET`)
    pub offset: i64,
}

/// Clamp `requested_page` into range for `total_results` rows.
///
/// An empty result still serves page 1.
///
/// ```
/// use rnc_server::pagination::calculate_pagination;
///
/// let p = calculate_pagination(250, 99);
/// assert_eq!((p.page, p.total_pages, p.offset), (3, 3, 200));
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64) -> Pagination {
    let total_pages = if total_results <= 0 {
        0
    } else {
        (total_results - 1) / PAGE_SIZE + 1
    };
    let page = requested_page.clamp(1, total_pages.max(1));

    Pagination {
        page,
        total_pages,
        offset: (page - 1) * PAGE_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_page() {
        let p = calculate_pagination(250, 2);
        assert_eq!((p.page, p.total_pages, p.offset), (2, 3, 100));
    }

    #[test]
    fn test_page_clamped_both_ways() {
        assert_eq!(calculate_pagination(150, 0).page, 1);
        assert_eq!(calculate_pagination(150, -4).page, 1);
        assert_eq!(calculate_pagination(150, 7).page, 2);
    }

    #[test]
    fn test_empty_and_exact_boundary() {
        assert_eq!(
            calculate_pagination(0, 3),
            Pagination {
                page: 1,
                total_pages: 0,
                offset: 0
            }
        );
        assert_eq!(calculate_pagination(200, 2).total_pages, 2);
        assert_eq!(calculate_pagination(201, 3).offset, 200);
    }
}
