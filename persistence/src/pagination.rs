//! Offset pagination shared by every list query.

/// An offset/limit page request. Lists are always ordered oldest-first
/// (`created_at ASC`) so pagination is stable while a mission is still
/// appending rows.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    /// Maximum rows to return.
    pub limit: i64,
    /// Rows to skip before returning results.
    pub offset: i64,
}

impl Pagination {
    /// The default page: the first 50 rows.
    pub const DEFAULT: Self = Self { limit: 50, offset: 0 };

    /// Builds a page request, clamping `limit` to a sane maximum so a
    /// careless caller can't force a full table scan.
    #[must_use]
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit: limit.clamp(1, 500), offset: offset.max(0) }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::DEFAULT
    }
}
