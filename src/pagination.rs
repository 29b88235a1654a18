/// Events and subscriptions are listed five at a time.
pub const PAGE_SIZE: i64 = 5;

/// Maps a 1-based page number to an `(offset, limit)` window. Page 0 is
/// clamped to the first page; an empty window result is a normal outcome,
/// not an error. Absurdly large page numbers saturate to an offset past
/// any real data instead of overflowing.
pub fn page_window(page: i64) -> (i64, i64) {
    let page = page.max(1);
    ((page - 1).saturating_mul(PAGE_SIZE), PAGE_SIZE)
}
