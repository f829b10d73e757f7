use serde::Serialize;

/// Hits requested per page.
pub const PAGE_SIZE: usize = 10;

/// Maximum number of page-number buttons in the pagination control.
pub const MAX_VISIBLE_PAGES: usize = 10;

/// Position of one page inside a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: usize,
    pub total: u64,
    /// 1-based index of the first hit shown; `0` when the page is empty.
    pub first: u64,
    /// 1-based index of the last hit shown; `0` when the page is empty.
    pub last: u64,
    pub num_pages: usize,
}

impl PageWindow {
    pub fn new(page: usize, total: u64) -> Self {
        let page = page.max(1);
        let size = PAGE_SIZE as u64;
        let offset = offset_for(page) as u64;
        let num_pages = total.div_ceil(size) as usize;
        let (first, last) = if offset < total {
            (offset + 1, (page as u64 * size).min(total))
        } else {
            (0, 0)
        };
        Self {
            page,
            total,
            first,
            last,
            num_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first == 0
    }
}

/// Result offset for a 1-based page number.
pub fn offset_for(page: usize) -> usize {
    page.max(1).saturating_sub(1).saturating_mul(PAGE_SIZE)
}

/// One element of the pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page", rename_all = "lowercase")]
pub enum PageControl {
    Previous(usize),
    Page { number: usize, current: bool },
    Gap,
    Next(usize),
}

/// Build the pagination control for `current` of `num_pages`.
///
/// Shows at most `MAX_VISIBLE_PAGES` page numbers, always including the first
/// and last page. No controls at all for an empty result set.
pub fn page_controls(current: usize, num_pages: usize) -> Vec<PageControl> {
    if num_pages == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, num_pages);

    let mut controls = Vec::new();
    if current > 1 {
        controls.push(PageControl::Previous(current - 1));
    }

    let page = |number| PageControl::Page {
        number,
        current: number == current,
    };

    if num_pages <= MAX_VISIBLE_PAGES {
        controls.extend((1..=num_pages).map(page));
    } else {
        // Window between the boundary pages, centered on the current page.
        let inner = MAX_VISIBLE_PAGES - 2;
        let start = current
            .saturating_sub(inner / 2)
            .clamp(2, num_pages - inner);
        let end = start + inner - 1;

        controls.push(page(1));
        if start > 2 {
            controls.push(PageControl::Gap);
        }
        controls.extend((start..=end).map(page));
        if end < num_pages - 1 {
            controls.push(PageControl::Gap);
        }
        controls.push(page(num_pages));
    }

    if current < num_pages {
        controls.push(PageControl::Next(current + 1));
    }
    controls
}
