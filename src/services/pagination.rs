use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub number: usize,
    pub num_pages: usize,
    pub per_page: usize,
    pub total: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageInfo {
    /// Resolves a raw `?page=` value. Anything that is not a number lands on the
    /// first page; numbers outside `1..=num_pages` land on the last page.
    pub fn resolve(raw: Option<&str>, total: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(per_page).max(1);
        let number = match raw.map(|r| r.trim().parse::<i64>()) {
            None | Some(Err(_)) => 1,
            Some(Ok(n)) if n >= 1 && (n as usize) <= num_pages => n as usize,
            Some(Ok(_)) => num_pages,
        };
        Self {
            number,
            num_pages,
            per_page,
            total,
            has_next: number < num_pages,
            has_previous: number > 1,
        }
    }

    pub fn offset(&self) -> usize {
        (self.number - 1) * self.per_page
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    #[serde(flatten)]
    pub info: PageInfo,
    pub items: Vec<T>,
}

pub fn paginate<T: Clone>(items: &[T], raw: Option<&str>, per_page: usize) -> Page<T> {
    let info = PageInfo::resolve(raw, items.len(), per_page);
    let items = items
        .iter()
        .skip(info.offset())
        .take(info.per_page)
        .cloned()
        .collect();
    Page { info, items }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_resolution() {
        let info = PageInfo::resolve(Some("2"), 60, 25);
        assert_eq!(info.number, 2);
        assert_eq!(info.num_pages, 3);
        assert_eq!(info.offset(), 25);
        assert!(info.has_next && info.has_previous);

        assert_eq!(PageInfo::resolve(Some("abc"), 60, 25).number, 1);
        assert_eq!(PageInfo::resolve(None, 60, 25).number, 1);
        assert_eq!(PageInfo::resolve(Some("99"), 60, 25).number, 3);
        assert_eq!(PageInfo::resolve(Some("0"), 60, 25).number, 3);
    }

    #[test]
    fn test_empty_input_has_one_page() {
        let page = paginate::<u8>(&[], Some("4"), 25);
        assert_eq!(page.info.num_pages, 1);
        assert_eq!(page.info.number, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_last_page_is_partial() {
        let items: Vec<u32> = (0..30).collect();
        let page = paginate(&items, Some("2"), 25);
        assert_eq!(page.items, (25..30).collect::<Vec<_>>());
        assert!(!page.info.has_next);
    }
}
