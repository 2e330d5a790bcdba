use serde::Serialize;

/// One page of an ordered result set.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T: Serialize> Paginated<T> {
    pub fn last_page(&self) -> u32 {
        if self.total <= 0 || self.per_page == 0 {
            return 1;
        }
        ((self.total as u64).div_ceil(self.per_page as u64)) as u32
    }

    pub fn prev_page(&self) -> Option<u32> {
        (self.page > 1).then(|| self.page - 1)
    }

    pub fn next_page(&self) -> Option<u32> {
        (self.page < self.last_page()).then(|| self.page + 1)
    }
}

/// Row offset for a 1-based page number.
pub fn page_offset(page: u32, per_page: u32) -> i64 {
    (page.max(1) as i64 - 1) * per_page as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, total: i64) -> Paginated<()> {
        Paginated {
            items: Vec::new(),
            page,
            per_page: 20,
            total,
        }
    }

    #[test]
    fn test_last_page() {
        assert_eq!(page(1, 0).last_page(), 1);
        assert_eq!(page(1, 20).last_page(), 1);
        assert_eq!(page(1, 21).last_page(), 2);
    }

    #[test]
    fn test_neighbours() {
        let p = page(2, 45);
        assert_eq!(p.prev_page(), Some(1));
        assert_eq!(p.next_page(), Some(3));
        assert_eq!(page(3, 45).next_page(), None);
        assert_eq!(page(1, 45).prev_page(), None);
    }

    #[test]
    fn test_offset_clamps_page_zero() {
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
    }
}
