/// Offset pagination over one window.
///
/// The first page's declared `totalResults` fixes the walk; successive pages
/// advance the offset by the page size. A page returning zero records, or
/// fewer than the page size, terminates the walk regardless of the declared
/// total, so a total that shrinks mid-pagination cannot make the walk loop.
#[derive(Debug, Clone)]
pub struct PageWalk {
    page_size: usize,
    next_index: u64,
    total: Option<u64>,
    done: bool,
}

impl PageWalk {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            next_index: 0,
            total: None,
            done: false,
        }
    }

    /// Offset to request next, or `None` when the window is consumed.
    pub fn next_start_index(&self) -> Option<u64> {
        if self.done {
            return None;
        }
        if let Some(total) = self.total
            && self.next_index >= total
        {
            return None;
        }
        Some(self.next_index)
    }

    /// Feed back what a fetched page returned.
    pub fn record_page(&mut self, returned: usize, total_results: u64) {
        if self.total.is_none() {
            self.total = Some(total_results);
        }
        self.next_index += self.page_size as u64;
        if returned < self.page_size {
            self.done = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_declared_total_in_page_size_steps() {
        let mut walk = PageWalk::new(2);

        assert_eq!(walk.next_start_index(), Some(0));
        walk.record_page(2, 6);
        assert_eq!(walk.next_start_index(), Some(2));
        walk.record_page(2, 6);
        assert_eq!(walk.next_start_index(), Some(4));
        walk.record_page(2, 6);
        assert_eq!(walk.next_start_index(), None);
    }

    #[test]
    fn short_page_terminates_early() {
        let mut walk = PageWalk::new(100);

        assert_eq!(walk.next_start_index(), Some(0));
        walk.record_page(40, 5000);
        assert_eq!(walk.next_start_index(), None);
    }

    #[test]
    fn empty_first_page_terminates() {
        let mut walk = PageWalk::new(100);

        walk.record_page(0, 0);
        assert_eq!(walk.next_start_index(), None);
    }

    #[test]
    fn full_final_page_stops_at_total() {
        let mut walk = PageWalk::new(2);

        walk.record_page(2, 4);
        walk.record_page(2, 4);
        // Declared total consumed exactly; no extra request issued.
        assert_eq!(walk.next_start_index(), None);
    }
}
