//! Page addressing: translate byte ranges into page descriptors.
//!
//! The worker page store serves file content in fixed-size pages. A byte
//! range `(offset, length)` maps to an ordered run of pages where the first
//! and last page may be partial. Translation is pure arithmetic; no I/O
//! happens here.

/// A single page request derived from a byte range.
///
/// Never persisted; descriptors exist only for the duration of one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDescriptor {
    /// Index of the page within the file.
    pub page_index: u64,
    /// Offset of the requested bytes within the page.
    pub in_page_offset: usize,
    /// Number of bytes requested from the page.
    pub in_page_length: usize,
}

impl PageDescriptor {
    /// Whether this descriptor covers an entire page of `page_size` bytes.
    ///
    /// Full-page fetches use an offset-free request shape on the wire.
    pub fn is_full_page(&self, page_size: usize) -> bool {
        self.in_page_offset == 0 && self.in_page_length == page_size
    }
}

/// A finite, non-restartable plan of page requests for a byte range.
///
/// Descriptors are yielded in ascending page-index order. An empty range
/// (`length == 0`) yields an empty plan.
#[derive(Debug, Clone)]
pub struct PagePlan {
    page_size: usize,
    cursor: u64,
    end: u64,
}

impl PagePlan {
    /// Plan the pages covering `length` bytes starting at `offset`.
    ///
    /// `page_size` must be positive; the client enforces this through
    /// [`crate::config::ClientConfig::validate`] before any plan is built.
    ///
    /// Open-ended ranges (`length == -1` in the public API) must be resolved
    /// to a concrete length via a metadata lookup before planning; this
    /// translator only handles closed ranges.
    pub fn new(offset: u64, length: u64, page_size: usize) -> Self {
        debug_assert!(page_size > 0, "page_size must be positive");
        Self {
            page_size,
            cursor: offset,
            end: offset + length,
        }
    }

    /// Number of pages remaining in the plan.
    pub fn remaining_pages(&self) -> u64 {
        if self.cursor >= self.end {
            return 0;
        }
        let page_size = self.page_size as u64;
        let first = self.cursor / page_size;
        let last = (self.end - 1) / page_size;
        last - first + 1
    }
}

impl Iterator for PagePlan {
    type Item = PageDescriptor;

    fn next(&mut self) -> Option<PageDescriptor> {
        if self.cursor >= self.end {
            return None;
        }
        let page_size = self.page_size as u64;
        let page_index = self.cursor / page_size;
        let in_page_offset = (self.cursor % page_size) as usize;
        let in_page_length =
            (self.page_size - in_page_offset).min((self.end - self.cursor) as usize);
        self.cursor += in_page_length as u64;
        Some(PageDescriptor {
            page_index,
            in_page_offset,
            in_page_length,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining_pages() as usize;
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(offset: u64, length: u64, page_size: usize) -> Vec<PageDescriptor> {
        PagePlan::new(offset, length, page_size).collect()
    }

    #[test]
    fn test_empty_range_yields_no_pages() {
        assert!(plan(0, 0, 10).is_empty());
        assert!(plan(25, 0, 10).is_empty());
    }

    #[test]
    fn test_mid_range_read() {
        // pageSize = 10, readRange(5, 15): page 0 offset 5 len 5,
        // page 1 full, page 2 offset 0 len 5.
        let pages = plan(5, 15, 10);
        assert_eq!(
            pages,
            vec![
                PageDescriptor {
                    page_index: 0,
                    in_page_offset: 5,
                    in_page_length: 5
                },
                PageDescriptor {
                    page_index: 1,
                    in_page_offset: 0,
                    in_page_length: 10
                },
                PageDescriptor {
                    page_index: 2,
                    in_page_offset: 0,
                    in_page_length: 5
                },
            ]
        );
        assert!(!pages[0].is_full_page(10));
        assert!(pages[1].is_full_page(10));
        assert!(!pages[2].is_full_page(10));
    }

    #[test]
    fn test_offset_on_page_boundary_is_full_page() {
        let pages = plan(10, 10, 10);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_index, 1);
        assert!(pages[0].is_full_page(10));
    }

    #[test]
    fn test_range_ending_on_boundary_has_no_spurious_page() {
        let pages = plan(0, 20, 10);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages.last().unwrap().page_index, 1);
    }

    #[test]
    fn test_single_partial_page() {
        let pages = plan(3, 4, 10);
        assert_eq!(
            pages,
            vec![PageDescriptor {
                page_index: 0,
                in_page_offset: 3,
                in_page_length: 4
            }]
        );
    }

    #[test]
    fn test_single_byte_at_page_end() {
        let pages = plan(9, 1, 10);
        assert_eq!(
            pages,
            vec![PageDescriptor {
                page_index: 0,
                in_page_offset: 9,
                in_page_length: 1
            }]
        );
    }

    #[test]
    fn test_lengths_sum_to_requested() {
        for (offset, length) in [(0u64, 1u64), (7, 23), (10, 100), (99, 3), (0, 4096)] {
            let total: usize = plan(offset, length, 16)
                .iter()
                .map(|p| p.in_page_length)
                .sum();
            assert_eq!(total as u64, length);
        }
    }

    #[test]
    #[should_panic(expected = "page_size must be positive")]
    fn test_zero_page_size_is_a_precondition_violation() {
        PagePlan::new(0, 10, 0);
    }

    #[test]
    fn test_remaining_pages_matches_iteration() {
        let p = PagePlan::new(5, 15, 10);
        assert_eq!(p.remaining_pages(), 3);
        assert_eq!(p.count(), 3);
    }
}
