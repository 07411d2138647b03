use serde::{Deserialize, Serialize};

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PageParams {
    pub fn resolve(&self, default_size: u32) -> PageRequest {
        PageRequest {
            page: self.page.unwrap_or(1).max(1),
            size: self.limit.unwrap_or(default_size).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.size)
    }
}

/// Page-number envelope: `{ count, next, previous, results }`.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, request: PageRequest) -> Self {
        let seen = request.offset() + results.len() as i64;

        Self {
            count,
            next: request.page.checked_add(1).filter(|_| seen < count),
            previous: (request.page > 1).then_some(request.page - 1),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_clamps_page_and_size() {
        let params = PageParams {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(
            params.resolve(6),
            PageRequest {
                page: 1,
                size: MAX_PAGE_SIZE
            }
        );
        assert_eq!(PageParams::default().resolve(6).size, 6);
    }

    #[test]
    fn page_links_neighbours() {
        let request = PageRequest { page: 2, size: 2 };
        let page = Page::new(vec![3, 4], 5, request);
        assert_eq!(request.offset(), 2);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let last = Page::new(vec![5], 5, PageRequest { page: 3, size: 2 });
        assert_eq!(last.next, None);
    }

    #[test]
    fn last_possible_page_has_no_next() {
        let request = PageParams {
            page: Some(u32::MAX),
            limit: Some(6),
        }
        .resolve(6);
        let page = Page::<i64>::new(vec![], 3, request);

        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(u32::MAX - 1));
        assert_eq!(request.offset(), i64::from(u32::MAX - 1) * 6);
    }
}
