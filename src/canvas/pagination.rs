// src/canvas/pagination.rs
// =============================================================================
// Following paginated listings.
//
// Each listing fetch (modules of a course, items of a module) owns a PageChain.
// When a page comes back with a `rel="next"` continuation, the chain hands
// back the next URL so the same task can be re-issued with the same context.
//
// Page N+1 is only known once page N has arrived, so a chain is strictly
// sequential. The API never loops, but if it did we'd rather fail loudly than
// spin: a revisited page or a chain longer than the cap is fatal.
// =============================================================================

use std::collections::HashSet;

use crate::error::{ArchiveError, Result};

/// Upper bound on pages in a single listing.
pub const DEFAULT_MAX_PAGES: usize = 1000;

#[derive(Debug, Clone)]
pub struct PageChain {
    visited: HashSet<String>,
    max_pages: usize,
}

impl PageChain {
    /// A chain whose first page is `first_url`.
    pub fn start(first_url: &str, max_pages: usize) -> Self {
        let mut visited = HashSet::new();
        visited.insert(first_url.to_string());
        Self {
            visited,
            max_pages: max_pages.max(1),
        }
    }

    /// Number of pages fetched or scheduled so far.
    pub fn pages(&self) -> usize {
        self.visited.len()
    }

    // Moves the chain forward from the page at `current_url`.
    //
    // Returns:
    //   Ok(None) when there is no continuation (the chain is done)
    //   Ok(Some((next_url, chain))) for the next page
    //   Err(..) on a cycle or when the cap would be exceeded
    pub fn follow(
        mut self,
        current_url: &str,
        next_page: Option<&str>,
    ) -> Result<Option<(String, PageChain)>> {
        let Some(next) = next_page else {
            return Ok(None);
        };

        if self.visited.contains(next) {
            return Err(ArchiveError::pagination(
                current_url,
                format!("continuation points back to already fetched page {}", next),
            ));
        }
        if self.visited.len() >= self.max_pages {
            return Err(ArchiveError::pagination(
                current_url,
                format!("listing exceeded {} pages", self.max_pages),
            ));
        }

        self.visited.insert(next.to_string());
        Ok(Some((next.to_string(), self)))
    }
}
