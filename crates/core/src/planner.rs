//! Builds and sequences catalog queries for one tentative book.

use std::sync::Arc;

use tracing::debug;

use crate::collaborators::CatalogSearch;
use crate::domain::book::{CatalogRecord, TentativeBook};
use crate::errors::BookMatchError;
use crate::pacing::SearchPacer;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Characters that usually separate a title from its subtitle, in the order
/// they are tried.
pub const SUBTITLE_DELIMITERS: [&str; 3] = [":", "|", "-"];

/// A narrowing search stops once a query returns at most this many results.
pub const PRECISE_RESULT_COUNT: usize = 3;

#[derive(Clone)]
pub struct QueryPlanner {
    catalog: Arc<dyn CatalogSearch>,
    pacer: Arc<dyn SearchPacer>,
    limit: usize,
}

impl QueryPlanner {
    pub fn new(catalog: Arc<dyn CatalogSearch>, pacer: Arc<dyn SearchPacer>, limit: usize) -> Self {
        Self { catalog, pacer, limit }
    }

    /// Title results followed by author results, undeduplicated. When both come
    /// back empty and the title carries a subtitle delimiter, searches again with
    /// only the text before the delimiter and returns that instead.
    pub async fn search_for(
        &self,
        book: &TentativeBook,
    ) -> Result<Vec<CatalogRecord>, BookMatchError> {
        let _permit = self.pacer.acquire().await;

        let mut results = self.catalog.search(&book.title, self.limit).await?;
        results.extend(self.catalog.search(&book.author, self.limit).await?);

        if results.is_empty() {
            if let Some(main_title) = main_title(&book.title) {
                debug!(
                    event_name = "planner.subtitle_fallback",
                    title = %book.title,
                    query = %main_title,
                    "direct queries empty; retrying without subtitle"
                );
                results = self.catalog.search(main_title, self.limit).await?;
            }
        }

        Ok(results)
    }

    /// Expanding-query search over OCR text fragments: starts with the first
    /// fragment and appends one more per search until a query is precise enough
    /// (1 to [`PRECISE_RESULT_COUNT`] results). A query that matches nothing does
    /// not stop the expansion, since full-text search may still match a longer
    /// one; once fragments run out the last non-empty result set is returned.
    pub async fn narrow_by_fragments(
        &self,
        fragments: &[String],
    ) -> Result<Vec<CatalogRecord>, BookMatchError> {
        let _permit = self.pacer.acquire().await;

        let mut query = String::new();
        let mut last_non_empty = Vec::new();

        for fragment in fragments.iter().map(|fragment| fragment.trim()) {
            if fragment.is_empty() {
                continue;
            }
            if !query.is_empty() {
                query.push(' ');
            }
            query.push_str(fragment);

            let results = self.catalog.search(&query, self.limit).await?;
            debug!(
                event_name = "planner.narrowing_step",
                query = %query,
                result_count = results.len(),
                "expanded fragment query"
            );

            if results.is_empty() {
                continue;
            }
            if results.len() <= PRECISE_RESULT_COUNT {
                return Ok(results);
            }
            last_non_empty = results;
        }

        Ok(last_non_empty)
    }
}

/// Text before the first subtitle delimiter present in `title`, trying
/// delimiters in [`SUBTITLE_DELIMITERS`] order. `None` when no delimiter occurs
/// or nothing but whitespace precedes it.
pub fn main_title(title: &str) -> Option<&str> {
    let delimiter = SUBTITLE_DELIMITERS.iter().find(|delimiter| title.contains(**delimiter))?;
    title.split(*delimiter).map(str::trim).find(|part| !part.is_empty())
}
