use crate::aggregates::{
    BasicStats, DecadeCount, DecadeGrowth, DecadeLanguageCount, EmergingAuthor, LanguageStats,
    PageRangeCounts, ProlificAuthor, RecentBook, YearCount,
};
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{AuthorId, BookId};
use rust_decimal::Decimal;
use serde::Serialize;

/// The identity projection of an author used at the top of the author report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSummary {
    pub id: AuthorId,
    pub full_name: String,
    pub nationality: String,
}

/// Per-language figures in the author report (no page totals).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageBreakdown {
    pub language: core_types::Language,
    pub count: usize,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub avg_pages: Option<Decimal>,
}

impl From<LanguageStats> for LanguageBreakdown {
    fn from(stats: LanguageStats) -> Self {
        Self {
            language: stats.language,
            count: stats.count,
            avg_pages: stats.avg_pages,
        }
    }
}

/// Statistics over the books of one author.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorStatisticsReport {
    pub author: AuthorSummary,
    pub statistics: BasicStats,
    pub books_by_language: Vec<LanguageBreakdown>,
    pub books_by_decade: Vec<DecadeCount>,
    pub recent_books: Vec<RecentBook>,
}

/// Statistics over the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookStatisticsReport {
    pub general_statistics: BasicStats,
    pub statistics_by_language: Vec<LanguageStats>,
    pub statistics_by_year: Vec<YearCount>,
    pub books_by_page_range: PageRangeCounts,
    pub most_prolific_authors: Vec<ProlificAuthor>,
}

/// Publication trends over time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendsReport {
    pub language_trends: Vec<DecadeLanguageCount>,
    pub decade_growth: Vec<DecadeGrowth>,
    pub emerging_authors: Vec<EmergingAuthor>,
}

/// A book as listed inside an author's detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorBookEntry {
    pub id: BookId,
    pub title: String,
    pub publication_date: Option<NaiveDate>,
    /// The display label of the language, e.g. `"Spanish"`.
    pub language: String,
}

/// All author fields plus a bounded list of their books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorDetail {
    pub id: AuthorId,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub nationality: String,
    pub biography: String,
    pub books_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub books: Vec<AuthorBookEntry>,
}
