//! # Catalog Analytics Engine
//!
//! This crate computes the statistics and trend reports of the catalog. It is
//! the only place in the system where aggregation logic lives.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of external systems.
//!   It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** The `AggregationEngine` is a stateless calculator. It takes
//!   a materialized `CatalogSnapshot` (or the books of one author) as input and produces plain
//!   result structs. Empty input yields zero counts and absent averages, never an error.
//! - **Fixed Reports:** The `ReportAssembler` composes engine outputs into the four report
//!   shapes served to clients. It is the only component that can fail, and only for unknown
//!   authors or invalid limits.
//!
//! ## Public API
//!
//! - `CatalogSnapshot`: Authors, books and the two authorship indexes.
//! - `AggregationEngine`: The individual aggregations.
//! - `ReportAssembler` / `ReportLimits`: The four reports and their tunable limits.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod aggregates;
pub mod assembler;
pub mod engine;
pub mod error;
pub mod report;
pub mod snapshot;

// Re-export the key components to create a clean, public-facing API.
pub use aggregates::{
    BasicStats, DecadeCount, DecadeGrowth, DecadeLanguageCount, EmergingAuthor, LanguageStats,
    PageRange, PageRangeCounts, ProlificAuthor, RecentBook, YearCount,
};
pub use assembler::{ReportAssembler, ReportLimits};
pub use engine::{AggregationEngine, decade_of};
pub use error::AnalyticsError;
pub use report::{
    AuthorBookEntry, AuthorDetail, AuthorStatisticsReport, AuthorSummary, BookStatisticsReport,
    LanguageBreakdown, TrendsReport,
};
pub use snapshot::{AuthorBooks, CatalogSnapshot};
