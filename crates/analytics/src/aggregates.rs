//! Result structs produced by the [`AggregationEngine`](crate::AggregationEngine).
//!
//! Averages are `Option<Decimal>`: absent when no book in the group has a
//! page count. They serialize as JSON numbers (or `null`).

use chrono::NaiveDate;
use core_types::{AuthorId, BookId, Language};
use rust_decimal::Decimal;
use serde::Serialize;

/// Page statistics over a set of books.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicStats {
    pub total_books: usize,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub avg_pages: Option<Decimal>,
    pub max_pages: Option<u32>,
    pub min_pages: Option<u32>,
    pub total_pages: u64,
    pub books_with_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageStats {
    pub language: Language,
    pub count: usize,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub avg_pages: Option<Decimal>,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecadeCount {
    pub decade: i32,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecadeGrowth {
    pub decade: i32,
    pub count: usize,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub avg_pages: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecadeLanguageCount {
    pub decade: i32,
    pub language: Language,
    pub count: usize,
}

/// The length bucket of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageRange {
    Unknown,
    Short,
    Medium,
    Long,
    VeryLong,
}

impl PageRange {
    /// Half-open buckets: [0,100), [100,300), [300,500), [500,∞).
    pub fn classify(page_count: Option<u32>) -> Self {
        match page_count {
            None => PageRange::Unknown,
            Some(0..=99) => PageRange::Short,
            Some(100..=299) => PageRange::Medium,
            Some(300..=499) => PageRange::Long,
            Some(_) => PageRange::VeryLong,
        }
    }
}

/// Book counts per [`PageRange`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageRangeCounts {
    pub short: usize,
    pub medium: usize,
    pub long: usize,
    pub very_long: usize,
    pub unknown: usize,
}

impl PageRangeCounts {
    pub fn get(&self, range: PageRange) -> usize {
        match range {
            PageRange::Unknown => self.unknown,
            PageRange::Short => self.short,
            PageRange::Medium => self.medium,
            PageRange::Long => self.long,
            PageRange::VeryLong => self.very_long,
        }
    }

    pub(crate) fn increment(&mut self, range: PageRange) {
        let slot = match range {
            PageRange::Unknown => &mut self.unknown,
            PageRange::Short => &mut self.short,
            PageRange::Medium => &mut self.medium,
            PageRange::Long => &mut self.long,
            PageRange::VeryLong => &mut self.very_long,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        self.short + self.medium + self.long + self.very_long + self.unknown
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProlificAuthor {
    pub id: AuthorId,
    pub first_name: String,
    pub last_name: String,
    pub books_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentBook {
    pub id: BookId,
    pub title: String,
    pub publication_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmergingAuthor {
    pub id: AuthorId,
    pub full_name: String,
    pub recent_books_count: usize,
    pub total_books: usize,
}
