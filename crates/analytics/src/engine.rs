use crate::aggregates::{
    BasicStats, DecadeCount, DecadeGrowth, DecadeLanguageCount, EmergingAuthor, LanguageStats,
    PageRange, PageRangeCounts, ProlificAuthor, RecentBook, YearCount,
};
use crate::snapshot::AuthorBooks;
use chrono::{Datelike, NaiveDate};
use core_types::{Book, Language};
use rust_decimal::Decimal;
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;

/// The decade a date falls in: `floor(year / 10) * 10`.
pub fn decade_of(date: NaiveDate) -> i32 {
    date.year().div_euclid(10) * 10
}

/// Running page-count totals for one group of books.
#[derive(Debug, Default, Clone, Copy)]
struct PageTally {
    books: usize,
    with_pages: usize,
    total_pages: u64,
    min_pages: Option<u32>,
    max_pages: Option<u32>,
}

impl PageTally {
    fn add(&mut self, page_count: Option<u32>) {
        self.books += 1;
        if let Some(pages) = page_count {
            self.with_pages += 1;
            self.total_pages += u64::from(pages);
            self.min_pages = Some(self.min_pages.map_or(pages, |min| min.min(pages)));
            self.max_pages = Some(self.max_pages.map_or(pages, |max| max.max(pages)));
        }
    }

    fn avg_pages(&self) -> Option<Decimal> {
        if self.with_pages == 0 {
            return None;
        }
        Some(Decimal::from(self.total_pages) / Decimal::from(self.with_pages as u64))
    }
}

/// A stateless calculator for the catalog aggregations.
///
/// Every method is a pure function of its input. Books with no publication
/// date are left out of all decade and year groupings.
#[derive(Debug, Default, Clone, Copy)]
pub struct AggregationEngine {}

impl AggregationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page statistics. `total_books` counts every book; the page figures
    /// only consider books that have a page count.
    pub fn basic_stats<'a, I>(&self, books: I) -> BasicStats
    where
        I: IntoIterator<Item = &'a Book>,
    {
        let mut tally = PageTally::default();
        for book in books {
            tally.add(book.page_count);
        }

        BasicStats {
            total_books: tally.books,
            avg_pages: tally.avg_pages(),
            max_pages: tally.max_pages,
            min_pages: tally.min_pages,
            total_pages: tally.total_pages,
            books_with_pages: tally.with_pages,
        }
    }

    /// Count, average and total pages per language present, most common first.
    /// Equal counts are ordered by language code.
    pub fn group_by_language<'a, I>(&self, books: I) -> Vec<LanguageStats>
    where
        I: IntoIterator<Item = &'a Book>,
    {
        let mut groups: BTreeMap<Language, PageTally> = BTreeMap::new();
        for book in books {
            groups.entry(book.language).or_default().add(book.page_count);
        }

        let mut stats: Vec<LanguageStats> = groups
            .into_iter()
            .map(|(language, tally)| LanguageStats {
                language,
                count: tally.books,
                avg_pages: tally.avg_pages(),
                total_pages: tally.total_pages,
            })
            .collect();
        // Stable sort keeps the code order from the BTreeMap for ties.
        stats.sort_by_key(|entry| Reverse(entry.count));
        stats
    }

    /// Book counts per publication decade, ascending.
    pub fn group_by_decade<'a, I>(&self, books: I) -> Vec<DecadeCount>
    where
        I: IntoIterator<Item = &'a Book>,
    {
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for date in books.into_iter().filter_map(|book| book.publication_date) {
            *counts.entry(decade_of(date)).or_default() += 1;
        }

        counts
            .into_iter()
            .map(|(decade, count)| DecadeCount { decade, count })
            .collect()
    }

    /// Partitions the books into page-length buckets.
    pub fn group_by_page_range<'a, I>(&self, books: I) -> PageRangeCounts
    where
        I: IntoIterator<Item = &'a Book>,
    {
        let mut counts = PageRangeCounts::default();
        for book in books {
            counts.increment(PageRange::classify(book.page_count));
        }
        counts
    }

    /// Authors ranked by number of books, ties broken by author id.
    pub fn most_prolific<'a, I>(&self, authors: I, limit: usize) -> Vec<ProlificAuthor>
    where
        I: IntoIterator<Item = AuthorBooks<'a>>,
    {
        let mut ranked: Vec<ProlificAuthor> = authors
            .into_iter()
            .map(|entry| ProlificAuthor {
                id: entry.author.id,
                first_name: entry.author.first_name.clone(),
                last_name: entry.author.last_name.clone(),
                books_count: entry.books.len(),
            })
            .collect();

        ranked.sort_by(|a, b| b.books_count.cmp(&a.books_count).then(a.id.cmp(&b.id)));
        ranked.truncate(limit);
        ranked
    }

    /// The latest books by publication date. Undated books sort last; equal
    /// dates are ordered by book id.
    pub fn recent_books<'a, I>(&self, books: I, limit: usize) -> Vec<RecentBook>
    where
        I: IntoIterator<Item = &'a Book>,
    {
        let mut books: Vec<&Book> = books.into_iter().collect();
        books.sort_by(|a, b| {
            newest_first(a.publication_date, b.publication_date).then(a.id.cmp(&b.id))
        });

        books
            .into_iter()
            .take(limit)
            .map(|book| RecentBook {
                id: book.id,
                title: book.title.clone(),
                publication_date: book.publication_date,
            })
            .collect()
    }

    /// Authors with at least one book published on or after `cutoff`, ranked
    /// by that recent count, ties broken by author id.
    pub fn emerging_authors<'a, I>(
        &self,
        authors: I,
        cutoff: NaiveDate,
        limit: usize,
    ) -> Vec<EmergingAuthor>
    where
        I: IntoIterator<Item = AuthorBooks<'a>>,
    {
        let mut emerging: Vec<EmergingAuthor> = authors
            .into_iter()
            .filter_map(|entry| {
                let recent_books_count = entry
                    .books
                    .iter()
                    .filter(|book| book.publication_date.is_some_and(|date| date >= cutoff))
                    .count();
                (recent_books_count > 0).then(|| EmergingAuthor {
                    id: entry.author.id,
                    full_name: entry.author.full_name(),
                    recent_books_count,
                    total_books: entry.books.len(),
                })
            })
            .collect();

        emerging.sort_by(|a, b| {
            b.recent_books_count
                .cmp(&a.recent_books_count)
                .then(a.id.cmp(&b.id))
        });
        emerging.truncate(limit);
        emerging
    }

    /// Book counts per (decade, language), ordered by decade then language code.
    pub fn decade_language_trend<'a, I>(&self, books: I) -> Vec<DecadeLanguageCount>
    where
        I: IntoIterator<Item = &'a Book>,
    {
        let mut counts: BTreeMap<(i32, Language), usize> = BTreeMap::new();
        for book in books {
            if let Some(date) = book.publication_date {
                *counts.entry((decade_of(date), book.language)).or_default() += 1;
            }
        }

        counts
            .into_iter()
            .map(|((decade, language), count)| DecadeLanguageCount {
                decade,
                language,
                count,
            })
            .collect()
    }

    /// Count and average pages per decade, ascending.
    pub fn decade_growth<'a, I>(&self, books: I) -> Vec<DecadeGrowth>
    where
        I: IntoIterator<Item = &'a Book>,
    {
        let mut groups: BTreeMap<i32, PageTally> = BTreeMap::new();
        for book in books {
            if let Some(date) = book.publication_date {
                groups.entry(decade_of(date)).or_default().add(book.page_count);
            }
        }

        groups
            .into_iter()
            .map(|(decade, tally)| DecadeGrowth {
                decade,
                count: tally.books,
                avg_pages: tally.avg_pages(),
            })
            .collect()
    }

    /// Publication counts for the `years` most recent publication years
    /// present, newest first.
    pub fn year_counts<'a, I>(&self, books: I, years: usize) -> Vec<YearCount>
    where
        I: IntoIterator<Item = &'a Book>,
    {
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for date in books.into_iter().filter_map(|book| book.publication_date) {
            *counts.entry(date.year()).or_default() += 1;
        }

        counts
            .into_iter()
            .rev()
            .take(years)
            .map(|(year, count)| YearCount { year, count })
            .collect()
    }
}

fn newest_first(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::CatalogSnapshot;
    use chrono::Utc;
    use core_types::{Author, AuthorId, Authorship, BookId};
    use proptest::prelude::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn book(id: BookId, published: Option<NaiveDate>, pages: Option<u32>, language: Language) -> Book {
        let now = Utc::now();
        Book {
            id,
            title: format!("Book {id}"),
            publication_date: published,
            description: String::new(),
            page_count: pages,
            language,
            created_at: now,
            updated_at: now,
        }
    }

    fn pages_only(pages: &[Option<u32>]) -> Vec<Book> {
        pages
            .iter()
            .enumerate()
            .map(|(i, &p)| book(i as BookId + 1, None, p, Language::English))
            .collect()
    }

    fn author(id: AuthorId, first_name: &str, last_name: &str) -> Author {
        let now = Utc::now();
        Author {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            birth_date: None,
            nationality: String::new(),
            biography: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn edge(author_id: AuthorId, book_id: BookId) -> Authorship {
        Authorship { author_id, book_id }
    }

    #[test]
    fn basic_stats_ignores_missing_page_counts() {
        let books = pages_only(&[Some(500), Some(300), None]);
        let stats = AggregationEngine::new().basic_stats(&books);

        assert_eq!(
            stats,
            BasicStats {
                total_books: 3,
                avg_pages: Some(Decimal::from(400)),
                max_pages: Some(500),
                min_pages: Some(300),
                total_pages: 800,
                books_with_pages: 2,
            }
        );
    }

    #[test]
    fn basic_stats_without_any_page_count() {
        let books = pages_only(&[None, None]);
        let stats = AggregationEngine::new().basic_stats(&books);

        assert_eq!(stats.total_books, 2);
        assert_eq!(stats.avg_pages, None);
        assert_eq!(stats.max_pages, None);
        assert_eq!(stats.min_pages, None);
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.books_with_pages, 0);
    }

    #[test]
    fn empty_input_yields_empty_aggregates() {
        let engine = AggregationEngine::new();
        let books: Vec<Book> = Vec::new();

        assert_eq!(engine.basic_stats(&books).total_books, 0);
        assert!(engine.group_by_language(&books).is_empty());
        assert!(engine.group_by_decade(&books).is_empty());
        assert_eq!(engine.group_by_page_range(&books).total(), 0);
        assert!(engine.recent_books(&books, 5).is_empty());
        assert!(engine.decade_language_trend(&books).is_empty());
        assert!(engine.decade_growth(&books).is_empty());
        assert!(engine.year_counts(&books, 20).is_empty());

        let snapshot = CatalogSnapshot::default();
        assert!(engine.most_prolific(snapshot.author_books(), 10).is_empty());
        assert!(
            engine
                .emerging_authors(snapshot.author_books(), date(2015, 1, 1), 10)
                .is_empty()
        );
    }

    #[test]
    fn group_by_language_orders_by_count_then_code() {
        let books = vec![
            book(1, None, Some(100), Language::Spanish),
            book(2, None, Some(300), Language::Spanish),
            book(3, None, None, Language::French),
            book(4, None, Some(50), Language::English),
        ];
        let stats = AggregationEngine::new().group_by_language(&books);

        let order: Vec<_> = stats.iter().map(|s| (s.language, s.count)).collect();
        assert_eq!(
            order,
            vec![
                (Language::Spanish, 2),
                (Language::English, 1),
                (Language::French, 1),
            ]
        );
        assert_eq!(stats[0].avg_pages, Some(Decimal::from(200)));
        assert_eq!(stats[0].total_pages, 400);
        assert_eq!(stats[2].avg_pages, None);
        assert_eq!(stats[2].total_pages, 0);
    }

    #[test]
    fn group_by_decade_excludes_undated_books() {
        let books = vec![
            book(1, Some(date(1974, 5, 1)), None, Language::Spanish),
            book(2, Some(date(1967, 1, 1)), None, Language::Spanish),
            book(3, None, None, Language::Spanish),
        ];
        let decades = AggregationEngine::new().group_by_decade(&books);

        assert_eq!(
            decades,
            vec![
                DecadeCount { decade: 1960, count: 1 },
                DecadeCount { decade: 1970, count: 1 },
            ]
        );
    }

    #[test]
    fn decade_of_floors_years() {
        assert_eq!(decade_of(date(1970, 1, 1)), 1970);
        assert_eq!(decade_of(date(1979, 12, 31)), 1970);
        assert_eq!(decade_of(date(2000, 6, 1)), 2000);
        assert_eq!(decade_of(date(-5, 1, 1)), -10);
    }

    #[test]
    fn group_by_page_range_scenario() {
        let books = pages_only(&[Some(50), Some(150), Some(450), None]);
        let ranges = AggregationEngine::new().group_by_page_range(&books);

        assert_eq!(
            ranges,
            PageRangeCounts {
                short: 1,
                medium: 1,
                long: 1,
                very_long: 0,
                unknown: 1,
            }
        );
    }

    #[test]
    fn most_prolific_breaks_ties_by_id() {
        let snapshot = CatalogSnapshot::new(
            vec![author(3, "C", "C"), author(1, "A", "A"), author(2, "B", "B")],
            vec![
                book(10, None, None, Language::English),
                book(11, None, None, Language::English),
                book(12, None, None, Language::English),
            ],
            vec![edge(3, 10), edge(3, 11), edge(1, 12), edge(2, 10)],
        );
        let ranked = AggregationEngine::new().most_prolific(snapshot.author_books(), 2);

        let ids: Vec<_> = ranked.iter().map(|a| (a.id, a.books_count)).collect();
        assert_eq!(ids, vec![(3, 2), (1, 1)]);
        assert_eq!(ranked[0].first_name, "C");
    }

    #[test]
    fn recent_books_sorts_undated_last() {
        let books = vec![
            book(1, None, None, Language::English),
            book(2, Some(date(2001, 1, 1)), None, Language::English),
            book(3, Some(date(2020, 3, 1)), None, Language::English),
            book(4, Some(date(2001, 1, 1)), None, Language::English),
        ];
        let engine = AggregationEngine::new();

        let ids: Vec<_> = engine.recent_books(&books, 10).iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![3, 2, 4, 1]);

        let top = engine.recent_books(&books, 1);
        assert_eq!(
            top,
            vec![RecentBook {
                id: 3,
                title: "Book 3".to_string(),
                publication_date: Some(date(2020, 3, 1)),
            }]
        );
    }

    #[test]
    fn emerging_authors_scenario() {
        let snapshot = CatalogSnapshot::new(
            vec![author(1, "Ana", "A"), author(2, "Bruno", "B")],
            vec![
                book(10, Some(date(2020, 6, 1)), None, Language::Spanish),
                book(11, Some(date(2010, 6, 1)), None, Language::Spanish),
                book(12, Some(date(2005, 6, 1)), None, Language::Spanish),
            ],
            vec![edge(1, 10), edge(1, 11), edge(2, 12)],
        );
        let emerging = AggregationEngine::new().emerging_authors(
            snapshot.author_books(),
            date(2015, 1, 1),
            10,
        );

        assert_eq!(
            emerging,
            vec![EmergingAuthor {
                id: 1,
                full_name: "Ana A".to_string(),
                recent_books_count: 1,
                total_books: 2,
            }]
        );
    }

    #[test]
    fn emerging_authors_cutoff_is_inclusive_and_ranked() {
        let snapshot = CatalogSnapshot::new(
            vec![author(5, "E", "E"), author(4, "D", "D"), author(6, "F", "F")],
            vec![
                book(1, Some(date(2015, 1, 1)), None, Language::English),
                book(2, Some(date(2016, 1, 1)), None, Language::English),
                book(3, Some(date(2018, 1, 1)), None, Language::English),
                book(4, Some(date(2019, 1, 1)), None, Language::English),
                book(5, None, None, Language::English),
            ],
            vec![edge(5, 1), edge(4, 2), edge(6, 3), edge(6, 4), edge(6, 5)],
        );
        let emerging = AggregationEngine::new().emerging_authors(
            snapshot.author_books(),
            date(2015, 1, 1),
            10,
        );

        let ranked: Vec<_> = emerging
            .iter()
            .map(|a| (a.id, a.recent_books_count, a.total_books))
            .collect();
        assert_eq!(ranked, vec![(6, 2, 3), (4, 1, 1), (5, 1, 1)]);
    }

    #[test]
    fn decade_language_trend_is_cross_tabulated() {
        let books = vec![
            book(1, Some(date(1995, 1, 1)), None, Language::Spanish),
            book(2, Some(date(1991, 1, 1)), None, Language::English),
            book(3, Some(date(1999, 1, 1)), None, Language::Spanish),
            book(4, Some(date(1985, 1, 1)), None, Language::Other),
            book(5, None, None, Language::Spanish),
        ];
        let trend = AggregationEngine::new().decade_language_trend(&books);

        let rows: Vec<_> = trend
            .iter()
            .map(|t| (t.decade, t.language.code(), t.count))
            .collect();
        assert_eq!(
            rows,
            vec![(1980, "other", 1), (1990, "en", 1), (1990, "es", 2)]
        );
    }

    #[test]
    fn decade_growth_averages_dated_books() {
        let books = vec![
            book(1, Some(date(1995, 1, 1)), Some(100), Language::Spanish),
            book(2, Some(date(1991, 1, 1)), Some(201), Language::English),
            book(3, Some(date(2001, 1, 1)), None, Language::English),
            book(4, None, Some(900), Language::English),
        ];
        let growth = AggregationEngine::new().decade_growth(&books);

        assert_eq!(
            growth,
            vec![
                DecadeGrowth {
                    decade: 1990,
                    count: 2,
                    avg_pages: Some(Decimal::new(1505, 1)),
                },
                DecadeGrowth {
                    decade: 2000,
                    count: 1,
                    avg_pages: None,
                },
            ]
        );
    }

    #[test]
    fn year_counts_keeps_most_recent_years() {
        let books: Vec<Book> = (1990..2020)
            .map(|year| book(year as BookId, Some(date(year, 1, 1)), None, Language::English))
            .chain(std::iter::once(book(1, Some(date(2019, 7, 1)), None, Language::English)))
            .chain(std::iter::once(book(2, None, None, Language::English)))
            .collect();
        let years = AggregationEngine::new().year_counts(&books, 20);

        assert_eq!(years.len(), 20);
        assert_eq!(years[0], YearCount { year: 2019, count: 2 });
        assert_eq!(years[19], YearCount { year: 2000, count: 1 });
    }

    fn arb_language() -> impl Strategy<Value = Language> {
        proptest::sample::select(Language::ALL.to_vec())
    }

    fn arb_books() -> impl Strategy<Value = Vec<Book>> {
        proptest::collection::vec(
            (
                proptest::option::of((1800i32..2030, 1u32..=12)),
                proptest::option::of(0u32..2000),
                arb_language(),
            ),
            0..60,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (published, pages, language))| {
                    let published = published.map(|(year, month)| date(year, month, 1));
                    book(i as BookId + 1, published, pages, language)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn total_books_counts_every_book(books in arb_books()) {
            let stats = AggregationEngine::new().basic_stats(&books);
            prop_assert_eq!(stats.total_books, books.len());
            prop_assert_eq!(
                stats.books_with_pages,
                books.iter().filter(|b| b.page_count.is_some()).count()
            );
        }

        #[test]
        fn language_groups_sum_to_total(books in arb_books()) {
            let groups = AggregationEngine::new().group_by_language(&books);
            prop_assert_eq!(groups.iter().map(|g| g.count).sum::<usize>(), books.len());
            for pair in groups.windows(2) {
                prop_assert!(
                    pair[0].count > pair[1].count
                        || (pair[0].count == pair[1].count && pair[0].language < pair[1].language)
                );
            }
        }

        #[test]
        fn decade_groups_cover_only_dated_books(books in arb_books()) {
            let decades = AggregationEngine::new().group_by_decade(&books);
            let dated = books.iter().filter(|b| b.publication_date.is_some()).count();
            prop_assert_eq!(decades.iter().map(|d| d.count).sum::<usize>(), dated);
            prop_assert!(decades.iter().all(|d| d.decade % 10 == 0));
            prop_assert!(decades.windows(2).all(|pair| pair[0].decade < pair[1].decade));
        }

        #[test]
        fn page_ranges_partition_books(books in arb_books()) {
            let ranges = AggregationEngine::new().group_by_page_range(&books);
            prop_assert_eq!(ranges.total(), books.len());
            for range in [
                PageRange::Unknown,
                PageRange::Short,
                PageRange::Medium,
                PageRange::Long,
                PageRange::VeryLong,
            ] {
                let expected = books
                    .iter()
                    .filter(|b| PageRange::classify(b.page_count) == range)
                    .count();
                prop_assert_eq!(ranges.get(range), expected);
            }
        }

        #[test]
        fn most_prolific_is_sorted(
            books in arb_books(),
            edges in proptest::collection::vec((1i64..8, 1i64..60), 0..120),
        ) {
            let authors = (1..8).map(|id| author(id, "F", "L")).collect();
            let edges = edges.into_iter().map(|(a, b)| edge(a, b));
            let snapshot = CatalogSnapshot::new(authors, books, edges);
            let ranked = AggregationEngine::new().most_prolific(snapshot.author_books(), 5);

            prop_assert!(ranked.len() <= 5);
            for pair in ranked.windows(2) {
                prop_assert!(
                    pair[0].books_count > pair[1].books_count
                        || (pair[0].books_count == pair[1].books_count && pair[0].id < pair[1].id)
                );
            }
        }

        #[test]
        fn aggregations_are_idempotent(books in arb_books()) {
            let engine = AggregationEngine::new();
            prop_assert_eq!(engine.basic_stats(&books), engine.basic_stats(&books));
            prop_assert_eq!(engine.group_by_language(&books), engine.group_by_language(&books));
            prop_assert_eq!(engine.recent_books(&books, 5), engine.recent_books(&books, 5));
            prop_assert_eq!(
                engine.decade_language_trend(&books),
                engine.decade_language_trend(&books)
            );
        }
    }
}
