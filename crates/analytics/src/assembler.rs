use crate::engine::AggregationEngine;
use crate::error::AnalyticsError;
use crate::report::{
    AuthorBookEntry, AuthorDetail, AuthorStatisticsReport, AuthorSummary, BookStatisticsReport,
    LanguageBreakdown, TrendsReport,
};
use crate::snapshot::CatalogSnapshot;
use chrono::{Days, NaiveDate};
use core_types::{Author, AuthorId};
use serde::{Deserialize, Serialize};

/// The limits and windows applied by the four reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLimits {
    /// Books listed under `recent_books` in the author report.
    pub recent_books: usize,
    /// Books listed in the author detail view.
    pub detail_books: usize,
    pub prolific_authors: usize,
    pub emerging_authors: usize,
    /// How far back from "today" a book still counts as recent.
    pub emerging_window_days: u32,
    /// Number of most recent publication years in the global report.
    pub publication_years: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            recent_books: 5,
            detail_books: 10,
            prolific_authors: 10,
            emerging_authors: 10,
            emerging_window_days: 10 * 365,
            publication_years: 20,
        }
    }
}

impl ReportLimits {
    /// Rejects zero limits and windows.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let limits = [
            ("recent_books", self.recent_books),
            ("detail_books", self.detail_books),
            ("prolific_authors", self.prolific_authors),
            ("emerging_authors", self.emerging_authors),
            ("emerging_window_days", self.emerging_window_days as usize),
            ("publication_years", self.publication_years),
        ];
        match limits.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(AnalyticsError::InvalidInput(format!(
                "{name} must be greater than zero"
            ))),
            None => Ok(()),
        }
    }
}

/// Shapes engine outputs into the four fixed reports.
#[derive(Debug, Clone, Copy)]
pub struct ReportAssembler {
    engine: AggregationEngine,
    limits: ReportLimits,
}

impl ReportAssembler {
    pub fn new(limits: ReportLimits) -> Result<Self, AnalyticsError> {
        limits.validate()?;
        Ok(Self {
            engine: AggregationEngine::new(),
            limits,
        })
    }

    /// Statistics over the books of one author.
    pub fn author_statistics(
        &self,
        snapshot: &CatalogSnapshot,
        author_id: AuthorId,
    ) -> Result<AuthorStatisticsReport, AnalyticsError> {
        let author = find_author(snapshot, author_id)?;
        let books = snapshot.books_of(author_id);

        let report = AuthorStatisticsReport {
            author: AuthorSummary {
                id: author.id,
                full_name: author.full_name(),
                nationality: author.nationality.clone(),
            },
            statistics: self.engine.basic_stats(books.iter().copied()),
            books_by_language: self
                .engine
                .group_by_language(books.iter().copied())
                .into_iter()
                .map(LanguageBreakdown::from)
                .collect(),
            books_by_decade: self.engine.group_by_decade(books.iter().copied()),
            recent_books: self
                .engine
                .recent_books(books.iter().copied(), self.limits.recent_books),
        };

        tracing::debug!(
            author_id,
            total_books = report.statistics.total_books,
            "Assembled author statistics."
        );
        Ok(report)
    }

    /// Statistics over the whole catalog.
    pub fn book_statistics(&self, snapshot: &CatalogSnapshot) -> BookStatisticsReport {
        let books = snapshot.books();

        let report = BookStatisticsReport {
            general_statistics: self.engine.basic_stats(books),
            statistics_by_language: self.engine.group_by_language(books),
            statistics_by_year: self
                .engine
                .year_counts(books, self.limits.publication_years),
            books_by_page_range: self.engine.group_by_page_range(books),
            most_prolific_authors: self
                .engine
                .most_prolific(snapshot.author_books(), self.limits.prolific_authors),
        };

        tracing::debug!(
            total_books = report.general_statistics.total_books,
            "Assembled global book statistics."
        );
        report
    }

    /// Publication trends, with "emerging" measured back from `today`.
    pub fn trends(
        &self,
        snapshot: &CatalogSnapshot,
        today: NaiveDate,
    ) -> Result<TrendsReport, AnalyticsError> {
        let cutoff = self.emerging_cutoff(today)?;
        let books = snapshot.books();

        let report = TrendsReport {
            language_trends: self.engine.decade_language_trend(books),
            decade_growth: self.engine.decade_growth(books),
            emerging_authors: self.engine.emerging_authors(
                snapshot.author_books(),
                cutoff,
                self.limits.emerging_authors,
            ),
        };

        tracing::debug!(
            %cutoff,
            emerging = report.emerging_authors.len(),
            "Assembled trends report."
        );
        Ok(report)
    }

    /// The author's own fields plus their first books in title order.
    pub fn author_detail(
        &self,
        snapshot: &CatalogSnapshot,
        author_id: AuthorId,
    ) -> Result<AuthorDetail, AnalyticsError> {
        let author = find_author(snapshot, author_id)?;
        let mut books = snapshot.books_of(author_id);
        let books_count = books.len();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));

        Ok(AuthorDetail {
            id: author.id,
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            full_name: author.full_name(),
            birth_date: author.birth_date,
            nationality: author.nationality.clone(),
            biography: author.biography.clone(),
            books_count,
            created_at: author.created_at,
            updated_at: author.updated_at,
            books: books
                .into_iter()
                .take(self.limits.detail_books)
                .map(|book| AuthorBookEntry {
                    id: book.id,
                    title: book.title.clone(),
                    publication_date: book.publication_date,
                    language: book.language.label().to_string(),
                })
                .collect(),
        })
    }

    /// The earliest publication date that still counts as recent.
    pub fn emerging_cutoff(&self, today: NaiveDate) -> Result<NaiveDate, AnalyticsError> {
        today
            .checked_sub_days(Days::new(u64::from(self.limits.emerging_window_days)))
            .ok_or_else(|| {
                AnalyticsError::InvalidInput(format!(
                    "cannot go back {} days from {today}",
                    self.limits.emerging_window_days
                ))
            })
    }
}

fn find_author(snapshot: &CatalogSnapshot, author_id: AuthorId) -> Result<&Author, AnalyticsError> {
    snapshot
        .author(author_id)
        .ok_or_else(|| AnalyticsError::NotFound(format!("author {author_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_types::{Authorship, Book, BookId, Language};
    use rust_decimal::Decimal;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn author(id: AuthorId, first_name: &str, last_name: &str, nationality: &str) -> Author {
        let now = Utc::now();
        Author {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            birth_date: Some(date(1917, 6, 13)),
            nationality: nationality.to_string(),
            biography: "Novelist.".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn book(
        id: BookId,
        title: &str,
        published: Option<NaiveDate>,
        pages: Option<u32>,
        language: Language,
    ) -> Book {
        let now = Utc::now();
        Book {
            id,
            title: title.to_string(),
            publication_date: published,
            description: String::new(),
            page_count: pages,
            language,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog() -> CatalogSnapshot {
        let authors = vec![
            author(1, "Augusto", "Roa Bastos", "Paraguay"),
            author(2, "Josefina", "Plá", "Paraguay"),
            author(3, "Gabriel", "García Márquez", "Colombia"),
        ];
        let books = vec![
            book(10, "Yo el supremo", Some(date(1974, 1, 1)), Some(500), Language::Spanish),
            book(11, "Hijo de hombre", Some(date(1967, 1, 1)), Some(300), Language::Spanish),
            book(12, "Contravida", None, None, Language::Spanish),
            book(13, "La mano en la tierra", Some(date(2020, 5, 1)), Some(80), Language::English),
            book(14, "Cien años de soledad", Some(date(1967, 5, 30)), Some(471), Language::Spanish),
        ];
        let edges = [(1, 10), (1, 11), (1, 12), (2, 13), (3, 14), (1, 13)]
            .into_iter()
            .map(|(author_id, book_id)| Authorship { author_id, book_id });
        CatalogSnapshot::new(authors, books, edges)
    }

    fn assembler() -> ReportAssembler {
        ReportAssembler::new(ReportLimits::default()).unwrap()
    }

    #[test]
    fn rejects_zero_limits() {
        let limits = ReportLimits {
            recent_books: 0,
            ..ReportLimits::default()
        };
        assert_eq!(
            ReportAssembler::new(limits).unwrap_err(),
            AnalyticsError::InvalidInput("recent_books must be greater than zero".to_string())
        );
    }

    #[test]
    fn author_statistics_report() {
        let report = assembler().author_statistics(&catalog(), 1).unwrap();

        assert_eq!(
            report.author,
            AuthorSummary {
                id: 1,
                full_name: "Augusto Roa Bastos".to_string(),
                nationality: "Paraguay".to_string(),
            }
        );
        assert_eq!(report.statistics.total_books, 4);
        assert_eq!(report.statistics.books_with_pages, 3);
        assert_eq!(report.statistics.total_pages, 880);
        assert_eq!(report.statistics.max_pages, Some(500));
        assert_eq!(report.statistics.min_pages, Some(80));

        assert_eq!(report.books_by_language[0].language, Language::Spanish);
        assert_eq!(report.books_by_language[0].count, 3);
        assert_eq!(report.books_by_language[0].avg_pages, Some(Decimal::from(400)));

        let decades: Vec<_> = report.books_by_decade.iter().map(|d| (d.decade, d.count)).collect();
        assert_eq!(decades, vec![(1960, 1), (1970, 1), (2020, 1)]);

        let recent: Vec<_> = report.recent_books.iter().map(|b| b.id).collect();
        assert_eq!(recent, vec![13, 10, 11, 12]);
    }

    #[test]
    fn author_statistics_without_books() {
        let snapshot = CatalogSnapshot::new(vec![author(9, "Nadie", "Nada", "")], vec![], vec![]);
        let report = assembler().author_statistics(&snapshot, 9).unwrap();

        assert_eq!(report.statistics.total_books, 0);
        assert_eq!(report.statistics.avg_pages, None);
        assert!(report.books_by_language.is_empty());
        assert!(report.recent_books.is_empty());
    }

    #[test]
    fn unknown_author_is_not_found() {
        let assembler = assembler();
        let snapshot = catalog();
        assert_eq!(
            assembler.author_statistics(&snapshot, 99).unwrap_err(),
            AnalyticsError::NotFound("author 99".to_string())
        );
        assert!(matches!(
            assembler.author_detail(&snapshot, 99),
            Err(AnalyticsError::NotFound(_))
        ));
    }

    #[test]
    fn book_statistics_report() {
        let report = assembler().book_statistics(&catalog());

        assert_eq!(report.general_statistics.total_books, 5);
        assert_eq!(report.general_statistics.total_pages, 1351);
        assert_eq!(report.statistics_by_language[0].language, Language::Spanish);
        assert_eq!(report.statistics_by_language[0].count, 4);
        assert_eq!(report.statistics_by_language[0].total_pages, 1271);

        let years: Vec<_> = report.statistics_by_year.iter().map(|y| (y.year, y.count)).collect();
        assert_eq!(years, vec![(2020, 1), (1974, 1), (1967, 2)]);

        assert_eq!(report.books_by_page_range.short, 1);
        assert_eq!(report.books_by_page_range.long, 2);
        assert_eq!(report.books_by_page_range.very_long, 1);
        assert_eq!(report.books_by_page_range.unknown, 1);

        let prolific: Vec<_> = report
            .most_prolific_authors
            .iter()
            .map(|a| (a.id, a.books_count))
            .collect();
        assert_eq!(prolific, vec![(1, 4), (2, 1), (3, 1)]);
    }

    #[test]
    fn trends_report_uses_ten_year_window() {
        let report = assembler().trends(&catalog(), date(2024, 1, 1)).unwrap();

        let emerging: Vec<_> = report
            .emerging_authors
            .iter()
            .map(|a| (a.id, a.recent_books_count, a.total_books))
            .collect();
        assert_eq!(emerging, vec![(1, 1, 4), (2, 1, 1)]);

        let growth: Vec<_> = report.decade_growth.iter().map(|g| (g.decade, g.count)).collect();
        assert_eq!(growth, vec![(1960, 2), (1970, 1), (2020, 1)]);
        assert_eq!(report.language_trends.len(), 3);
    }

    #[test]
    fn emerging_cutoff_is_ten_times_365_days() {
        let cutoff = assembler().emerging_cutoff(date(2025, 1, 10)).unwrap();
        assert_eq!(cutoff, date(2015, 1, 13));
    }

    #[test]
    fn window_before_the_first_calendar_day_is_invalid() {
        let err = assembler()
            .trends(&CatalogSnapshot::default(), NaiveDate::MIN)
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput(message) if message.contains("3650 days")));
    }

    #[test]
    fn author_detail_lists_books_by_title() {
        let limits = ReportLimits {
            detail_books: 2,
            ..ReportLimits::default()
        };
        let detail = ReportAssembler::new(limits)
            .unwrap()
            .author_detail(&catalog(), 1)
            .unwrap();

        assert_eq!(detail.full_name, "Augusto Roa Bastos");
        assert_eq!(detail.books_count, 4);
        let titles: Vec<_> = detail.books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Contravida", "Hijo de hombre"]);
        assert_eq!(detail.books[0].language, "Spanish");
    }

    #[test]
    fn reports_serialize_to_the_documented_shape() {
        let report = assembler().book_statistics(&catalog());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["general_statistics"]["total_books"], 5);
        assert_eq!(json["statistics_by_language"][0]["language"], "es");
        assert_eq!(json["books_by_page_range"]["very_long"], 1);
        assert_eq!(json["most_prolific_authors"][0]["first_name"], "Augusto");

        let detail = serde_json::to_value(assembler().author_detail(&catalog(), 2).unwrap()).unwrap();
        assert_eq!(detail["books"][0]["publication_date"], "2020-05-01");
        assert_eq!(detail["books"][0]["language"], "English");
    }
}
