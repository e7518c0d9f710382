//! Terminal tables for the `report` command.

use analytics::{AuthorDetail, AuthorStatisticsReport, BookStatisticsReport, TrendsReport};
use chrono::NaiveDate;
use comfy_table::{Table, presets::UTF8_FULL};
use database::BookEntry;
use rust_decimal::Decimal;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header.to_vec());
    table
}

fn decimal(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |d| d.round_dp(2).to_string())
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn date(value: Option<NaiveDate>) -> String {
    optional(value)
}

fn section(out: &mut String, title: &str, table: Table) {
    out.push_str(title);
    out.push('\n');
    out.push_str(&table.to_string());
    out.push_str("\n\n");
}

pub fn book_statistics(report: &BookStatisticsReport) -> String {
    let mut out = String::new();

    let stats = &report.general_statistics;
    let mut general = table(&["Metric", "Value"]);
    general
        .add_row(vec!["Total books".to_string(), stats.total_books.to_string()])
        .add_row(vec!["Books with pages".to_string(), stats.books_with_pages.to_string()])
        .add_row(vec!["Total pages".to_string(), stats.total_pages.to_string()])
        .add_row(vec!["Average pages".to_string(), decimal(stats.avg_pages)])
        .add_row(vec!["Max pages".to_string(), optional(stats.max_pages)])
        .add_row(vec!["Min pages".to_string(), optional(stats.min_pages)]);
    section(&mut out, "General", general);

    let mut languages = table(&["Language", "Books", "Average pages", "Total pages"]);
    for row in &report.statistics_by_language {
        languages.add_row(vec![
            row.language.label().to_string(),
            row.count.to_string(),
            decimal(row.avg_pages),
            row.total_pages.to_string(),
        ]);
    }
    section(&mut out, "By language", languages);

    let mut years = table(&["Year", "Books"]);
    for row in &report.statistics_by_year {
        years.add_row(vec![row.year.to_string(), row.count.to_string()]);
    }
    section(&mut out, "By publication year", years);

    let ranges = &report.books_by_page_range;
    let mut pages = table(&["Range", "Books"]);
    for (label, count) in [
        ("Short (< 100)", ranges.short),
        ("Medium (100-299)", ranges.medium),
        ("Long (300-499)", ranges.long),
        ("Very long (500+)", ranges.very_long),
        ("Unknown", ranges.unknown),
    ] {
        pages.add_row(vec![label.to_string(), count.to_string()]);
    }
    section(&mut out, "By page range", pages);

    let mut prolific = table(&["Id", "Author", "Books"]);
    for author in &report.most_prolific_authors {
        prolific.add_row(vec![
            author.id.to_string(),
            core_types::full_name(&author.first_name, &author.last_name),
            author.books_count.to_string(),
        ]);
    }
    section(&mut out, "Most prolific authors", prolific);

    out
}

/// One row per book, co-authors joined in one cell.
pub fn books(entries: &[BookEntry]) -> String {
    let mut books = table(&["Id", "Title", "Published", "Language", "Pages", "Authors"]);
    for entry in entries {
        books.add_row(vec![
            entry.book.id.to_string(),
            entry.book.title.clone(),
            date(entry.book.publication_date),
            entry.language_display.clone(),
            optional(entry.book.page_count),
            core_types::authors_display(entry.authors.iter().map(|a| &a.author)),
        ]);
    }
    books.to_string()
}

pub fn trends(report: &TrendsReport) -> String {
    let mut out = String::new();

    let mut languages = table(&["Decade", "Language", "Books"]);
    for row in &report.language_trends {
        languages.add_row(vec![
            format!("{}s", row.decade),
            row.language.label().to_string(),
            row.count.to_string(),
        ]);
    }
    section(&mut out, "Languages by decade", languages);

    let mut growth = table(&["Decade", "Books", "Average pages"]);
    for row in &report.decade_growth {
        growth.add_row(vec![
            format!("{}s", row.decade),
            row.count.to_string(),
            decimal(row.avg_pages),
        ]);
    }
    section(&mut out, "Growth by decade", growth);

    let mut emerging = table(&["Id", "Author", "Recent books", "Total books"]);
    for author in &report.emerging_authors {
        emerging.add_row(vec![
            author.id.to_string(),
            author.full_name.clone(),
            author.recent_books_count.to_string(),
            author.total_books.to_string(),
        ]);
    }
    section(&mut out, "Emerging authors", emerging);

    out
}

pub fn author_statistics(report: &AuthorStatisticsReport) -> String {
    let mut out = format!(
        "{} (#{}) {}\n\n",
        report.author.full_name, report.author.id, report.author.nationality
    );

    let stats = &report.statistics;
    let mut general = table(&["Metric", "Value"]);
    general
        .add_row(vec!["Total books".to_string(), stats.total_books.to_string()])
        .add_row(vec!["Total pages".to_string(), stats.total_pages.to_string()])
        .add_row(vec!["Average pages".to_string(), decimal(stats.avg_pages)]);
    section(&mut out, "General", general);

    let mut languages = table(&["Language", "Books", "Average pages"]);
    for row in &report.books_by_language {
        languages.add_row(vec![
            row.language.label().to_string(),
            row.count.to_string(),
            decimal(row.avg_pages),
        ]);
    }
    section(&mut out, "By language", languages);

    let mut decades = table(&["Decade", "Books"]);
    for row in &report.books_by_decade {
        decades.add_row(vec![format!("{}s", row.decade), row.count.to_string()]);
    }
    section(&mut out, "By decade", decades);

    let mut recent = table(&["Id", "Title", "Published"]);
    for book in &report.recent_books {
        recent.add_row(vec![
            book.id.to_string(),
            book.title.clone(),
            date(book.publication_date),
        ]);
    }
    section(&mut out, "Recent books", recent);

    out
}

pub fn author_detail(detail: &AuthorDetail) -> String {
    let mut out = String::new();

    let mut fields = table(&["Field", "Value"]);
    fields
        .add_row(vec!["Id".to_string(), detail.id.to_string()])
        .add_row(vec!["Name".to_string(), detail.full_name.clone()])
        .add_row(vec!["Born".to_string(), date(detail.birth_date)])
        .add_row(vec!["Nationality".to_string(), detail.nationality.clone()])
        .add_row(vec!["Books".to_string(), detail.books_count.to_string()]);
    section(&mut out, "Author", fields);

    let mut books = table(&["Id", "Title", "Published", "Language"]);
    for book in &detail.books {
        books.add_row(vec![
            book.id.to_string(),
            book.title.clone(),
            date(book.publication_date),
            book.language.clone(),
        ]);
    }
    section(&mut out, "Books", books);

    out
}
