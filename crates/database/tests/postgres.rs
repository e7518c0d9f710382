//! Integration tests against a live PostgreSQL.
//!
//! Ignored by default. Run with `DATABASE_URL` set and `cargo test -- --ignored`;
//! `#[sqlx::test]` creates a fresh database per test and applies `migrations/`.

use chrono::NaiveDate;
use core_types::{AuthorChanges, AuthorId, BookChanges, Language, NewAuthor, NewBook};
use database::{AuthorFilter, BookFilter, CatalogStore, DbError, DbRepository};
use sqlx::PgPool;

fn new_author(first: &str, last: &str, biography: &str) -> NewAuthor {
    NewAuthor {
        first_name: first.to_string(),
        last_name: last.to_string(),
        nationality: "Paraguay".to_string(),
        biography: biography.to_string(),
        ..Default::default()
    }
}

fn new_book(title: &str, page_count: Option<u32>, authors_ids: Vec<AuthorId>) -> NewBook {
    NewBook {
        title: title.to_string(),
        page_count,
        language: Language::Spanish,
        authors_ids,
        ..Default::default()
    }
}

async fn create_author(repo: &DbRepository, first: &str, last: &str) -> AuthorId {
    repo.create_author(&new_author(first, last, ""))
        .await
        .unwrap()
        .author
        .id
}

async fn book_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn search_matches_wildcards_literally(pool: PgPool) {
    let repo = DbRepository::new(pool);
    repo.create_author(&new_author("Augusto", "Roa Bastos", "Wrote 100% of it"))
        .await
        .unwrap();
    repo.create_author(&new_author("Josefina", "Plá", "Ceramist and poet"))
        .await
        .unwrap();

    let search = |term: &str| AuthorFilter {
        search: Some(term.to_string()),
        ..Default::default()
    };
    assert_eq!(repo.list_authors(&search("100%")).await.unwrap().len(), 1);
    assert_eq!(repo.list_authors(&search("%")).await.unwrap().len(), 1);
    assert!(repo.list_authors(&search("_")).await.unwrap().is_empty());
    assert_eq!(repo.list_authors(&search("CERAMIST")).await.unwrap().len(), 1);
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn unknown_authors_roll_the_write_back(pool: PgPool) {
    let repo = DbRepository::new(pool.clone());
    let roa = create_author(&repo, "Augusto", "Roa Bastos").await;

    let err = repo
        .create_book(&new_book("Huérfano", None, vec![roa, roa + 100]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Validation(_)));
    assert_eq!(book_count(&pool).await, 0);

    let book = repo
        .create_book(&new_book("Yo el supremo", Some(500), vec![roa]))
        .await
        .unwrap();
    let changes = BookChanges {
        title: Some("Renamed".to_string()),
        authors_ids: Some(vec![roa + 100]),
        ..Default::default()
    };
    assert!(repo.update_book(book.book.id, &changes).await.is_err());

    let kept = repo.get_book(book.book.id).await.unwrap();
    assert_eq!(kept.book.title, "Yo el supremo");
    assert_eq!(kept.authors_count, 1);
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn ordering_keeps_missing_values_last(pool: PgPool) {
    let repo = DbRepository::new(pool);
    let roa = create_author(&repo, "Augusto", "Roa Bastos").await;
    for (title, pages) in [
        ("Hijo de hombre", Some(300)),
        ("Contravida", None),
        ("Yo el supremo", Some(500)),
    ] {
        repo.create_book(&new_book(title, pages, vec![roa]))
            .await
            .unwrap();
    }

    for (ordering, expected) in [
        ("page_count", ["Hijo de hombre", "Yo el supremo", "Contravida"]),
        ("-page_count", ["Yo el supremo", "Hijo de hombre", "Contravida"]),
        ("-title", ["Yo el supremo", "Hijo de hombre", "Contravida"]),
    ] {
        let filter = BookFilter {
            ordering: Some(ordering.parse().unwrap()),
            ..Default::default()
        };
        let titles: Vec<String> = repo
            .list_books(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.book.title)
            .collect();
        assert_eq!(titles, expected, "{ordering}");
    }
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn snapshots_carry_every_edge(pool: PgPool) {
    let repo = DbRepository::new(pool);
    let roa = create_author(&repo, "Augusto", "Roa Bastos").await;
    let pla = create_author(&repo, "Josefina", "Plá").await;
    let shared = repo
        .create_book(&NewBook {
            publication_date: NaiveDate::from_ymd_opt(1974, 1, 1),
            ..new_book("Antología", Some(200), vec![roa, pla])
        })
        .await
        .unwrap()
        .book
        .id;

    let snapshot = repo.load_snapshot().await.unwrap();
    assert_eq!(snapshot.authors().len(), 2);
    assert_eq!(snapshot.author_ids_of(shared), &[roa, pla]);

    let changes = AuthorChanges {
        nationality: Some("Spain".to_string()),
        ..Default::default()
    };
    repo.update_author(pla, &changes).await.unwrap();
    repo.delete_author(roa).await.unwrap();

    let snapshot = repo.load_author_snapshot(pla).await.unwrap();
    assert_eq!(snapshot.authors()[0].nationality, "Spain");
    assert_eq!(snapshot.book_ids_of(pla), &[shared]);
    assert!(repo.load_author_snapshot(roa).await.unwrap().is_empty());
}
