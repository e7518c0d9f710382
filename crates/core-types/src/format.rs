//! Display helpers shared by every layer that shows authors to a human.

use crate::structs::Author;

/// Joins first and last name with a single space.
pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{first_name} {last_name}")
}

/// Comma separated full names, in the order given.
pub fn authors_display<'a>(authors: impl IntoIterator<Item = &'a Author>) -> String {
    authors
        .into_iter()
        .map(Author::full_name)
        .collect::<Vec<_>>()
        .join(", ")
}
