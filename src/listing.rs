// src/listing.rs
//! Plain-text rendering of catalog items for the terminal.

use crate::types::Book;
use std::fmt::Write;

/// One summary line per book.
pub fn summary_line(position: usize, book: &Book) -> String {
    let mut line = format!("{:>4}. #{} {}", position, book.id, book.title);
    if !book.authors.is_empty() {
        let _ = write!(line, " by {}", book.author_line());
    }
    if !book.publisher.is_empty() {
        let _ = write!(line, " ({})", book.publisher);
    }
    let _ = write!(line, " [{} likes]", book.likes);
    line
}

/// The expanded details of a book, indented under its summary line.
pub fn detail_lines(book: &Book) -> Vec<String> {
    let mut lines = Vec::with_capacity(2 + book.reviews.len());
    if !book.isbn.is_empty() {
        lines.push(format!("        ISBN: {}", book.isbn));
    }
    if let Some(url) = book.image_url() {
        lines.push(format!("        Cover: {}", url));
    }
    if book.reviews.is_empty() {
        lines.push("        No reviews".to_string());
    }
    for review in &book.reviews {
        lines.push(format!("        \"{}\" - {}", review.text, review.author));
    }
    lines
}

/// Renders `books`, numbering from `first_position`.
pub fn render(books: &[Book], first_position: usize, expand: bool) -> String {
    let mut out = String::new();
    for (offset, book) in books.iter().enumerate() {
        out.push_str(&summary_line(first_position + offset, book));
        out.push('\n');
        if expand {
            for line in detail_lines(book) {
                out.push_str(&line);
                out.push('\n');
            }
        }
    }
    out
}
