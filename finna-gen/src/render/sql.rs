//! SQL insert statement rendering

use crate::services::book_processor::{AuthorLink, EntityLink, ProcessedBook};

/// Render a SQL string literal, doubling embedded quotes
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn quote_or_null(value: Option<&str>) -> String {
    value.map(quote).unwrap_or_else(|| "NULL".to_string())
}

/// Release year as a bare number when numeric, otherwise a literal
fn year_value(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(year) if !year.is_empty() && year.chars().all(|c| c.is_ascii_digit()) => {
            year.to_string()
        }
        Some(year) if !year.is_empty() => quote(year),
        _ => "NULL".to_string(),
    }
}

/// Life year as a `'YYYY-01-01'` date literal
fn date_value(year: Option<&str>) -> String {
    match year {
        Some(y) if !y.is_empty() => quote(&format!("{}-01-01", y)),
        _ => "NULL".to_string(),
    }
}

fn publisher_row(publisher: &EntityLink) -> String {
    format!(
        "INSERT INTO publisher (id, pub_name) VALUES ({}, {});",
        publisher.id,
        quote(&publisher.name)
    )
}

fn author_row(link: &AuthorLink) -> String {
    format!(
        "INSERT INTO author (id, author_name, dob, dod) VALUES ({}, {}, {}, {});",
        link.id,
        quote(&link.author.name),
        date_value(link.author.birth_year.as_deref()),
        date_value(link.author.death_year.as_deref()),
    )
}

fn topic_row(topic: &EntityLink) -> String {
    format!(
        "INSERT INTO topic (id, topic_desc) VALUES ({}, {});",
        topic.id,
        quote(&topic.name)
    )
}

/// Statements for one book, in resolution order
///
/// Book row, then publisher, authors, genres and topics. A newly created
/// entity's row comes right before its link row.
pub fn render_book(book: &ProcessedBook) -> Vec<String> {
    let mut statements = Vec::new();
    let book_id = book.book_id;

    statements.push(format!(
        "INSERT INTO book (id, title, isbn, release_year) VALUES ({}, {}, {}, {});",
        book_id,
        quote_or_null(book.title.as_deref()),
        quote(&book.identifier),
        year_value(book.release_year.as_deref()),
    ));

    if let Some(publisher) = &book.publisher {
        if publisher.created {
            statements.push(publisher_row(publisher));
        }
        statements.push(format!(
            "INSERT INTO book_publisher (book_id, pub_id) VALUES ({}, {});",
            book_id, publisher.id
        ));
    }

    for link in &book.authors {
        if link.created {
            statements.push(author_row(link));
        }
        statements.push(format!(
            "INSERT INTO book_author (book_id, author_id) VALUES ({}, {});",
            book_id, link.id
        ));
    }

    for genre in &book.genres {
        statements.push(format!(
            "INSERT INTO book_genre (book_id, genre_ykl_id) VALUES ({}, {});",
            book_id,
            quote(genre.as_str())
        ));
    }

    for topic in &book.topics {
        if topic.created {
            statements.push(topic_row(topic));
        }
        statements.push(format!(
            "INSERT INTO book_topic (book_id, topic_id) VALUES ({}, {});",
            book_id, topic.id
        ));
    }

    statements
}

/// Rows for the entities a book created, without the book or its links
///
/// Used for a book abandoned part-way: its new entities are already on
/// file, so later runs will only ever link to them.
pub fn render_created_entities(book: &ProcessedBook) -> Vec<String> {
    let publisher = book
        .publisher
        .iter()
        .filter(|p| p.created)
        .map(publisher_row);
    let authors = book.authors.iter().filter(|a| a.created).map(author_row);
    let topics = book.topics.iter().filter(|t| t.created).map(topic_row);
    publisher.chain(authors).chain(topics).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::normalizer::AuthorName;
    use crate::store::GenreKey;

    fn sample_book() -> ProcessedBook {
        ProcessedBook {
            book_id: 7,
            identifier: "978-952-483-142-0".into(),
            title: Some("Kirjailijan 'päiväkirja'".into()),
            release_year: Some("2006".into()),
            publisher: Some(EntityLink {
                id: 3,
                name: "Like".into(),
                created: true,
            }),
            authors: vec![
                AuthorLink {
                    id: 1,
                    author: AuthorName {
                        name: "Leary, Timothy Francis".into(),
                        birth_year: Some("1920".into()),
                        death_year: Some("1996".into()),
                    },
                    created: true,
                },
                AuthorLink {
                    id: 2,
                    author: AuthorName {
                        name: "Ginsberg, Allen".into(),
                        birth_year: None,
                        death_year: None,
                    },
                    created: false,
                },
            ],
            genres: vec![GenreKey::Known("30.1".into()), GenreKey::Unknown],
            topics: vec![EntityLink {
                id: 4,
                name: "psykedelia".into(),
                created: false,
            }],
        }
    }

    #[test]
    fn test_render_order_and_shapes() {
        let statements = render_book(&sample_book());
        assert_eq!(
            statements,
            vec![
                "INSERT INTO book (id, title, isbn, release_year) VALUES (7, 'Kirjailijan ''päiväkirja''', '978-952-483-142-0', 2006);",
                "INSERT INTO publisher (id, pub_name) VALUES (3, 'Like');",
                "INSERT INTO book_publisher (book_id, pub_id) VALUES (7, 3);",
                "INSERT INTO author (id, author_name, dob, dod) VALUES (1, 'Leary, Timothy Francis', '1920-01-01', '1996-01-01');",
                "INSERT INTO book_author (book_id, author_id) VALUES (7, 1);",
                "INSERT INTO book_author (book_id, author_id) VALUES (7, 2);",
                "INSERT INTO book_genre (book_id, genre_ykl_id) VALUES (7, '30.1');",
                "INSERT INTO book_genre (book_id, genre_ykl_id) VALUES (7, '-1');",
                "INSERT INTO book_topic (book_id, topic_id) VALUES (7, 4);",
            ]
        );
    }

    #[test]
    fn test_pending_book_renders_nulls() {
        let book = ProcessedBook {
            book_id: 1,
            identifier: "0-914171-77-1".into(),
            title: None,
            release_year: None,
            publisher: None,
            authors: vec![],
            genres: vec![],
            topics: vec![],
        };
        assert_eq!(
            render_book(&book),
            vec!["INSERT INTO book (id, title, isbn, release_year) VALUES (1, NULL, '0-914171-77-1', NULL);"]
        );
    }

    #[test]
    fn test_non_numeric_year_is_quoted() {
        assert_eq!(year_value(Some("[2006]")), "'[2006]'");
        assert_eq!(year_value(Some(" 1999 ")), "1999");
        assert_eq!(year_value(Some("")), "NULL");
    }

    #[test]
    fn test_created_entities_only_for_abandoned_book() {
        let rows = render_created_entities(&sample_book());
        assert_eq!(
            rows,
            vec![
                "INSERT INTO publisher (id, pub_name) VALUES (3, 'Like');",
                "INSERT INTO author (id, author_name, dob, dod) VALUES (1, 'Leary, Timothy Francis', '1920-01-01', '1996-01-01');",
            ]
        );
    }
}
