use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ColumnMapping, NewPost, NormalizedRow, PostStatus, TargetField};

pub const MAX_VOTES: u32 = 1000;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("static pattern compiles"));

pub fn normalize_text(value: &str) -> String {
    value.trim().to_string()
}

/// Unknown statuses fall back to `open`.
pub fn normalize_status(value: &str) -> PostStatus {
    PostStatus::from_label(&value.trim().to_lowercase()).unwrap_or_default()
}

/// Leading-integer parse clamped to `0..=MAX_VOTES`; anything without a
/// leading integer counts as zero.
pub fn normalize_votes(value: &str) -> u32 {
    let trimmed = value.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let magnitude = digits
        .chars()
        .map_while(|c| c.to_digit(10))
        .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(d as u64));

    if negative {
        0
    } else {
        magnitude.min(MAX_VOTES as u64) as u32
    }
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn normalize_author_name(value: &str) -> String {
    WHITESPACE_RUN.replace_all(value.trim(), " ").into_owned()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Build the post payload for one record.
///
/// Starts from `status: open` on `board_id` and applies each mapped column in
/// header order, so a later column mapped to the same field overrides an
/// earlier one. Created-at values pass through untouched apart from trimming.
pub fn normalize_row(mapping: &ColumnMapping, record: &[String], board_id: &str) -> NormalizedRow {
    let mut row = NormalizedRow {
        post: NewPost {
            board_id: board_id.to_string(),
            status: PostStatus::Open,
            ..Default::default()
        },
        votes: 0,
    };

    for column in mapping.columns() {
        let raw = record.get(column.index).map(String::as_str).unwrap_or("");
        match column.field {
            TargetField::Title => row.post.title = normalize_text(raw),
            TargetField::Description => row.post.description = non_empty(normalize_text(raw)),
            TargetField::Status => row.post.status = normalize_status(raw),
            TargetField::AuthorName => row.post.author_name = non_empty(normalize_author_name(raw)),
            TargetField::AuthorEmail => row.post.author_email = non_empty(normalize_email(raw)),
            TargetField::Votes => row.votes = normalize_votes(raw),
            TargetField::CreatedAt => row.post.created_at = non_empty(normalize_text(raw)),
            TargetField::Skip => {}
        }
    }

    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MappedColumn;

    fn mapping(fields: &[(&str, TargetField)]) -> ColumnMapping {
        ColumnMapping::new(
            fields
                .iter()
                .enumerate()
                .map(|(index, (column, field))| MappedColumn {
                    index,
                    column: column.to_string(),
                    field: *field,
                })
                .collect(),
        )
    }

    fn record(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn votes_are_parsed_and_clamped() {
        assert_eq!(normalize_votes("-5"), 0);
        assert_eq!(normalize_votes("50000"), 1000);
        assert_eq!(normalize_votes("abc"), 0);
        assert_eq!(normalize_votes("42"), 42);
        assert_eq!(normalize_votes(" 12.7 "), 12);
        assert_eq!(normalize_votes("99999999999999999999999"), 1000);
        assert_eq!(normalize_votes(""), 0);
    }

    #[test]
    fn status_is_lowercased_with_open_fallback() {
        assert_eq!(normalize_status("WEIRD"), PostStatus::Open);
        assert_eq!(normalize_status("Planned"), PostStatus::Planned);
        assert_eq!(normalize_status("IN_PROGRESS"), PostStatus::InProgress);
        assert_eq!(normalize_status(""), PostStatus::Open);
    }

    #[test]
    fn author_fields_are_cleaned() {
        assert_eq!(normalize_author_name("  Ada \t  Lovelace "), "Ada Lovelace");
        assert_eq!(normalize_email(" Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn row_carries_board_and_mapped_fields_only() {
        let mapping = mapping(&[
            ("Title", TargetField::Title),
            ("Internal", TargetField::Skip),
            ("Votes", TargetField::Votes),
            ("Status", TargetField::Status),
            ("Email", TargetField::AuthorEmail),
            ("When", TargetField::CreatedAt),
        ]);
        let row = normalize_row(
            &mapping,
            &record(&["Dark mode", "secret", "150", "Planned", "A@B.io", "last tuesday"]),
            "board-1",
        );

        assert_eq!(row.post.board_id, "board-1");
        assert_eq!(row.post.title, "Dark mode");
        assert_eq!(row.post.status, PostStatus::Planned);
        assert_eq!(row.post.author_email.as_deref(), Some("a@b.io"));
        assert_eq!(row.post.created_at.as_deref(), Some("last tuesday"));
        assert_eq!(row.post.description, None);
        assert_eq!(row.votes, 150);
    }

    #[test]
    fn unmapped_status_defaults_to_open_and_empty_title_survives() {
        let mapping = mapping(&[("Title", TargetField::Title)]);
        let row = normalize_row(&mapping, &record(&["  "]), "b");
        assert_eq!(row.post.status, PostStatus::Open);
        assert_eq!(row.post.title, "");
    }

    #[test]
    fn later_duplicate_mapping_overrides_earlier() {
        let mapping = mapping(&[("A", TargetField::Title), ("B", TargetField::Title)]);
        let row = normalize_row(&mapping, &record(&["first", "second"]), "b");
        assert_eq!(row.post.title, "second");
    }
}
