use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ColumnMapping, MappedColumn, TargetField};

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static pattern compiles"));

const PERSON_QUALIFIERS: [&str; 5] = ["author", "submitter", "requester", "customer", "user"];

/// A lowercased header in the three shapes the rules look at.
struct HeaderShape {
    exact: String,
    collapsed: String,
    tokens: HashSet<String>,
}

impl HeaderShape {
    fn new(header: &str) -> Self {
        let exact = header.trim().to_lowercase();
        let tokens = NON_ALPHANUMERIC
            .split(&exact)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        let collapsed = NON_ALPHANUMERIC.replace_all(&exact, "").into_owned();

        Self { exact, collapsed, tokens }
    }

    fn has_token(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    fn has_any_token(&self, tokens: &[&str]) -> bool {
        tokens.iter().any(|t| self.has_token(t))
    }

    fn collapses_to(&self, phrases: &[&str]) -> bool {
        phrases.contains(&self.collapsed.as_str())
    }
}

type Rule = fn(&HeaderShape) -> bool;

/// Checked in order; a rule is only consulted while its field is unclaimed.
const RULES: [(TargetField, Rule); 7] = [
    (TargetField::Title, is_title),
    (TargetField::Description, is_description),
    (TargetField::Status, is_status),
    (TargetField::Votes, is_votes),
    (TargetField::CreatedAt, is_created_at),
    (TargetField::AuthorEmail, is_author_email),
    (TargetField::AuthorName, is_author_name),
];

fn is_title(h: &HeaderShape) -> bool {
    h.has_token("title") || h.collapses_to(&["posttitle", "feedbacktitle", "requesttitle"])
}

fn is_description(h: &HeaderShape) -> bool {
    h.has_any_token(&["description", "details", "summary"])
        || h.collapses_to(&["feedback", "requestdescription"])
}

fn is_status(h: &HeaderShape) -> bool {
    h.has_any_token(&["status", "state"]) || h.collapses_to(&["workflowstatus"])
}

fn is_votes(h: &HeaderShape) -> bool {
    h.collapses_to(&["votes", "votecount"]) || h.has_any_token(&["upvotes", "score"])
}

fn is_created_at(h: &HeaderShape) -> bool {
    h.collapses_to(&[
        "createdat",
        "createddate",
        "submissiondate",
        "submitteddate",
        "submittedon",
    ]) || (h.has_token("date") && h.has_any_token(&["created", "submitted", "reported", "captured"]))
        || h.has_token("timestamp")
}

fn is_author_email(h: &HeaderShape) -> bool {
    h.collapses_to(&["authoremail", "submitteremail", "requesteremail"])
        || h.exact == "email"
        || (h.has_token("email") && h.has_any_token(&PERSON_QUALIFIERS))
}

fn is_author_name(h: &HeaderShape) -> bool {
    h.exact == "name"
        || h.collapses_to(&["authorname", "submittername", "requestername"])
        || (h.has_token("name") && (h.has_any_token(&PERSON_QUALIFIERS) || h.has_token("person")))
}

/// Best-guess target field for one header.
///
/// Fields already in `used` are never handed out again; a non-skip result is
/// added to `used` before returning.
pub fn classify_header(header: &str, used: &mut HashSet<TargetField>) -> TargetField {
    let shape = HeaderShape::new(header);

    let field = RULES
        .iter()
        .filter(|(field, _)| !used.contains(field))
        .find(|(_, matches)| matches(&shape))
        .map(|(field, _)| *field)
        .unwrap_or(TargetField::Skip);

    if field != TargetField::Skip {
        used.insert(field);
    }
    field
}

/// Seed a mapping for freshly uploaded headers, scanning left to right.
pub fn infer_mapping(headers: &[String]) -> ColumnMapping {
    let mut used = HashSet::new();
    let columns = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let field = classify_header(header, &mut used);
            tracing::debug!("Column '{}' mapped to {}", header, field.as_str());
            MappedColumn {
                index,
                column: header.clone(),
                field,
            }
        })
        .collect();

    ColumnMapping::new(columns)
}
