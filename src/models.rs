use serde::{Deserialize, Deserializer, Serialize};

/// Parsed upload: one header row plus the data rows that follow it.
///
/// Rows are positional, `rows[i][j]` is the cell under `headers[j]`, so
/// duplicate header names stay independently mappable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvDocument {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvDocument {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetField {
    Title,
    Description,
    Status,
    AuthorName,
    AuthorEmail,
    Votes,
    CreatedAt,
    Skip,
}

impl TargetField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetField::Title => "title",
            TargetField::Description => "description",
            TargetField::Status => "status",
            TargetField::AuthorName => "author_name",
            TargetField::AuthorEmail => "author_email",
            TargetField::Votes => "votes",
            TargetField::CreatedAt => "created_at",
            TargetField::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedColumn {
    pub index: usize,
    pub column: String,
    pub field: TargetField,
}

/// Column-to-field assignment, one entry per CSV column in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    columns: Vec<MappedColumn>,
}

impl ColumnMapping {
    pub fn new(columns: Vec<MappedColumn>) -> Self {
        Self { columns }
    }

    /// Every column mapped to `skip`.
    pub fn skipping_all(headers: &[String]) -> Self {
        Self::new(
            headers
                .iter()
                .enumerate()
                .map(|(index, column)| MappedColumn {
                    index,
                    column: column.clone(),
                    field: TargetField::Skip,
                })
                .collect(),
        )
    }

    pub fn columns(&self) -> &[MappedColumn] {
        &self.columns
    }

    pub fn field_at(&self, index: usize) -> Option<TargetField> {
        self.columns.get(index).map(|c| c.field)
    }

    /// Manual override. Duplicated non-skip fields are allowed here.
    pub fn set(&mut self, index: usize, field: TargetField) -> bool {
        match self.columns.get_mut(index) {
            Some(column) => {
                column.field = field;
                true
            }
            None => false,
        }
    }

    pub fn has_title(&self) -> bool {
        self.columns.iter().any(|c| c.field == TargetField::Title)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Open,
    Planned,
    InProgress,
    Done,
    Declined,
}

impl PostStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "open" => Some(PostStatus::Open),
            "planned" => Some(PostStatus::Planned),
            "in_progress" => Some(PostStatus::InProgress),
            "done" => Some(PostStatus::Done),
            "declined" => Some(PostStatus::Declined),
            _ => None,
        }
    }
}

/// Payload accepted by the post-creation collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub board_id: String,
    pub status: PostStatus,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A row after coercion: the post payload plus the votes to seed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedRow {
    #[serde(flatten)]
    pub post: NewPost,
    pub votes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPost {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
}

/// Post ids come back as strings or integers depending on the backend.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(id) => id,
        Id::Number(id) => id.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based data row number.
    pub row: usize,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub total_rows: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<RowError>,
    pub created_posts: Vec<CreatedPost>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    #[default]
    Upload,
    Mapping,
    Preview,
    Importing,
    Complete,
}

impl ImportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStage::Upload => "upload",
            ImportStage::Mapping => "mapping",
            ImportStage::Preview => "preview",
            ImportStage::Importing => "importing",
            ImportStage::Complete => "complete",
        }
    }
}
