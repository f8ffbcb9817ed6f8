use crate::models::CsvDocument;

const BOM: char = '\u{feff}';

/// Parse uploaded CSV text into a header row and data rows.
///
/// The scanner is permissive: unbalanced quotes never fail, they just keep
/// consuming characters. Blank data rows are dropped, short rows are padded
/// with empty cells and cells past the last header are ignored.
pub fn parse_csv(text: &str) -> CsvDocument {
    let mut records = scan_records(text).into_iter();

    let headers: Vec<String> = match records.next() {
        Some(first) => first
            .into_iter()
            .enumerate()
            .map(|(idx, cell)| {
                let cell = if idx == 0 {
                    cell.trim_start_matches(BOM)
                } else {
                    cell.as_str()
                };
                cell.trim().to_string()
            })
            .collect(),
        None => return CsvDocument::default(),
    };

    let rows = records
        .filter(|record| !is_blank(record))
        .map(|record| {
            (0..headers.len())
                .map(|idx| record.get(idx).map(|v| v.trim().to_string()).unwrap_or_default())
                .collect()
        })
        .collect();

    CsvDocument { headers, rows }
}

fn is_blank(record: &[String]) -> bool {
    record.iter().all(|cell| cell.trim().is_empty())
}

/// Character scan producing raw, untrimmed records.
fn scan_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut current_row: Vec<String> = Vec::new();
    let mut current_value = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current_value.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_value));
            }
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                current_row.push(std::mem::take(&mut current_value));
                records.push(std::mem::take(&mut current_row));
            }
            _ => current_value.push(ch),
        }
    }

    if !current_value.is_empty() || !current_row.is_empty() {
        current_row.push(current_value);
        records.push(current_row);
    }

    records
}
