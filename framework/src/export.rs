//! CSV export

use serde_json::Value;

use crate::http::HttpResponse;

/// Quote a field when it holds a delimiter, quote or line break
pub fn csv_quote(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Builds a CSV document row by row
///
/// ```rust,ignore
/// let mut csv = Csv::new(&["Staff", "Net salary"]);
/// csv.row(["Amy Adams", "950.00"]);
/// Ok(csv.into_response("payroll.csv"))
/// ```
#[derive(Debug, Clone, Default)]
pub struct Csv {
    buffer: String,
    rows: usize,
}

impl Csv {
    pub fn new(headers: &[&str]) -> Self {
        let mut csv = Self::default();
        csv.push_line(headers.iter().copied());
        csv
    }

    pub fn row<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push_line(fields);
        self.rows += 1;
        self
    }

    /// Append one row taken from `keys` of a JSON object
    pub fn json_row(&mut self, record: &Value, keys: &[&str]) -> &mut Self {
        let fields: Vec<String> = keys.iter().map(|k| field_text(&record[*k])).collect();
        self.row(fields)
    }

    /// Data rows written so far (headers excluded)
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_response(self, filename: &str) -> HttpResponse {
        HttpResponse::csv(filename, self.buffer)
    }

    fn push_line<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line: Vec<String> = fields.into_iter().map(|f| csv_quote(f.as_ref())).collect();
        self.buffer.push_str(&line.join(","));
        self.buffer.push_str("\r\n");
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Minor units as a decimal amount, e.g. `123456` -> `1234.56`
pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(csv_quote("Adams"), "Adams");
        assert_eq!(csv_quote("Adams, Amy"), "\"Adams, Amy\"");
        assert_eq!(csv_quote("the \"big\" bus"), "\"the \"\"big\"\" bus\"");
    }

    #[test]
    fn writes_rows_and_attachment() {
        let mut csv = Csv::new(&["Staff", "Month", "Net"]);
        csv.row(["Amy Adams", "3", "950.00"]);
        csv.json_row(&json!({ "staff": "Lee, Ben", "month": 4, "net": null }), &["staff", "month", "net"]);

        assert_eq!(csv.len(), 2);
        assert_eq!(
            csv.as_str(),
            "Staff,Month,Net\r\nAmy Adams,3,950.00\r\n\"Lee, Ben\",4,\r\n"
        );

        let response = csv.into_response("payroll-2024.csv");
        assert_eq!(response.header_value("Content-Type"), Some("text/csv; charset=utf-8"));
        assert_eq!(
            response.header_value("Content-Disposition"),
            Some("attachment; filename=\"payroll-2024.csv\"")
        );
    }

    #[test]
    fn formats_money() {
        assert_eq!(format_minor_units(123456), "1234.56");
        assert_eq!(format_minor_units(5), "0.05");
        assert_eq!(format_minor_units(-250), "-2.50");
    }
}
