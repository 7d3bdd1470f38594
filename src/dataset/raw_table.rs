use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::io::Read;
use tracing::debug;

/// One data row exactly as it appeared in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line number in the source, for diagnostics.
    pub line: u64,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names from the header row.
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Read a delimited table into strings; no type coercion happens here.
pub fn read_raw_table<R: Read>(reader: R, delimiter: u8) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx + 1))?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 2);
        rows.push(RawRow {
            line,
            fields: record.iter().map(|s| s.to_string()).collect(),
        });
    }

    debug!(columns = headers.len(), rows = rows.len(), "read raw table");
    Ok(RawTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_quoted_grouped_numbers_intact() -> Result<()> {
        let content = "Country,Population\n\"China\",\"1,439,323,776\"\nIndia,\"1,380,004,385\"\n";
        let table = read_raw_table(content.as_bytes(), b',')?;

        assert_eq!(table.headers, vec!["Country", "Population"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].fields, vec!["China", "1,439,323,776"]);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].line, 3);
        Ok(())
    }

    #[test]
    fn ragged_rows_are_an_error() {
        let content = "a,b\n1,2\n3\n";
        assert!(read_raw_table(content.as_bytes(), b',').is_err());
    }

    #[test]
    fn custom_delimiter() -> Result<()> {
        let table = read_raw_table("a;b\n1,5;2\n".as_bytes(), b';')?;
        assert_eq!(table.rows[0].fields, vec!["1,5", "2"]);
        Ok(())
    }
}
