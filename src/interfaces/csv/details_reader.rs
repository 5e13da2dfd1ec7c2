use crate::domain::session::PurchaseDetails;
use crate::error::{FlowError, Result};
use std::io::Read;

/// Reads purchase details from `key,value` CSV rows.
///
/// A leading `key,value` header row is optional and skipped when present.
/// Whitespace around fields is trimmed.
pub struct DetailsReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> DetailsReader<R> {
    /// Creates a new `DetailsReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily yields each `(key, value)` pair.
    pub fn entries(self) -> impl Iterator<Item = Result<(String, String)>> {
        self.reader
            .into_deserialize::<(String, String)>()
            .enumerate()
            .filter(|(i, row)| {
                !matches!(row, Ok((k, v)) if *i == 0
                    && k.eq_ignore_ascii_case("key")
                    && v.eq_ignore_ascii_case("value"))
            })
            .map(|(_, row)| row.map_err(FlowError::from))
    }

    /// Collects every row; a repeated key keeps its last value.
    pub fn read_all(self) -> Result<PurchaseDetails> {
        self.entries().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_with_header() {
        let data = "key, value\nItem, Shirt\nPrice, $29.99";
        let details = DetailsReader::new(data.as_bytes()).read_all().unwrap();

        assert_eq!(details.len(), 2);
        assert_eq!(details.get("Item").map(String::as_str), Some("Shirt"));
        assert_eq!(details.get("Price").map(String::as_str), Some("$29.99"));
    }

    #[test]
    fn test_reader_without_header() {
        let data = "Item,Shirt\nSize,M\nItem,Hat";
        let details = DetailsReader::new(data.as_bytes()).read_all().unwrap();

        assert_eq!(details.len(), 2);
        assert_eq!(details.get("Item").map(String::as_str), Some("Hat"));
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "Item,Shirt\nonly-one-field";
        let results: Vec<Result<(String, String)>> =
            DetailsReader::new(data.as_bytes()).entries().collect();

        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
