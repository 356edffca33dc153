//! CSV file handling for transaction data

use std::io::Read;
use std::path::Path;

use crate::data::RawTransaction;
use crate::error::{AnalysisError, Result};

/// Read every transaction row from a CSV file
pub fn read_transactions(path: impl AsRef<Path>) -> Result<Vec<RawTransaction>> {
    let path = path.as_ref();
    log::info!("Reading CSV file: {}", path.display());

    if !path.exists() {
        return Err(AnalysisError::UnsupportedInput(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let file = std::fs::File::open(path)?;
    read_transactions_from(file)
}

/// Read transaction rows from any CSV source.
///
/// Records the CSV layer cannot decode are logged and skipped, the
/// rest of the file is still read.
pub fn read_transactions_from<R: Read>(reader: R) -> Result<Vec<RawTransaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in rdr.deserialize::<RawTransaction>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping unreadable CSV record {}: {}", line + 1, e);
            }
        }
    }

    log::info!("Read {} transaction rows ({} unreadable)", rows.len(), skipped);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_canonical_headers() {
        let data = "buyer_id,seller_id,transactions,buyer_rating,seller_rating\n\
                    1,2,3,5,4\n\
                    3,4,1,,\n";
        let rows = read_transactions_from(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].buyer_id.as_deref(), Some("1"));
        assert_eq!(rows[0].seller_rating.as_deref(), Some("4"));
        assert_eq!(rows[1].buyer_rating, None);
    }

    #[test]
    fn accepts_source_dataset_headers() {
        let data = "Acquirente_ID,Venditore_ID,Numero_Transazioni,Main_Tag_Venditore,Rating_Medio\n\
                    10,20,2,Vinyl,4.5\n";
        let rows = read_transactions_from(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].buyer_id.as_deref(), Some("10"));
        assert_eq!(rows[0].seller_id.as_deref(), Some("20"));
        assert_eq!(rows[0].seller_main_tag.as_deref(), Some("Vinyl"));
    }

    #[test]
    fn short_rows_are_kept_for_validation() {
        let data = "buyer_id,seller_id,transactions\n1\n2,3,1\n";
        let rows = read_transactions_from(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].seller_id, None);
    }
}
