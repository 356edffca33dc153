//! Parquet file handling for transaction data

use std::path::Path;

use polars::prelude::*;

use crate::data::RawTransaction;
use crate::error::{AnalysisError, Result};

/// Canonical column name followed by the source dataset's header
const BUYER_ID: &[&str] = &["buyer_id", "Acquirente_ID"];
const SELLER_ID: &[&str] = &["seller_id", "Venditore_ID"];
const TRANSACTIONS: &[&str] = &["transactions", "Numero_Transazioni"];
const BUYER_RATING: &[&str] = &["buyer_rating", "Rating_Acquirente_V"];
const SELLER_RATING: &[&str] = &["seller_rating", "Rating_Venditore_A"];
const BUYER_MAIN_TAG: &[&str] = &["buyer_main_tag", "Main_Tag_Acquirente"];
const BUYER_DETAILED_TAG: &[&str] = &["buyer_detailed_tag", "Detailed_Tag_Acquirente"];
const SELLER_MAIN_TAG: &[&str] = &["seller_main_tag", "Main_Tag_Venditore"];
const SELLER_DETAILED_TAG: &[&str] = &["seller_detailed_tag", "Detailed_Tag_Venditore"];

/// Load transaction rows from a Parquet file
pub fn read_transactions(path: impl AsRef<Path>) -> Result<Vec<RawTransaction>> {
    let path = path.as_ref();
    log::info!("Reading parquet file: {}", path.display());

    if !path.exists() {
        return Err(AnalysisError::UnsupportedInput(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let df = LazyFrame::scan_parquet(path, Default::default())?.collect()?;
    log::debug!("File schema: {:?}", df.schema());

    frame_to_transactions(&df)
}

/// Convert a dataframe into raw rows, casting every column to text so
/// integer, float and string encodings of the same field all work
pub fn frame_to_transactions(df: &DataFrame) -> Result<Vec<RawTransaction>> {
    let buyer_id = text_column(df, BUYER_ID)?;
    let seller_id = text_column(df, SELLER_ID)?;
    let transactions = text_column(df, TRANSACTIONS)?;
    let buyer_rating = text_column(df, BUYER_RATING)?;
    let seller_rating = text_column(df, SELLER_RATING)?;
    let buyer_main_tag = text_column(df, BUYER_MAIN_TAG)?;
    let buyer_detailed_tag = text_column(df, BUYER_DETAILED_TAG)?;
    let seller_main_tag = text_column(df, SELLER_MAIN_TAG)?;
    let seller_detailed_tag = text_column(df, SELLER_DETAILED_TAG)?;

    if buyer_id.is_none() || seller_id.is_none() {
        log::warn!("Input has no buyer or seller id column; every row will be dropped");
    }

    let row_count = df.height();
    log::info!("Processing {} transaction rows", row_count);

    let value = |col: &Option<Column>, i: usize| -> Result<Option<String>> {
        match col {
            Some(c) => Ok(c.str()?.get(i).map(str::to_string)),
            None => Ok(None),
        }
    };

    let mut rows = Vec::with_capacity(row_count);
    for i in 0..row_count {
        rows.push(RawTransaction {
            buyer_id: value(&buyer_id, i)?,
            seller_id: value(&seller_id, i)?,
            transactions: value(&transactions, i)?,
            buyer_rating: value(&buyer_rating, i)?,
            seller_rating: value(&seller_rating, i)?,
            buyer_main_tag: value(&buyer_main_tag, i)?,
            buyer_detailed_tag: value(&buyer_detailed_tag, i)?,
            seller_main_tag: value(&seller_main_tag, i)?,
            seller_detailed_tag: value(&seller_detailed_tag, i)?,
        });
    }

    Ok(rows)
}

/// First matching column among `names`, cast to strings
fn text_column(df: &DataFrame, names: &[&str]) -> Result<Option<Column>> {
    for name in names {
        if let Ok(col) = df.column(name) {
            return Ok(Some(col.cast(&DataType::String)?));
        }
    }
    Ok(None)
}
