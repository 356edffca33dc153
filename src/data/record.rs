//! Transaction record types and lenient field parsing

use serde::{Deserialize, Serialize};

use crate::error::RowError;

/// Tag assigned when the tagging collaborator supplied nothing
pub const UNKNOWN_TAG: &str = "Unknown";

/// Highest value on the rating scale
pub const MAX_RATING: u8 = 5;

/// One transaction row exactly as read from the input table.
///
/// Every field is optional text so a malformed row can be reported
/// instead of aborting the whole read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTransaction {
    #[serde(alias = "Acquirente_ID")]
    pub buyer_id: Option<String>,

    #[serde(alias = "Venditore_ID")]
    pub seller_id: Option<String>,

    #[serde(alias = "Numero_Transazioni")]
    pub transactions: Option<String>,

    #[serde(alias = "Rating_Acquirente_V")]
    pub buyer_rating: Option<String>,

    #[serde(alias = "Rating_Venditore_A")]
    pub seller_rating: Option<String>,

    #[serde(alias = "Main_Tag_Acquirente")]
    pub buyer_main_tag: Option<String>,

    #[serde(alias = "Detailed_Tag_Acquirente")]
    pub buyer_detailed_tag: Option<String>,

    #[serde(alias = "Main_Tag_Venditore")]
    pub seller_main_tag: Option<String>,

    #[serde(alias = "Detailed_Tag_Venditore")]
    pub seller_detailed_tag: Option<String>,
}

/// Topical labels of a user, opaque to the analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tags {
    pub main_tag: String,
    pub detailed_tag: String,
}

impl Tags {
    pub fn new(main_tag: impl Into<String>, detailed_tag: impl Into<String>) -> Self {
        Self {
            main_tag: main_tag.into(),
            detailed_tag: detailed_tag.into(),
        }
    }

    fn from_fields(main: Option<&str>, detailed: Option<&str>) -> Self {
        let pick = |field: Option<&str>| {
            field
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(UNKNOWN_TAG)
                .to_string()
        };
        Self::new(pick(main), pick(detailed))
    }
}

impl Default for Tags {
    fn default() -> Self {
        Self::new(UNKNOWN_TAG, UNKNOWN_TAG)
    }
}

/// A validated transaction row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub buyer_id: u64,
    pub seller_id: u64,
    /// Number of transactions between the pair, at least 1
    pub transactions: u32,
    /// Rating the buyer gave the seller, 0 when unknown
    pub buyer_rating: u8,
    /// Counter-rating the seller gave the buyer, `None` when unknown
    pub seller_rating: Option<u8>,
    pub buyer_tags: Tags,
    pub seller_tags: Tags,
}

impl TryFrom<&RawTransaction> for TransactionRecord {
    type Error = RowError;

    fn try_from(raw: &RawTransaction) -> Result<Self, Self::Error> {
        let buyer_id = parse_id("buyer_id", raw.buyer_id.as_deref())?;
        let seller_id = parse_id("seller_id", raw.seller_id.as_deref())?;
        if buyer_id == seller_id {
            return Err(RowError::SelfLoop(buyer_id));
        }

        let transactions = parse_number(raw.transactions.as_deref())
            .map(|count| count.round().clamp(1.0, u32::MAX as f64) as u32)
            .unwrap_or(1);

        Ok(Self {
            buyer_id,
            seller_id,
            transactions,
            buyer_rating: parse_rating(raw.buyer_rating.as_deref()).unwrap_or(0),
            seller_rating: parse_rating(raw.seller_rating.as_deref()),
            buyer_tags: Tags::from_fields(
                raw.buyer_main_tag.as_deref(),
                raw.buyer_detailed_tag.as_deref(),
            ),
            seller_tags: Tags::from_fields(
                raw.seller_main_tag.as_deref(),
                raw.seller_detailed_tag.as_deref(),
            ),
        })
    }
}

/// Parse a user id, accepting integral floats such as `"42.0"`
pub fn parse_id(field: &'static str, value: Option<&str>) -> Result<u64, RowError> {
    let text = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RowError::MissingField(field))?;

    if let Ok(id) = text.parse::<u64>() {
        return Ok(id);
    }

    match text.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => {
            Ok(v as u64)
        }
        _ => Err(RowError::InvalidId {
            field,
            value: text.to_string(),
        }),
    }
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Ratings are known only when strictly positive; values above the
/// scale are clamped to it
pub fn parse_rating(value: Option<&str>) -> Option<u8> {
    let rating = parse_number(value)?.round();
    if rating <= 0.0 {
        return None;
    }
    Some(rating.min(MAX_RATING as f64) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(buyer: &str, seller: &str) -> RawTransaction {
        RawTransaction {
            buyer_id: Some(buyer.to_string()),
            seller_id: Some(seller.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn parses_integral_floats_as_ids() {
        assert_eq!(parse_id("buyer_id", Some("123")), Ok(123));
        assert_eq!(parse_id("buyer_id", Some(" 123.0 ")), Ok(123));
        assert!(matches!(
            parse_id("buyer_id", Some("12.5")),
            Err(RowError::InvalidId { .. })
        ));
        assert!(matches!(
            parse_id("buyer_id", Some("abc")),
            Err(RowError::InvalidId { .. })
        ));
        assert_eq!(
            parse_id("buyer_id", Some("  ")),
            Err(RowError::MissingField("buyer_id"))
        );
        assert_eq!(parse_id("seller_id", None), Err(RowError::MissingField("seller_id")));
    }

    #[test]
    fn defaults_for_absent_optional_fields() {
        let record = TransactionRecord::try_from(&raw("1", "2")).unwrap();
        assert_eq!(record.transactions, 1);
        assert_eq!(record.buyer_rating, 0);
        assert_eq!(record.seller_rating, None);
        assert_eq!(record.buyer_tags, Tags::default());
    }

    #[test]
    fn ratings_are_bounded() {
        assert_eq!(parse_rating(Some("4.0")), Some(4));
        assert_eq!(parse_rating(Some("9")), Some(MAX_RATING));
        assert_eq!(parse_rating(Some("0")), None);
        assert_eq!(parse_rating(Some("-3")), None);
        assert_eq!(parse_rating(Some("n/a")), None);
    }

    #[test]
    fn rejects_self_loops() {
        assert_eq!(
            TransactionRecord::try_from(&raw("7", "7.0")),
            Err(RowError::SelfLoop(7))
        );
    }

    #[test]
    fn blank_tags_fall_back_to_unknown() {
        let mut row = raw("1", "2");
        row.buyer_main_tag = Some("Fashion".to_string());
        row.buyer_detailed_tag = Some("   ".to_string());
        let record = TransactionRecord::try_from(&row).unwrap();
        assert_eq!(record.buyer_tags.main_tag, "Fashion");
        assert_eq!(record.buyer_tags.detailed_tag, UNKNOWN_TAG);
    }
}
