//! Rating incongruence detection between the two parties of a transaction

use serde::{Deserialize, Serialize};

use crate::data::TransactionRecord;

/// Minimum absolute rating gap reported as an incongruence
pub const DEFAULT_MIN_GAP: u8 = 2;

/// A transaction whose two ratings disagree strongly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingIncongruence {
    pub buyer_id: u64,
    pub seller_id: u64,
    pub buyer_rating: u8,
    pub seller_rating: u8,
    pub gap: u8,
}

/// Summary of the incongruence scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncongruenceReport {
    /// Rows where both parties left a positive rating
    pub rated_pairs: usize,
    pub incongruences: Vec<RatingIncongruence>,
}

/// Find transactions where both ratings are known and differ by at
/// least `min_gap`
pub fn find_incongruences(records: &[TransactionRecord], min_gap: u8) -> IncongruenceReport {
    let mut report = IncongruenceReport::default();

    for record in records {
        let seller_rating = match record.seller_rating {
            Some(r) if record.buyer_rating > 0 => r,
            _ => continue,
        };
        report.rated_pairs += 1;

        let gap = record.buyer_rating.abs_diff(seller_rating);
        if gap >= min_gap {
            report.incongruences.push(RatingIncongruence {
                buyer_id: record.buyer_id,
                seller_id: record.seller_id,
                buyer_rating: record.buyer_rating,
                seller_rating,
                gap,
            });
        }
    }

    if report.rated_pairs == 0 {
        log::info!("No mutually rated transactions; incongruence scan skipped");
    } else {
        log::info!(
            "Found {} rating incongruences (gap >= {}) among {} mutually rated transactions",
            report.incongruences.len(),
            min_gap,
            report.rated_pairs
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Tags;

    fn record(buyer_rating: u8, seller_rating: Option<u8>) -> TransactionRecord {
        TransactionRecord {
            buyer_id: 1,
            seller_id: 2,
            transactions: 1,
            buyer_rating,
            seller_rating,
            buyer_tags: Tags::default(),
            seller_tags: Tags::default(),
        }
    }

    #[test]
    fn reports_only_large_gaps_between_known_ratings() {
        let records = vec![
            record(5, Some(3)),
            record(5, Some(4)),
            record(1, Some(5)),
            record(0, Some(5)),
            record(5, None),
        ];

        let report = find_incongruences(&records, DEFAULT_MIN_GAP);
        assert_eq!(report.rated_pairs, 3);
        assert_eq!(report.incongruences.len(), 2);
        assert_eq!(report.incongruences[0].gap, 2);
        assert_eq!(report.incongruences[1].gap, 4);
    }
}
