use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    /// 1 through 5 inclusive.
    pub rating: u8,
    pub comment: String,
}

/// Rolling average over an append-only review log, rounded to 1 decimal.
/// Recomputed as a pure fold and stored alongside the append.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }

    let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    let mean = sum as f64 / reviews.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::{Review, average_rating};
    use uuid::Uuid;

    fn review(rating: u8) -> Review {
        Review {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            customer_name: "test-customer".to_string(),
            rating,
            comment: String::new(),
        }
    }

    #[test]
    fn empty_log_averages_to_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        let reviews = vec![review(5), review(4), review(4)];
        assert_eq!(average_rating(&reviews), 4.3);
    }

    #[test]
    fn single_review_is_its_own_average() {
        assert_eq!(average_rating(&[review(2)]), 2.0);
    }
}
