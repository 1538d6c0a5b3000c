//! Review validation and rating summaries.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Longest accepted review body, in characters.
pub const MAX_BODY_CHARS: usize = 2000;

/// Longest accepted review title, in characters.
pub const MAX_TITLE_CHARS: usize = 120;

/// Invalid review submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("rating must be between 1 and 5")]
    RatingOutOfRange,
    #[error("review text cannot be empty")]
    EmptyBody,
    #[error("review text must be at most {MAX_BODY_CHARS} characters")]
    BodyTooLong,
    #[error("review title must be at most {MAX_TITLE_CHARS} characters")]
    TitleTooLong,
}

/// A submission that passed validation, with text trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReview {
    pub rating: i16,
    pub title: Option<String>,
    pub body: String,
}

/// Validate and normalise a review submission.
///
/// # Errors
///
/// Returns the first problem found.
pub fn validate(rating: i16, title: Option<&str>, body: &str) -> Result<ValidReview, ReviewError> {
    if !(1..=5).contains(&rating) {
        return Err(ReviewError::RatingOutOfRange);
    }
    let body = body.trim();
    if body.is_empty() {
        return Err(ReviewError::EmptyBody);
    }
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(ReviewError::BodyTooLong);
    }
    let title = title.map(str::trim).filter(|t| !t.is_empty());
    if title.is_some_and(|t| t.chars().count() > MAX_TITLE_CHARS) {
        return Err(ReviewError::TitleTooLong);
    }
    Ok(ValidReview {
        rating,
        title: title.map(str::to_string),
        body: body.to_string(),
    })
}

/// Aggregate of a product's ratings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingSummary {
    pub count: usize,
    /// Mean rating rounded to one decimal, `None` without reviews.
    pub average: Option<Decimal>,
    /// Counts for 1 through 5 stars, in that order.
    pub distribution: [usize; 5],
}

impl RatingSummary {
    /// Summarise ratings; values outside `1..=5` are ignored.
    #[must_use]
    pub fn from_ratings(ratings: impl IntoIterator<Item = i16>) -> Self {
        let mut distribution = [0usize; 5];
        let mut sum: i64 = 0;
        let mut count = 0usize;
        for rating in ratings {
            let Some(bucket) = usize::try_from(i32::from(rating) - 1)
                .ok()
                .and_then(|idx| distribution.get_mut(idx))
            else {
                continue;
            };
            *bucket += 1;
            sum += i64::from(rating);
            count += 1;
        }

        let average = (count > 0).then(|| {
            (Decimal::from(sum) / Decimal::from(count)).round_dp_with_strategy(
                1,
                rust_decimal::RoundingStrategy::MidpointAwayFromZero,
            )
        });

        Self {
            count,
            average,
            distribution,
        }
    }
}
