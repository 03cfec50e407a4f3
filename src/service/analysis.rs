use crate::model::models::{EcoTier, TrendClassification};

/**
 * Estimates the trend of a series as the slope of an ordinary least squares
 * degree-1 fit of value against its 0-based index.
 *
 * Series with two or fewer points return a slope of exactly 0. Short series
 * produce noisy fits, so they are deliberately treated as trendless rather
 * than extrapolated.
 *
 * # Arguments
 * `series`: The date-ordered values.
 *
 * # Returns
 * The slope coefficient.
 */
pub fn estimate_trend(series: &[f64]) -> f64 {
    if series.len() <= 2 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = series.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (index, value) in series.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let x = index as f64;
        sum_x += x;
        sum_y += value;
        sum_xy += x * value;
        sum_xx += x * x;
    }
    (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x)
}

/**
 * Classifies the plastic trend against the organic trend.
 *
 * # Arguments
 * `plastic_slope`: Trend slope of the plastic series.
 * `organic_slope`: Trend slope of the organic series.
 *
 * # Returns
 * The trend classification. Equal slopes, including the all-zero case from
 * short series, classify as stable.
 */
pub fn classify_trend(plastic_slope: f64, organic_slope: f64) -> TrendClassification {
    if plastic_slope > organic_slope {
        TrendClassification::PlasticRising
    } else if organic_slope > plastic_slope {
        TrendClassification::OrganicRising
    } else {
        TrendClassification::Stable
    }
}

/**
 * Computes the eco score from total plastic and organic quantities.
 *
 * The score is `100 - plastic / (plastic + organic) * 100` rounded to two
 * decimals. A zero total substitutes the denominator with 1, so an
 * institution without any waste scores exactly 100.
 *
 * # Arguments
 * `total_plastic`: Total plastic quantity in kg.
 * `total_organic`: Total organic quantity in kg.
 *
 * # Returns
 * The eco score in the range 0 to 100.
 */
pub fn eco_score(total_plastic: f64, total_organic: f64) -> f64 {
    let total = total_plastic + total_organic;
    let denominator = if total > 0.0 { total } else { 1.0 };
    round2(100.0 - (total_plastic / denominator * 100.0))
}

/**
 * Maps an eco score to its tier. The boundary values 60 and 80 belong to the
 * higher tier.
 *
 * # Arguments
 * `eco_score`: The eco score.
 *
 * # Returns
 * The tier of the score.
 */
pub fn score_tier(eco_score: f64) -> EcoTier {
    if eco_score < 60.0 {
        EcoTier::HighPlasticAlert
    } else if eco_score < 80.0 {
        EcoTier::Moderate
    } else {
        EcoTier::Excellent
    }
}

/**
 * Rounds a value to two decimal places.
 *
 * # Arguments
 * `value`: The value to round.
 *
 * # Returns
 * The rounded value.
 */
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_estimate_trend_empty_series() {
        assert_eq!(estimate_trend(&[]), 0.0);
    }

    #[test]
    fn test_estimate_trend_single_point() {
        assert_eq!(estimate_trend(&[5.0]), 0.0);
    }

    #[test]
    fn test_estimate_trend_two_points() {
        assert_eq!(estimate_trend(&[1.0, 100.0]), 0.0);
    }

    #[test]
    fn test_estimate_trend_rising_series() {
        let slope = estimate_trend(&[1.0, 2.0, 3.0]);
        assert!((slope - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_trend_falling_series() {
        let slope = estimate_trend(&[3.0, 2.0, 1.0]);
        assert!((slope + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_trend_flat_series() {
        let slope = estimate_trend(&[4.0, 4.0, 4.0, 4.0]);
        assert!(slope.abs() < 1e-9);
    }

    #[test]
    fn test_estimate_trend_noisy_series() {
        // Least squares fit of [0, 2, 1, 3] has slope 0.8.
        let slope = estimate_trend(&[0.0, 2.0, 1.0, 3.0]);
        assert!((slope - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_classify_trend_plastic_rising() {
        assert_eq!(classify_trend(2.0, 1.0), TrendClassification::PlasticRising);
    }

    #[test]
    fn test_classify_trend_organic_rising() {
        assert_eq!(classify_trend(1.0, 2.0), TrendClassification::OrganicRising);
    }

    #[test]
    fn test_classify_trend_stable_on_equal_slopes() {
        assert_eq!(classify_trend(1.5, 1.5), TrendClassification::Stable);
        assert_eq!(classify_trend(0.0, 0.0), TrendClassification::Stable);
    }

    #[test]
    fn test_eco_score_no_waste_scores_perfect() {
        assert_eq!(eco_score(0.0, 0.0), 100.0);
    }

    #[test]
    fn test_eco_score_all_plastic_scores_zero() {
        assert_eq!(eco_score(100.0, 0.0), 0.0);
    }

    #[test]
    fn test_eco_score_mixed() {
        assert_eq!(eco_score(20.0, 80.0), 80.0);
    }

    #[test]
    fn test_eco_score_rounded_to_two_decimals() {
        assert_eq!(eco_score(25.0, 175.0), 87.5);
        assert_eq!(eco_score(1.0, 2.0), 66.67);
    }

    #[test]
    fn test_score_tier_boundaries_belong_to_higher_tier() {
        assert_eq!(score_tier(59.99), EcoTier::HighPlasticAlert);
        assert_eq!(score_tier(60.0), EcoTier::Moderate);
        assert_eq!(score_tier(79.99), EcoTier::Moderate);
        assert_eq!(score_tier(80.0), EcoTier::Excellent);
        assert_eq!(score_tier(100.0), EcoTier::Excellent);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(100.0 / 3.0), 33.33);
        assert_eq!(round2(200.0 / 3.0), 66.67);
    }
}
