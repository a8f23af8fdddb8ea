use crate::error::Result;
use crate::models::Tier;

const BADGE_BASE_URL: &str = "https://img.shields.io/badge";
const BADGE_LABEL: &str = "Deployment frequency";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub url: String,
    pub with_metric_url: String,
}

/// Build both shields.io badge URLs for a tier description.
///
/// Fails with `InvalidTier` for anything outside the fixed tier set.
pub fn make_badge(tier_description: &str, deployments_per_day: f64) -> Result<Badge> {
    let tier: Tier = tier_description.parse()?;
    let color = color(tier);
    let message = escape(tier.as_str());

    let url = format!("{BADGE_BASE_URL}/{}-{message}-{color}", escape(BADGE_LABEL));
    let with_metric_url = format!(
        "{BADGE_BASE_URL}/{}-{message}-{color}",
        escape(&format!("{BADGE_LABEL} ({deployments_per_day:.2} per day)"))
    );

    Ok(Badge {
        url,
        with_metric_url,
    })
}

fn color(tier: Tier) -> &'static str {
    match tier {
        Tier::Elite => "brightgreen",
        Tier::High => "green",
        Tier::Medium => "orange",
        Tier::Low => "red",
        Tier::None => "lightgrey",
    }
}

/// shields.io static badge path escaping: dashes and underscores are
/// doubled, spaces become `%20`.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '-' => escaped.push_str("--"),
            '_' => escaped.push_str("__"),
            ' ' => escaped.push_str("%20"),
            '/' => escaped.push_str("%2F"),
            '?' => escaped.push_str("%3F"),
            '#' => escaped.push_str("%23"),
            '%' => escaped.push_str("%25"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployFreqError;

    #[test]
    fn test_elite_badge_with_metric() {
        let badge = make_badge("Elite", 12.0).unwrap();

        assert_eq!(
            badge.url,
            "https://img.shields.io/badge/Deployment%20frequency-Elite-brightgreen"
        );
        assert_eq!(
            badge.with_metric_url,
            "https://img.shields.io/badge/Deployment%20frequency%20(12.00%20per%20day)-Elite-brightgreen"
        );
    }

    #[test]
    fn test_high_badge() {
        let badge = make_badge("High", 0.5).unwrap();

        assert_eq!(
            badge.url,
            "https://img.shields.io/badge/Deployment%20frequency-High-green"
        );
        assert_eq!(
            badge.with_metric_url,
            "https://img.shields.io/badge/Deployment%20frequency%20(0.50%20per%20day)-High-green"
        );
    }

    #[test]
    fn test_medium_badge() {
        let badge = make_badge("Medium", 0.0).unwrap();

        assert_eq!(
            badge.url,
            "https://img.shields.io/badge/Deployment%20frequency-Medium-orange"
        );
    }

    #[test]
    fn test_low_badge() {
        let badge = make_badge("Low", 0.0).unwrap();

        assert_eq!(
            badge.url,
            "https://img.shields.io/badge/Deployment%20frequency-Low-red"
        );
    }

    #[test]
    fn test_none_badge() {
        let badge = make_badge("None", 0.0).unwrap();

        assert_eq!(
            badge.url,
            "https://img.shields.io/badge/Deployment%20frequency-None-lightgrey"
        );
        assert_eq!(
            badge.with_metric_url,
            "https://img.shields.io/badge/Deployment%20frequency%20(0.00%20per%20day)-None-lightgrey"
        );
    }

    #[test]
    fn test_metric_rounds_to_two_decimals() {
        let badge = make_badge("Elite", 10.0 / 7.0).unwrap();

        assert!(badge.with_metric_url.contains("(1.43%20per%20day)"));
    }

    #[test]
    fn test_unknown_tier_is_rejected() {
        let err = make_badge("Excellent", 1.0).unwrap_err();

        assert!(matches!(err, DeployFreqError::InvalidTier(ref t) if t == "Excellent"));
    }

    #[test]
    fn test_escape_doubles_dashes_and_underscores() {
        assert_eq!(escape("a-b_c d"), "a--b__c%20d");
    }
}
