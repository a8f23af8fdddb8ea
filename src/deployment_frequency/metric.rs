use crate::models::Tier;

/// Deployments per day over the window, and its DORA tier.
///
/// Tier boundaries are compared on integers (`total * k >= days`) so that
/// exactly one deployment per week or per month lands in the higher tier.
pub fn compute(total_items: usize, window_days: u32) -> (f64, Tier) {
    let days = window_days.max(1);

    #[allow(clippy::cast_precision_loss)]
    let per_day = total_items as f64 / f64::from(days);

    (per_day, classify(total_items, days))
}

fn classify(total_items: usize, days: u32) -> Tier {
    let total = total_items as u128;
    let days = u128::from(days);

    if total >= days {
        Tier::Elite
    } else if total * 7 >= days {
        Tier::High
    } else if total * 30 >= days {
        Tier::Medium
    } else if total > 0 {
        Tier::Low
    } else {
        Tier::None
    }
}
