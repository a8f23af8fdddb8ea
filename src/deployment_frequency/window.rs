use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};

use crate::models::Build;

/// Window, order, truncate and annotate builds.
///
/// Returns the truncated list together with the number of builds that fell
/// inside the window before truncation.
pub fn normalize(
    builds: Vec<Build>,
    window_days: u32,
    max_items: usize,
    now: DateTime<Utc>,
) -> (Vec<Build>, usize) {
    let window_start = now - Duration::days(i64::from(window_days));

    let mut windowed: Vec<Build> = builds
        .into_iter()
        .filter(|b| b.start_time >= window_start && b.start_time <= now)
        .collect();
    let total_items = windowed.len();

    // Stable sort keeps insertion order for non-numeric ties
    windowed.sort_by(|a, b| {
        b.start_time
            .cmp(&a.start_time)
            .then_with(|| compare_build_numbers_desc(&a.build_number, &b.build_number))
    });
    windowed.truncate(max_items);

    apply_duration_percent(&mut windowed);

    (windowed, total_items)
}

fn compare_build_numbers_desc(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => b.cmp(&a),
        _ => Ordering::Equal,
    }
}

/// Percent of each build's duration relative to the longest finished build.
pub fn apply_duration_percent(builds: &mut [Build]) {
    let longest = builds
        .iter()
        .filter(|b| b.end_time.is_some())
        .map(Build::duration_seconds)
        .max()
        .unwrap_or(0);

    for build in builds.iter_mut() {
        build.build_duration_percent = duration_percent(build.duration_seconds(), longest);
    }
}

fn duration_percent(duration: i64, longest: i64) -> u32 {
    if longest <= 0 {
        return 0;
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let percent = ((duration as f64 / longest as f64) * 100.0).round() as u32;
    percent
}
