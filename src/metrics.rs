use std::sync::LazyLock;

use prometheus::*;

use crate::cache::RefreshStats;

static METRIC_MATCH_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("artlens_match_count", "count of match requests", &["status"])
        .unwrap()
});

static METRIC_MATCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!("artlens_match_duration", "duration of the per-query match in seconds")
        .unwrap()
});

static METRIC_MATCH_MAX_SCORE: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "artlens_match_max_score",
        "best score of the per-query match",
        (-10..=10).map(|x| x as f64 / 10.).collect()
    )
    .unwrap()
});

static METRIC_REFRESH_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("artlens_refresh_count", "count of cache refreshes", &["result"])
        .unwrap()
});

static METRIC_CACHE_SIZE: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    register_int_gauge_vec!("artlens_cache_size", "number of cached records", &["kind"]).unwrap()
});

/// 记录一次匹配请求
pub fn inc_match_count(status: &str) {
    METRIC_MATCH_COUNT.with_label_values(&[status]).inc();
}

pub fn observe_match_duration(duration: f32) {
    METRIC_MATCH_DURATION.observe(duration as f64);
}

pub fn observe_match_max_score(score: f32) {
    METRIC_MATCH_MAX_SCORE.observe(score as f64);
}

/// 记录一次成功的刷新
pub fn record_refresh(stats: &RefreshStats) {
    METRIC_REFRESH_COUNT.with_label_values(&["ok"]).inc();
    METRIC_CACHE_SIZE.with_label_values(&["artworks"]).set(stats.artworks as i64);
    METRIC_CACHE_SIZE.with_label_values(&["descriptors"]).set(stats.descriptors as i64);
    METRIC_CACHE_SIZE.with_label_values(&["dropped"]).set(stats.dropped as i64);
}

pub fn inc_refresh_failure() {
    METRIC_REFRESH_COUNT.with_label_values(&["error"]).inc();
}
