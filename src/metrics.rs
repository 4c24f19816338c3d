use lazy_static::lazy_static;
use prometheus::{
    IntCounter, IntCounterVec, IntGaugeVec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: IntCounter =
        register_int_counter!("gate_requests_total", "Total number of requests seen by the guard").unwrap();
    pub static ref RATE_LIMITED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gate_rate_limited_total",
        "Requests rejected by a rate limiter",
        &["tier"]
    )
    .unwrap();
    pub static ref ADMIN_DENIED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gate_admin_denied_total",
        "Admin route requests refused by the auth guard",
        &["reason"]
    )
    .unwrap();
    pub static ref RATE_LIMIT_ENTRIES: IntGaugeVec = register_int_gauge_vec!(
        "gate_rate_limit_entries",
        "Keys currently tracked per limiter",
        &["tier"]
    )
    .unwrap();
}
