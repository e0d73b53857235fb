//! Prometheus metrics (lock-free atomics).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    // --- Claims ---
    pub claims_started: AtomicU64,
    pub claims_succeeded: AtomicU64,
    pub claims_failed: AtomicU64,
    pub claims_rejected_in_flight: AtomicU64,

    // --- Ledger ---
    pub ledger_record_failures: AtomicU64,
    pub onchain_failures: AtomicU64,

    // --- Latency (μs) ---
    pub claim_duration_us_sum: AtomicU64,
    pub claim_duration_us_max: AtomicU64,

    // --- Trail API ---
    pub trail_errors: AtomicU64,
    pub metadata_errors: AtomicU64,

    // --- Activity ---
    pub activity_polls: AtomicU64,
    pub activity_poll_errors: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            claims_started: AtomicU64::new(0),
            claims_succeeded: AtomicU64::new(0),
            claims_failed: AtomicU64::new(0),
            claims_rejected_in_flight: AtomicU64::new(0),
            ledger_record_failures: AtomicU64::new(0),
            onchain_failures: AtomicU64::new(0),
            claim_duration_us_sum: AtomicU64::new(0),
            claim_duration_us_max: AtomicU64::new(0),
            trail_errors: AtomicU64::new(0),
            metadata_errors: AtomicU64::new(0),
            activity_polls: AtomicU64::new(0),
            activity_poll_errors: AtomicU64::new(0),
        }
    }

    pub fn record_claim_duration(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.claim_duration_us_sum.fetch_add(us, Ordering::Relaxed);
        self.claim_duration_us_max.fetch_max(us, Ordering::Relaxed);
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, signed_in: bool) -> String {
        let started = self.claims_started.load(Ordering::Relaxed);
        let succeeded = self.claims_succeeded.load(Ordering::Relaxed);
        let failed = self.claims_failed.load(Ordering::Relaxed);
        let rejected = self.claims_rejected_in_flight.load(Ordering::Relaxed);
        let ledger_failures = self.ledger_record_failures.load(Ordering::Relaxed);
        let onchain_failures = self.onchain_failures.load(Ordering::Relaxed);
        let dur_sum = self.claim_duration_us_sum.load(Ordering::Relaxed);
        let dur_max = self.claim_duration_us_max.swap(0, Ordering::Relaxed);
        let trail_errors = self.trail_errors.load(Ordering::Relaxed);
        let metadata_errors = self.metadata_errors.load(Ordering::Relaxed);
        let polls = self.activity_polls.load(Ordering::Relaxed);
        let poll_errors = self.activity_poll_errors.load(Ordering::Relaxed);

        let dur_sum_s = dur_sum as f64 / 1_000_000.0;
        let dur_max_s = dur_max as f64 / 1_000_000.0;
        let signed_in = u8::from(signed_in);

        format!(
            "\
# HELP claimer_claims_started_total Claim attempts started.\n\
# TYPE claimer_claims_started_total counter\n\
claimer_claims_started_total {started}\n\
# HELP claimer_claims_succeeded_total Claim attempts that ended in Succeeded.\n\
# TYPE claimer_claims_succeeded_total counter\n\
claimer_claims_succeeded_total {succeeded}\n\
# HELP claimer_claims_failed_total Claim attempts that ended in Failed.\n\
# TYPE claimer_claims_failed_total counter\n\
claimer_claims_failed_total {failed}\n\
# HELP claimer_claims_rejected_in_flight_total Claims refused while another was in flight.\n\
# TYPE claimer_claims_rejected_in_flight_total counter\n\
claimer_claims_rejected_in_flight_total {rejected}\n\
# HELP claimer_ledger_record_failures_total Non-fatal execution ledger failures.\n\
# TYPE claimer_ledger_record_failures_total counter\n\
claimer_ledger_record_failures_total {ledger_failures}\n\
# HELP claimer_onchain_failures_total Transactions the ledger reported as failed.\n\
# TYPE claimer_onchain_failures_total counter\n\
claimer_onchain_failures_total {onchain_failures}\n\
# HELP claimer_claim_duration_seconds_sum Total claim time (seconds).\n\
# TYPE claimer_claim_duration_seconds_sum counter\n\
claimer_claim_duration_seconds_sum {dur_sum_s:.6}\n\
# HELP claimer_claim_duration_seconds_max Max claim time since last scrape (seconds).\n\
# TYPE claimer_claim_duration_seconds_max gauge\n\
claimer_claim_duration_seconds_max {dur_max_s:.6}\n\
# HELP claimer_trail_errors_total Trail API request failures.\n\
# TYPE claimer_trail_errors_total counter\n\
claimer_trail_errors_total {trail_errors}\n\
# HELP claimer_metadata_errors_total NFT metadata fetch failures.\n\
# TYPE claimer_metadata_errors_total counter\n\
claimer_metadata_errors_total {metadata_errors}\n\
# HELP claimer_activity_polls_total Activity feed polls.\n\
# TYPE claimer_activity_polls_total counter\n\
claimer_activity_polls_total {polls}\n\
# HELP claimer_activity_poll_errors_total Failed activity feed polls.\n\
# TYPE claimer_activity_poll_errors_total counter\n\
claimer_activity_poll_errors_total {poll_errors}\n\
# HELP claimer_wallet_signed_in Whether a wallet session is active.\n\
# TYPE claimer_wallet_signed_in gauge\n\
claimer_wallet_signed_in {signed_in}\n"
        )
    }
}
