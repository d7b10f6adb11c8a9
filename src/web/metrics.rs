use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static HTTP_REQUESTS: AtomicU64 = AtomicU64::new(0);
static HTTP_ERRORS: AtomicU64 = AtomicU64::new(0);
static AUTH_FAILURES: AtomicU64 = AtomicU64::new(0);
static BOOKINGS_CREATED: AtomicU64 = AtomicU64::new(0);
static CHECK_INS: AtomicU64 = AtomicU64::new(0);
static CHECK_OUTS: AtomicU64 = AtomicU64::new(0);
static CHAT_MESSAGES: AtomicU64 = AtomicU64::new(0);
static PAYMENTS_RECORDED: AtomicU64 = AtomicU64::new(0);
static REFUNDS: AtomicU64 = AtomicU64::new(0);

pub struct Metrics;

impl Metrics {
    pub fn http_request(status: u16) {
        HTTP_REQUESTS.fetch_add(1, Ordering::Relaxed);
        if status >= 500 {
            HTTP_ERRORS.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn auth_failure() {
        AUTH_FAILURES.fetch_add(1, Ordering::Relaxed);
    }

    pub fn booking_created() {
        BOOKINGS_CREATED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn check_in() {
        CHECK_INS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn check_out() {
        CHECK_OUTS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn chat_message() {
        CHAT_MESSAGES.fetch_add(1, Ordering::Relaxed);
    }

    pub fn payment_recorded() {
        PAYMENTS_RECORDED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refund() {
        REFUNDS.fetch_add(1, Ordering::Relaxed);
    }
}

struct Counter {
    name: &'static str,
    help: &'static str,
    kind: &'static str,
    value: u64,
}

pub fn format_prometheus(started_at: Instant) -> String {
    let counters = [
        Counter {
            name: "hrs_uptime_seconds",
            help: "Number of seconds the server has been running",
            kind: "gauge",
            value: started_at.elapsed().as_secs(),
        },
        Counter {
            name: "hrs_http_requests_total",
            help: "HTTP requests handled",
            kind: "counter",
            value: HTTP_REQUESTS.load(Ordering::Relaxed),
        },
        Counter {
            name: "hrs_http_errors_total",
            help: "HTTP responses with a 5xx status",
            kind: "counter",
            value: HTTP_ERRORS.load(Ordering::Relaxed),
        },
        Counter {
            name: "hrs_auth_failures_total",
            help: "Requests rejected for a missing or unknown token",
            kind: "counter",
            value: AUTH_FAILURES.load(Ordering::Relaxed),
        },
        Counter {
            name: "hrs_bookings_created_total",
            help: "Room bookings created",
            kind: "counter",
            value: BOOKINGS_CREATED.load(Ordering::Relaxed),
        },
        Counter {
            name: "hrs_check_ins_total",
            help: "Guests checked in",
            kind: "counter",
            value: CHECK_INS.load(Ordering::Relaxed),
        },
        Counter {
            name: "hrs_check_outs_total",
            help: "Guests checked out",
            kind: "counter",
            value: CHECK_OUTS.load(Ordering::Relaxed),
        },
        Counter {
            name: "hrs_chat_messages_total",
            help: "Chat messages posted by customers or staff",
            kind: "counter",
            value: CHAT_MESSAGES.load(Ordering::Relaxed),
        },
        Counter {
            name: "hrs_payments_recorded_total",
            help: "Payments recorded",
            kind: "counter",
            value: PAYMENTS_RECORDED.load(Ordering::Relaxed),
        },
        Counter {
            name: "hrs_refunds_total",
            help: "Payments refunded",
            kind: "counter",
            value: REFUNDS.load(Ordering::Relaxed),
        },
    ];

    let mut out = String::new();
    for counter in counters {
        out.push_str(&format!(
            "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n",
            name = counter.name,
            help = counter.help,
            kind = counter.kind,
            value = counter.value,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::{format_prometheus, Metrics};

    #[test]
    fn renders_every_counter_with_help_and_type() {
        Metrics::http_request(503);
        Metrics::refund();
        let text = format_prometheus(Instant::now());
        assert!(text.contains("# TYPE hrs_uptime_seconds gauge\n"));
        assert!(text.contains("# HELP hrs_refunds_total Payments refunded\n"));
        assert_eq!(text.matches("# TYPE").count(), 10);

        let errors = text
            .lines()
            .find_map(|line| line.strip_prefix("hrs_http_errors_total "))
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap();
        assert!(errors >= 1);
    }
}
