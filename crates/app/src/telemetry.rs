use tracing::{info, warn};
use txadvisor_storage::sqlite_contention_snapshot;

pub(crate) fn format_error_chain(error: &anyhow::Error) -> String {
    let mut chain = String::new();
    for (idx, cause) in error.chain().enumerate() {
        if idx > 0 {
            chain.push_str(" | ");
        }
        chain.push_str(&cause.to_string());
    }
    chain
}

pub(crate) fn log_runtime_summary(active_watches: usize, previous_busy_total: &mut u64) {
    let contention = sqlite_contention_snapshot();
    let busy_delta = contention
        .busy_error_total
        .saturating_sub(*previous_busy_total);
    *previous_busy_total = contention.busy_error_total;
    if busy_delta > 0 {
        warn!(
            busy_delta,
            busy_error_total = contention.busy_error_total,
            write_retry_total = contention.write_retry_total,
            "sqlite contention observed"
        );
    }
    info!(
        active_watches,
        sqlite_write_retry_total = contention.write_retry_total,
        "advisor alive"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn error_chain_joins_causes_outermost_first() {
        let error = Err::<(), _>(anyhow!("connection refused"))
            .context("failed to bind web server on 127.0.0.1:4000")
            .expect_err("error expected");
        assert_eq!(
            format_error_chain(&error),
            "failed to bind web server on 127.0.0.1:4000 | connection refused"
        );
    }
}
