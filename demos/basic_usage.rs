//! Basic logger usage
//!
//! Demonstrates console logging at different severities, structured
//! context fields, and the call-site macros.
//!
//! Run with: cargo run --example basic_usage

use fanlog::prelude::*;

fn main() {
    let logger = Logger::builder("demo")
        .sink(ConsoleSink::new().with_min_severity(Severity::Debug))
        .build();

    logger.debug("debug details, usually filtered in production");
    logger.info("application started");
    logger.warning("cache miss rate climbing");
    logger.error("request failed");

    logger.log_with_context(
        Severity::Info,
        "user signed in",
        RecordContext::new()
            .with_field("user_id", 42)
            .with_field("method", "oauth"),
    );

    // Macros attach the call site to the record.
    fanlog::info!(logger, "processed {} items in {}ms", 128, 73);
    fanlog::error!(logger, "worker {} crashed", 3);

    println!("\nmetrics: {} logged, {} filtered",
        logger.metrics().total_logged(),
        logger.metrics().total_filtered());
}
