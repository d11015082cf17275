// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Structured trace logging shared by the relay crates

/// Emits a `trace!` line tagged with an event name and a JSON payload.
///
/// ```
/// # use relay_logging::relay_trace;
/// relay_trace!("pos.begin_block", { "height": 12, "votes": 3 });
/// ```
#[macro_export]
macro_rules! relay_trace {
    ($evt:expr, $params:tt) => {
        tracing::trace!("relay_trace:{}:{}", $evt, serde_json::json!($params));
    };
}
