#[doc(hidden)]
#[macro_export]
macro_rules! dict {
    ($($key:expr => $value:expr),* $(,)?) => ({
        #[allow(unused_mut)]
        let mut dict: $crate::value::Dict = $crate::value::Dict::new();
        $(dict.insert($key.into(), $value.into());)*
        dict
    });
}

/// Evaluates the block, logging how long it took at `debug`.
#[doc(hidden)]
#[macro_export]
macro_rules! time {
    ($what:expr => $($token:tt)*) => ({
        let start = std::time::Instant::now();
        let value = { $($token)* };
        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "{} finished", $what,
        );

        value
    });
}

pub use {dict, time};
