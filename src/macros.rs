/// Similar to `info!` macro in `log`, but timestamped with local time.
/// You can pass in the starting time and it will log how long it took from starting time to now.
/// ```
/// use chrono::Local;
/// use condo_scrap::info_time;
///
/// info_time!("str {}, {}", 1, 2);
/// let time = Local::now();
/// info_time!(time, "str {}, {}", 1, 2);
/// ```
#[macro_export]
macro_rules! info_time {
    ($strfm:literal $(,)? $($arg:expr),*) => {{
        let local_now = ::chrono::Local::now();
        ::log::info!("{:<30} : {}", local_now, format!($strfm, $($arg),*));
    }};
    ($time:expr, $strfm:literal $(,)? $($arg:expr),*) => {{
        let local_now = ::chrono::Local::now();
        let run_time = (local_now - $time)
                .num_microseconds()
                .map(|n| n as f64 / 1_000_000.0)
                .unwrap_or(0.0);
        ::log::info!("{:<30} : {} RUNTIME: {} sec", local_now, format!($strfm, $($arg),*), run_time);
    }};
}
