//! Responsible for logging statistics with a configured prefix and an
//! optional closing line.

pub mod statistic_logger {
    use std::fmt::Display;
    use std::sync::OnceLock;

    static STATISTIC_PREFIX: OnceLock<&str> = OnceLock::new();
    static AFTER_STATISTICS: OnceLock<Option<&str>> = OnceLock::new();
    static LOG_STATISTICS: OnceLock<bool> = OnceLock::new();

    /// Configures the logging of the statistics.
    ///
    /// It specifies the (optional) prefix and a closing line (postfix) which
    /// is printed after all of the statistics have been logged. Statistics
    /// will only be printed if `log_statistics` is true.
    pub fn configure(log_statistics: bool, prefix: &'static str, after: Option<&'static str>) {
        let _ = LOG_STATISTICS.get_or_init(|| log_statistics);
        if log_statistics {
            let _ = STATISTIC_PREFIX.get_or_init(|| prefix);
            let _ = AFTER_STATISTICS.get_or_init(|| after);
        }
    }

    /// Logs the statistic with the given name and value in the format
    /// `PREFIX name=value`.
    pub fn log_statistic(name: impl Display, value: impl Display) {
        if *LOG_STATISTICS.get().unwrap_or(&false) {
            println!(
                "{} {name}={value}",
                STATISTIC_PREFIX
                    .get()
                    .expect("Statistic logging is enabled but not configured")
            )
        }
    }

    /// Logs the postfix of the statistics (if one has been configured).
    pub fn log_statistic_postfix() {
        if *LOG_STATISTICS.get().unwrap_or(&false) {
            if let Some(post_fix) = AFTER_STATISTICS
                .get()
                .expect("Statistic logging is enabled but not configured")
            {
                println!("{post_fix}")
            }
        }
    }
}
