pub mod results_log;

pub use results_log::{append_report, read_history, ResultRow};
