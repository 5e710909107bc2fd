//! Logger setup for plain text or JSON lines output.

use std::io::Write;

use log::{LevelFilter, Record};
use serde_json::{Value, json};

use crate::cli::LogFormat;

/// Installs the global logger. `RUST_LOG` directives still apply on top of `level`.
pub fn init(level: LevelFilter, format: LogFormat) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);

    if format == LogFormat::Json {
        builder.format(|buf, record| {
            let line = json_record(&buf.timestamp().to_string(), record);
            writeln!(buf, "{line}")
        });
    }

    builder.init();
}

/// One JSON object per record, keyed like structured Go loggers.
fn json_record(time: &str, record: &Record<'_>) -> Value {
    json!({
        "time": time,
        "level": record.level().as_str(),
        "target": record.target(),
        "msg": record.args().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use log::Level;

    use super::*;

    #[test]
    fn record_becomes_a_single_json_object() {
        let value = json_record(
            "2026-10-16T12:00:00Z",
            &Record::builder()
                .args(format_args!("Success! Credentials expire at: {}", "2026-10-16T13:00:00Z"))
                .level(Level::Info)
                .target("aws_mfa_session::updater")
                .build(),
        );

        assert_eq!(
            value,
            json!({
                "time": "2026-10-16T12:00:00Z",
                "level": "INFO",
                "target": "aws_mfa_session::updater",
                "msg": "Success! Credentials expire at: 2026-10-16T13:00:00Z",
            })
        );
        assert!(!value.to_string().contains('\n'));
    }

    #[test]
    fn multi_line_messages_stay_on_one_line() {
        let value = json_record(
            "2026-10-16T12:00:00Z",
            &Record::builder()
                .args(format_args!("first\nsecond"))
                .level(Level::Warn)
                .target("aws_mfa_session")
                .build(),
        );

        assert_eq!(value["msg"], "first\nsecond");
        assert!(!value.to_string().contains('\n'));
    }
}
