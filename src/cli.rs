//! Command-line interface definitions.

use std::time::Duration;

use clap::{Parser, ValueEnum, builder::NonEmptyStringValueParser};
use log::LevelFilter;

use crate::input::{CommandInput, default_source_profile};

/// Issue a new session with an MFA device.
///
/// Exchanges a one-time code for temporary credentials using the long-term
/// credentials of `--without-mfa-profile` (or the environment with `--env`)
/// and saves them to `--mfa-profile` with `aws configure set`.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// OTP code shown by the MFA device
    #[arg(short, long, value_parser = parse_code)]
    pub code: String,

    /// How many minutes the new session stays valid (15-2160)
    #[arg(
        short,
        long,
        env = "SESSION_TOKEN_MINUTES",
        default_value_t = 60,
        value_parser = clap::value_parser!(u32).range(15..=2160)
    )]
    pub minutes: u32,

    /// Profile that receives the new session
    #[arg(long, env = "AWS_PROFILE", value_parser = NonEmptyStringValueParser::new())]
    pub mfa_profile: String,

    /// Profile used to issue the session [default: <mfa-profile>-without-mfa]
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub without_mfa_profile: Option<String>,

    /// Use AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY instead of a profile
    #[arg(long)]
    pub env: bool,

    /// ARN of the MFA device [default: the only device of the caller]
    #[arg(long, env = "MFA_DEVICE")]
    pub device_arn: Option<String>,

    /// Log verbosity
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Abort when the whole run takes longer than this many seconds
    #[arg(long, env = "AWS_MFA_TIMEOUT", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl Args {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    pub fn into_input(self) -> CommandInput {
        let source_profile = self
            .without_mfa_profile
            .unwrap_or_else(|| default_source_profile(&self.mfa_profile));

        CommandInput {
            code: self.code,
            // range-checked by clap, so the product fits
            duration_seconds: (self.minutes * 60) as i32,
            device_arn: self.device_arn,
            source_profile: Some(source_profile),
            destination_profile: self.mfa_profile,
            prefer_env_vars: self.env,
        }
    }
}

fn parse_code(value: &str) -> Result<String, String> {
    if value.len() == 6 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(value.to_owned())
    } else {
        Err(format!("{value} must be 6-digit number"))
    }
}
