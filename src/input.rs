//! The validated request handed from the command line to the pipeline.

/// Validated command-line arguments.
///
/// `duration_seconds` is expected to lie within the STS bounds of 900 to
/// 129600 seconds already; the pipeline does not check it again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInput {
    /// One-time code shown by the MFA device.
    pub code: String,
    /// Lifetime of the issued session.
    pub duration_seconds: i32,
    /// MFA device to authenticate with; discovered when absent.
    pub device_arn: Option<String>,
    /// Profile holding long-term credentials.
    pub source_profile: Option<String>,
    /// Profile receiving the session credentials.
    pub destination_profile: String,
    /// Resolve credentials from `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`
    /// instead of a profile.
    pub prefer_env_vars: bool,
}

/// Where the long-term identity comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    /// The SDK's default chain, starting with environment variables.
    Environment,
    /// A named profile in the shared config files.
    Profile(String),
}

impl CommandInput {
    pub fn credential_source(&self) -> CredentialSource {
        if self.prefer_env_vars {
            return CredentialSource::Environment;
        }

        let profile = self
            .source_profile
            .clone()
            .unwrap_or_else(|| default_source_profile(&self.destination_profile));
        CredentialSource::Profile(profile)
    }
}

/// Name of the long-term profile paired with `destination`.
pub fn default_source_profile(destination: &str) -> String {
    format!("{destination}-without-mfa")
}
