use std::fmt;

use aws_sdk_sts::types;
use aws_smithy_types::{
    DateTime,
    date_time::{DateTimeFormatError, Format},
};
use log::info;

use crate::{
    client::AwsClient,
    config::ResolvedIdentity,
    context::Context,
    error::{Error, Result},
    input::CommandInput,
};

/// Parameters of an STS `GetSessionToken` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionTokenRequest {
    pub serial_number: String,
    pub token_code: String,
    pub duration_seconds: i32,
}

impl SessionTokenRequest {
    /// Builds the request for `input` authenticated with `device_arn`.
    pub fn new(input: &CommandInput, device_arn: impl Into<String>) -> Self {
        Self {
            serial_number: device_arn.into(),
            token_code: input.code.clone(),
            duration_seconds: input.duration_seconds,
        }
    }
}

/// Temporary credentials returned by STS.
#[derive(Clone, PartialEq)]
pub struct SessionCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
}

impl SessionCredential {
    /// Expiration in RFC 3339 form (`2026-10-16T12:00:00Z`), as written to the
    /// profile's `expiration_date`.
    ///
    /// Go based tools write the same property as `2026-10-16 12:00:00 +0000 UTC`;
    /// readers that compare the raw string need to accept both forms.
    pub fn expiration_date(&self) -> std::result::Result<String, DateTimeFormatError> {
        self.expiration.fmt(Format::DateTime)
    }
}

impl From<&types::Credentials> for SessionCredential {
    fn from(credentials: &types::Credentials) -> Self {
        Self {
            access_key_id: credentials.access_key_id().to_owned(),
            secret_access_key: credentials.secret_access_key().to_owned(),
            session_token: credentials.session_token().to_owned(),
            expiration: *credentials.expiration(),
        }
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Exchanges an MFA code for session credentials.
///
/// Makes exactly one `sts:GetSessionToken` call with the request forwarded
/// unmodified. Never retried: codes are single use.
///
/// # Arguments
///
/// * `ctx` - Bounds the STS call
/// * `client` - Performs the call
/// * `identity` - Long-term identity signing the request
/// * `request` - Device ARN, OTP code and session duration
///
/// # Returns
///
/// * `Ok(SessionCredential)` - Temporary credentials and their expiration
///
/// # Errors
///
/// * [`Error::GetSessionToken`] - STS rejected the code, returned no
///   credentials, or the call was interrupted
pub async fn exchange(
    ctx: &Context,
    client: &impl AwsClient,
    identity: &ResolvedIdentity,
    request: &SessionTokenRequest,
) -> Result<SessionCredential> {
    info!(
        "Fetching session token - Device: {}, Duration: {}s",
        request.serial_number, request.duration_seconds
    );

    client
        .get_session_token(ctx, identity, request)
        .await
        .map_err(|e| Error::GetSessionToken(e.into()))
}
