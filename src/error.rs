use thiserror::Error;

use crate::profile::ProfileField;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every way issuing and saving a session can fail.
///
/// Variants that wrap another failure keep it as their source, so the full
/// causal chain stays available to the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot load default config")]
    LoadDefaultConfig(#[source] BoxError),

    #[error("cannot load shared config for profile `{profile}`")]
    LoadSharedConfig {
        profile: String,
        #[source]
        source: BoxError,
    },

    #[error("cannot retrieve AWS credentials")]
    RetrieveCredentials(#[source] BoxError),

    #[error("failed to list mfa devices from iam service (iam:ListMFADevices)")]
    ListMfaDevices(#[source] BoxError),

    #[error("no mfa device was found")]
    NoMfaDevice,

    #[error("only one mfa device is allowed but {count} were found; pass --device-arn to pick one")]
    MultipleMfaDevices { count: usize },

    #[error("failed to get a session token from sts service (sts:GetSessionToken)")]
    GetSessionToken(#[source] BoxError),

    #[error("cannot configure {field}")]
    Configure {
        field: ProfileField,
        #[source]
        source: BoxError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
