//! IAM and STS access for the resolved identity.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use aws_sdk_iam::types;
use log::{debug, info};

use crate::{
    config::ResolvedIdentity,
    context::Context,
    credentials::{SessionCredential, SessionTokenRequest},
    error::Error,
};

/// An MFA device registered to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MfaDevice {
    /// Serial number reported by IAM; the device ARN for virtual devices.
    pub arn: String,
    pub user_name: String,
}

impl From<&types::MfaDevice> for MfaDevice {
    fn from(device: &types::MfaDevice) -> Self {
        Self {
            arn: device.serial_number().to_owned(),
            user_name: device.user_name().to_owned(),
        }
    }
}

/// The two remote calls the pipeline makes.
#[async_trait]
pub trait AwsClient: Send + Sync {
    async fn list_mfa_devices(
        &self,
        ctx: &Context,
        identity: &ResolvedIdentity,
    ) -> Result<Vec<MfaDevice>>;

    async fn get_session_token(
        &self,
        ctx: &Context,
        identity: &ResolvedIdentity,
        request: &SessionTokenRequest,
    ) -> Result<SessionCredential>;
}

/// [`AwsClient`] backed by the AWS SDK.
pub struct SdkAwsClient;

#[async_trait]
impl AwsClient for SdkAwsClient {
    async fn list_mfa_devices(
        &self,
        ctx: &Context,
        identity: &ResolvedIdentity,
    ) -> Result<Vec<MfaDevice>> {
        let client = aws_sdk_iam::Client::new(identity.sdk_config());
        let output = ctx.run(client.list_mfa_devices().send()).await?;

        Ok(output.mfa_devices().iter().map(MfaDevice::from).collect())
    }

    async fn get_session_token(
        &self,
        ctx: &Context,
        identity: &ResolvedIdentity,
        request: &SessionTokenRequest,
    ) -> Result<SessionCredential> {
        let client = aws_sdk_sts::Client::new(identity.sdk_config());
        let output = ctx
            .run(
                client
                    .get_session_token()
                    .serial_number(&request.serial_number)
                    .token_code(&request.token_code)
                    .duration_seconds(request.duration_seconds)
                    .send(),
            )
            .await?;

        output
            .credentials()
            .map(SessionCredential::from)
            .context("No credentials returned")
    }
}

/// Lists the caller's MFA devices with a single, unpaginated call.
pub async fn list_devices(
    ctx: &Context,
    client: &impl AwsClient,
    identity: &ResolvedIdentity,
) -> crate::error::Result<Vec<MfaDevice>> {
    let devices = client
        .list_mfa_devices(ctx, identity)
        .await
        .map_err(|e| Error::ListMfaDevices(e.into()))?;

    debug!("Found {} mfa device(s)", devices.len());
    Ok(devices)
}

/// Picks the only device, refusing to guess when there is none or several.
pub fn select_device(devices: Vec<MfaDevice>) -> crate::error::Result<MfaDevice> {
    let count = devices.len();
    let mut devices = devices.into_iter();

    match (devices.next(), count) {
        (None, _) => Err(Error::NoMfaDevice),
        (Some(device), 1) => {
            info!("Using mfa device: {} ({})", device.arn, device.user_name);
            Ok(device)
        }
        (Some(_), count) => Err(Error::MultipleMfaDevices { count }),
    }
}
