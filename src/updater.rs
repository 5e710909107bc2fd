//! MFA session updater
//!
//! Runs the linear pipeline that turns a one-time MFA code into a saved
//! session profile:
//!
//! 1. resolve the long-term identity (environment or source profile)
//! 2. discover the caller's MFA device when none was given
//! 3. exchange the code for temporary credentials with STS
//! 4. write the credentials into the destination profile
//!
//! The first failing step ends the run. Nothing is retried, and a profile
//! that was partially written before a failure is left as is.

use log::info;

use crate::{
    client::{self, AwsClient, SdkAwsClient},
    config::{ConfigResolver, Environment, IdentityLoader, ProcessEnvironment, SdkIdentityLoader},
    context::Context,
    credentials::{self, SessionTokenRequest},
    error::Result,
    input::CommandInput,
    profile::{self, AwsCli, ProfileWriter},
};

/// Issues MFA sessions and saves them to a profile.
pub struct MfaSessionUpdater<E, L, C, W> {
    resolver: ConfigResolver<E, L>,
    client: C,
    writer: W,
}

/// The updater wired to the process environment, the AWS SDK and the `aws` CLI.
pub type DefaultUpdater = MfaSessionUpdater<ProcessEnvironment, SdkIdentityLoader, SdkAwsClient, AwsCli>;

impl DefaultUpdater {
    pub fn with_cli(cli: AwsCli) -> Self {
        Self::new(ConfigResolver::from_process(), SdkAwsClient, cli)
    }
}

impl<E, L, C, W> MfaSessionUpdater<E, L, C, W>
where
    E: Environment,
    L: IdentityLoader,
    C: AwsClient,
    W: ProfileWriter,
{
    pub fn new(resolver: ConfigResolver<E, L>, client: C, writer: W) -> Self {
        Self {
            resolver,
            client,
            writer,
        }
    }

    /// Issues a session for `input` and saves it to its destination profile.
    ///
    /// Device discovery only runs when `input` carries no device ARN. The
    /// input itself is never modified; the discovered ARN goes into a new
    /// [`SessionTokenRequest`].
    ///
    /// # Arguments
    ///
    /// * `ctx` - Cancellation and deadline scope shared by every step
    /// * `input` - Validated command-line arguments
    ///
    /// # Returns
    ///
    /// * `Ok(())` - All four profile properties were written
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step unchanged:
    /// * Identity resolution: `Error::LoadDefaultConfig`, `Error::LoadSharedConfig`,
    ///   `Error::RetrieveCredentials`
    /// * Device discovery: `Error::ListMfaDevices`, `Error::NoMfaDevice`,
    ///   `Error::MultipleMfaDevices`
    /// * Token exchange: `Error::GetSessionToken`
    /// * Persistence: `Error::Configure`, possibly after earlier fields were written
    pub async fn issue_and_save(&self, ctx: &Context, input: &CommandInput) -> Result<()> {
        let identity = self.resolver.resolve(ctx, input).await?;

        let device_arn = match &input.device_arn {
            Some(arn) => arn.clone(),
            None => {
                let devices = client::list_devices(ctx, &self.client, &identity).await?;
                client::select_device(devices)?.arn
            }
        };

        let request = SessionTokenRequest::new(input, device_arn);
        let credential = credentials::exchange(ctx, &self.client, &identity, &request).await?;

        profile::persist(ctx, &self.writer, &input.destination_profile, &credential).await?;

        match credential.expiration_date() {
            Ok(expiration) => info!("Success! Credentials expire at: {expiration}"),
            Err(_) => info!("Success! Credentials saved to profile: {}", input.destination_profile),
        }
        Ok(())
    }
}
