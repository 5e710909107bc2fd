//! Resolution of the long-term AWS identity used to request a session.
//!
//! Resolution happens in two explicit steps:
//!
//! 1. [`prepare_environment`] removes the process variables that would
//!    otherwise leak a previous session or profile selection into the SDK's
//!    default chain.
//! 2. An [`IdentityLoader`] loads the SDK configuration for the selected
//!    [`CredentialSource`] and retrieves the credentials once, so a broken
//!    profile fails here instead of on the first IAM/STS call.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::{
    ProvideCredentials, SharedCredentialsProvider, error::CredentialsError,
};
use log::{debug, info};

use crate::{
    context::Context,
    error::{BoxError, Error, Result},
    input::{CommandInput, CredentialSource},
};

pub const AWS_PROFILE: &str = "AWS_PROFILE";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// IAM is global and STS accepts any region, so a missing region is not an error.
const FALLBACK_REGION: &str = "us-east-1";

/// Process-wide variables the resolver is allowed to remove.
pub trait Environment: Send + Sync {
    fn remove(&self, key: &str);
}

impl<T: Environment + ?Sized> Environment for Arc<T> {
    fn remove(&self, key: &str) {
        (**self).remove(key);
    }
}

/// The real process environment.
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn remove(&self, key: &str) {
        // SAFETY: the binary runs on a current-thread runtime and the
        // environment is prepared before any SDK call that could read it.
        unsafe { std::env::remove_var(key) }
    }
}

/// Clears the variables that must not influence resolution of `source`.
pub fn prepare_environment(env: &impl Environment, source: &CredentialSource) {
    env.remove(AWS_PROFILE);
    env.remove(AWS_SESSION_TOKEN);

    if let CredentialSource::Profile(_) = source {
        env.remove(AWS_ACCESS_KEY_ID);
        env.remove(AWS_SECRET_ACCESS_KEY);
    }
}

/// An authenticated SDK configuration, valid for a single pipeline run.
#[derive(Clone, Debug)]
pub struct ResolvedIdentity {
    config: SdkConfig,
    source: CredentialSource,
}

impl ResolvedIdentity {
    pub fn new(config: SdkConfig, source: CredentialSource) -> Self {
        Self { config, source }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }
}

/// Loads and validates the identity for a credential source.
#[async_trait]
pub trait IdentityLoader: Send + Sync {
    async fn load(&self, ctx: &Context, source: &CredentialSource) -> Result<ResolvedIdentity>;
}

/// Loads identities with `aws-config`'s default provider chain.
pub struct SdkIdentityLoader;

#[async_trait]
impl IdentityLoader for SdkIdentityLoader {
    async fn load(&self, ctx: &Context, source: &CredentialSource) -> Result<ResolvedIdentity> {
        let loader = aws_config::defaults(BehaviorVersion::latest());
        let loader = match source {
            CredentialSource::Environment => loader,
            CredentialSource::Profile(profile) => loader.profile_name(profile),
        };

        let config = ctx
            .run(async { Ok::<_, std::convert::Infallible>(loader.load().await) })
            .await
            .map_err(|e| config_error(source, e.into()))?;

        let config = with_fallback_region(config);
        let provider = credentials_provider(&config, source)?;

        let credentials = ctx
            .run(provider.provide_credentials())
            .await
            .map_err(|e| classify_retrieval_error(source, e))?;

        debug!(
            "Retrieved base credentials ({}...)",
            credentials.access_key_id().chars().take(4).collect::<String>()
        );

        // Pin the validated credentials so IAM and STS calls reuse them
        // instead of walking the provider chain a second time.
        let config = config
            .into_builder()
            .credentials_provider(SharedCredentialsProvider::new(credentials))
            .build();

        Ok(ResolvedIdentity::new(config, source.clone()))
    }
}

fn with_fallback_region(config: SdkConfig) -> SdkConfig {
    match config.region() {
        Some(region) => {
            debug!("Using region: {region}");
            config
        }
        None => {
            debug!("No region configured, using {FALLBACK_REGION}");
            config
                .into_builder()
                .region(Region::new(FALLBACK_REGION))
                .build()
        }
    }
}

fn credentials_provider(
    config: &SdkConfig,
    source: &CredentialSource,
) -> Result<SharedCredentialsProvider> {
    config
        .credentials_provider()
        .ok_or_else(|| config_error(source, anyhow!("no credentials provider configured").into()))
}

/// A provider rejecting its configuration is a config-load failure of the
/// active branch; anything else, cancellation included, is a retrieval failure.
fn classify_retrieval_error(source: &CredentialSource, cause: anyhow::Error) -> Error {
    let invalid_config = matches!(
        cause.downcast_ref::<CredentialsError>(),
        Some(CredentialsError::InvalidConfiguration(_))
    );

    if invalid_config {
        config_error(source, cause.into())
    } else {
        Error::RetrieveCredentials(cause.into())
    }
}

fn config_error(source: &CredentialSource, cause: BoxError) -> Error {
    match source {
        CredentialSource::Environment => Error::LoadDefaultConfig(cause),
        CredentialSource::Profile(profile) => Error::LoadSharedConfig {
            profile: profile.clone(),
            source: cause,
        },
    }
}

/// Resolves the base identity for a [`CommandInput`].
pub struct ConfigResolver<E, L> {
    env: E,
    loader: L,
}

impl ConfigResolver<ProcessEnvironment, SdkIdentityLoader> {
    pub fn from_process() -> Self {
        Self::new(ProcessEnvironment, SdkIdentityLoader)
    }
}

impl<E: Environment, L: IdentityLoader> ConfigResolver<E, L> {
    pub fn new(env: E, loader: L) -> Self {
        Self { env, loader }
    }

    /// Resolves the long-term identity selected by `input`.
    ///
    /// The process environment is prepared first, every time, so a profile
    /// or session token left over from an earlier shell cannot leak into the
    /// provider chain. The loader then retrieves the credentials once.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Bounds the config load and the credential retrieval
    /// * `input` - Selects environment or profile based resolution
    ///
    /// # Returns
    ///
    /// * `Ok(ResolvedIdentity)` - An SDK configuration with validated credentials
    ///
    /// # Errors
    ///
    /// * [`Error::LoadDefaultConfig`] - The default chain is misconfigured
    /// * [`Error::LoadSharedConfig`] - The source profile is missing or misconfigured
    /// * [`Error::RetrieveCredentials`] - Credentials could not be retrieved
    pub async fn resolve(&self, ctx: &Context, input: &CommandInput) -> Result<ResolvedIdentity> {
        let source = input.credential_source();
        prepare_environment(&self.env, &source);

        match &source {
            CredentialSource::Environment => info!("Loading credentials from the environment"),
            CredentialSource::Profile(profile) => info!("Loading credentials from profile: {profile}"),
        }

        let identity = self.loader.load(ctx, &source).await?;
        debug!("Resolved identity from {:?}", identity.source());
        Ok(identity)
    }
}
