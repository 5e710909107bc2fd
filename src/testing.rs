//! In-memory doubles for the pipeline's capabilities.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_smithy_types::DateTime;

use crate::{
    client::{AwsClient, MfaDevice},
    config::{Environment, IdentityLoader, ResolvedIdentity},
    context::Context,
    credentials::{SessionCredential, SessionTokenRequest},
    error::Error,
    input::{CommandInput, CredentialSource},
    profile::{ProfileField, ProfileWriter},
};

/// The scenario input: profile-based resolution for `work`, no device given.
pub fn command_input() -> CommandInput {
    CommandInput {
        code: "123456".into(),
        duration_seconds: 3600,
        device_arn: None,
        source_profile: Some("work-without-mfa".into()),
        destination_profile: "work".into(),
        prefer_env_vars: false,
    }
}

pub fn identity() -> ResolvedIdentity {
    ResolvedIdentity::new(
        SdkConfig::builder().build(),
        CredentialSource::Profile("work-without-mfa".into()),
    )
}

pub fn device(arn: &str) -> MfaDevice {
    MfaDevice {
        arn: arn.into(),
        user_name: "alice".into(),
    }
}

/// Expires at 2026-10-16T12:00:00Z.
pub fn session_credential() -> SessionCredential {
    SessionCredential {
        access_key_id: "ASIAEXAMPLE".into(),
        secret_access_key: "session-secret".into(),
        session_token: "session-token".into(),
        expiration: DateTime::from_secs(1_792_152_000),
    }
}

/// The writes [`session_credential`] produces for `profile`, in order.
pub fn expected_writes(profile: &str) -> Vec<(String, String, String)> {
    [
        ("aws_access_key_id", "ASIAEXAMPLE"),
        ("aws_secret_access_key", "session-secret"),
        ("aws_session_token", "session-token"),
        ("expiration_date", "2026-10-16T12:00:00Z"),
    ]
    .into_iter()
    .map(|(name, value)| (profile.to_owned(), name.to_owned(), value.to_owned()))
    .collect()
}

#[derive(Default)]
pub struct MemoryEnvironment {
    vars: Mutex<BTreeMap<String, String>>,
}

impl MemoryEnvironment {
    pub fn with<'a>(vars: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Self {
            vars: Mutex::new(vars),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.lock().unwrap().get(key).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.vars.lock().unwrap().clone()
    }
}

impl Environment for MemoryEnvironment {
    fn remove(&self, key: &str) {
        self.vars.lock().unwrap().remove(key);
    }
}

/// Returns a fixed identity and records the environment it was loaded under.
pub struct StaticIdentityLoader {
    env: Arc<MemoryEnvironment>,
    fail: bool,
    snapshots: Mutex<Vec<BTreeMap<String, String>>>,
}

impl StaticIdentityLoader {
    pub fn observing(env: Arc<MemoryEnvironment>) -> Self {
        Self {
            env,
            fail: false,
            snapshots: Mutex::default(),
        }
    }

    /// Fails every load as if the credentials could not be retrieved.
    pub fn failing(env: Arc<MemoryEnvironment>) -> Self {
        Self {
            fail: true,
            ..Self::observing(env)
        }
    }

    pub fn snapshots(&self) -> Vec<BTreeMap<String, String>> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityLoader for StaticIdentityLoader {
    async fn load(
        &self,
        _ctx: &Context,
        source: &CredentialSource,
    ) -> crate::error::Result<ResolvedIdentity> {
        self.snapshots.lock().unwrap().push(self.env.snapshot());

        if self.fail {
            return Err(Error::RetrieveCredentials("no credentials in chain".into()));
        }
        Ok(ResolvedIdentity::new(SdkConfig::builder().build(), source.clone()))
    }
}

/// Serves a fixed device list and records every call.
pub struct FakeAwsClient {
    devices: Option<Vec<MfaDevice>>,
    fail_session_token: bool,
    list_calls: Mutex<usize>,
    session_requests: Mutex<Vec<SessionTokenRequest>>,
}

impl FakeAwsClient {
    pub fn with_devices(devices: Vec<MfaDevice>) -> Self {
        Self {
            devices: Some(devices),
            fail_session_token: false,
            list_calls: Mutex::default(),
            session_requests: Mutex::default(),
        }
    }

    pub fn failing_list() -> Self {
        Self {
            devices: None,
            ..Self::with_devices(vec![])
        }
    }

    pub fn failing_session_token(self) -> Self {
        Self {
            fail_session_token: true,
            ..self
        }
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    pub fn session_requests(&self) -> Vec<SessionTokenRequest> {
        self.session_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AwsClient for FakeAwsClient {
    async fn list_mfa_devices(
        &self,
        _ctx: &Context,
        _identity: &ResolvedIdentity,
    ) -> Result<Vec<MfaDevice>> {
        *self.list_calls.lock().unwrap() += 1;
        self.devices.clone().ok_or_else(|| anyhow!("iam unavailable"))
    }

    async fn get_session_token(
        &self,
        _ctx: &Context,
        _identity: &ResolvedIdentity,
        request: &SessionTokenRequest,
    ) -> Result<SessionCredential> {
        self.session_requests.lock().unwrap().push(request.clone());

        if self.fail_session_token {
            bail!("invalid MFA one time pass code");
        }
        Ok(session_credential())
    }
}

/// Records `(profile, name, value)` for every attempted write.
#[derive(Default)]
pub struct RecordingProfileWriter {
    fail_on: Option<ProfileField>,
    writes: Mutex<Vec<(String, String, String)>>,
}

impl RecordingProfileWriter {
    pub fn failing_on(field: ProfileField) -> Self {
        Self {
            fail_on: Some(field),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<(String, String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileWriter for RecordingProfileWriter {
    async fn configure_set(&self, _ctx: &Context, profile: &str, name: &str, value: &str) -> Result<()> {
        self.writes
            .lock()
            .unwrap()
            .push((profile.to_owned(), name.to_owned(), value.to_owned()));

        if self.fail_on.is_some_and(|field| field.key() == name) {
            bail!("aws configure set {name} exited with exit status: 1");
        }
        Ok(())
    }
}
