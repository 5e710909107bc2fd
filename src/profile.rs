//! Writing session credentials into a named profile through the AWS CLI.
//!
//! Fields are written one `aws configure set` call at a time, in a fixed
//! order. A failed write stops the sequence; fields written before it stay
//! written.

use std::{
    ffi::OsStr,
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{Context as _, Result, ensure};
use async_trait::async_trait;
use log::{debug, info};
use tokio::process::Command;

use crate::{context::Context, credentials::SessionCredential, error::Error};

/// A profile property written by [`persist`], in write order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileField {
    AccessKeyId,
    SecretAccessKey,
    SessionToken,
    ExpirationDate,
}

impl ProfileField {
    pub const ALL: [ProfileField; 4] = [
        ProfileField::AccessKeyId,
        ProfileField::SecretAccessKey,
        ProfileField::SessionToken,
        ProfileField::ExpirationDate,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ProfileField::AccessKeyId => "aws_access_key_id",
            ProfileField::SecretAccessKey => "aws_secret_access_key",
            ProfileField::SessionToken => "aws_session_token",
            ProfileField::ExpirationDate => "expiration_date",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Sets a single property of a profile in the shared config store.
#[async_trait]
pub trait ProfileWriter: Send + Sync {
    async fn configure_set(&self, ctx: &Context, profile: &str, name: &str, value: &str) -> Result<()>;
}

/// [`ProfileWriter`] that shells out to `aws configure set`.
#[derive(Clone, Debug)]
pub struct AwsCli {
    program: PathBuf,
}

impl AwsCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Finds the `aws` executable on `PATH`.
    pub fn locate() -> Result<Self> {
        let paths = std::env::var_os("PATH").context("aws is not installed")?;
        let cli = Self::locate_in(paths, std::env::current_dir()?)?;
        debug!("Using aws cli at {}", cli.program().display());
        Ok(cli)
    }

    /// Finds the `aws` executable in `paths`, a `PATH`-style list.
    pub fn locate_in(paths: impl AsRef<OsStr>, cwd: impl AsRef<Path>) -> Result<Self> {
        let program = which::which_in("aws", Some(paths), cwd).context("aws is not installed")?;
        Ok(Self::new(program))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl ProfileWriter for AwsCli {
    async fn configure_set(&self, ctx: &Context, profile: &str, name: &str, value: &str) -> Result<()> {
        let mut command = Command::new(&self.program);
        command
            .args(["configure", "--profile", profile, "set", name, value])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = ctx
            .run(command.output())
            .await
            .with_context(|| format!("failed to run aws configure set {name}"))?;

        ensure!(
            output.status.success(),
            "aws configure set {name} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(())
    }
}

/// Writes `credential` into `profile`.
///
/// Issues one write per [`ProfileField`], in [`ProfileField::ALL`] order.
/// The first failing write ends the sequence: later fields are not
/// attempted and earlier ones are not rolled back.
///
/// # Arguments
///
/// * `ctx` - Bounds every write
/// * `writer` - Sets a single property of the profile
/// * `profile` - Destination profile name
/// * `credential` - Session credentials to save
///
/// # Errors
///
/// * [`Error::Configure`] - Names the field whose write failed
pub async fn persist(
    ctx: &Context,
    writer: &impl ProfileWriter,
    profile: &str,
    credential: &SessionCredential,
) -> crate::error::Result<()> {
    info!("Saving session credentials to profile: {profile}");

    for field in ProfileField::ALL {
        let value = match field {
            ProfileField::AccessKeyId => credential.access_key_id.clone(),
            ProfileField::SecretAccessKey => credential.secret_access_key.clone(),
            ProfileField::SessionToken => credential.session_token.clone(),
            ProfileField::ExpirationDate => credential
                .expiration_date()
                .map_err(|e| Error::Configure {
                    field,
                    source: e.into(),
                })?,
        };

        writer
            .configure_set(ctx, profile, field.key(), &value)
            .await
            .map_err(|e| Error::Configure {
                field,
                source: e.into(),
            })?;
        debug!("Configured {field} for profile {profile}");
    }

    Ok(())
}
