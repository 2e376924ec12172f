//! # Credential Provisioner
//!
//! Client-side provisioning of VM-migration credentials (VMware vCenter,
//! OpenStack, storage arrays) stored as Kubernetes custom resources.
//!
//! ## Overview
//!
//! A credential is two remote objects: a `Secret` holding the sensitive
//! fields and a custom resource that references it. A cluster-side
//! reconciler validates the credential and reports the verdict in the
//! resource's status. Provisioning is therefore a small saga:
//!
//! 1. **Build** - validate the draft and assemble both bodies ([`builder`])
//! 2. **Create** - create the secret, then the resource ([`gateway`])
//! 3. **Poll** - wait for a terminal validation status ([`poller`])
//! 4. **Compensate** - on failure, timeout or cancel, delete what was
//!    created, resource first ([`compensation`])
//!
//! [`session::CredentialProvisioner`] ties the steps together and makes sure
//! only one session per credential runs at a time.
//!
//! ## Usage
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use credential_provisioner::{
//!     config, CredentialDraft, CredentialKind, CredentialProvisioner, KubeGateway,
//! };
//! use std::sync::Arc;
//!
//! let gateway = Arc::new(KubeGateway::try_default().await?);
//! let provisioner = CredentialProvisioner::new(gateway, config::load_config());
//!
//! let draft = CredentialDraft::new(CredentialKind::OpenStack, "pcd-east")
//!     .with_secret("OS_AUTH_URL", "https://keystone.example.com/v3")
//!     .with_secret("OS_AUTH_TOKEN", "gAAAAAB...");
//!
//! let handle = provisioner.start(&draft)?;
//! let outcome = handle.wait().await;
//! println!("{}: {}", outcome.state, outcome.message);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compensation;
pub mod config;
pub mod constants;
pub mod crd;
pub mod gateway;
pub mod observability;
pub mod poller;
pub mod session;

pub use builder::{build, BuildError, CredentialDraft, FieldIssue, ProvisioningPayload};
pub use compensation::{
    CompensationError, CompensationExecutor, CompensationResult, CompensationTarget,
    DeleteOutcome,
};
pub use config::ProvisionerConfig;
pub use crd::{CredentialKind, CredentialStatus};
pub use gateway::{
    GatewayError, GatewayOperation, GatewayStatus, KubeGateway, RemoteResourceGateway,
};
pub use poller::{PollOutcome, PollTimeoutError, PollVerdict, StatusPoller};
pub use session::{
    CredentialProvisioner, ProvisioningError, SessionHandle, SessionOutcome, SessionState,
    StartError, TerminalState, Unsubscribe,
};
