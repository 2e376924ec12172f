//! Shared fixtures for integration tests: a scripted in-memory gateway and
//! ready-made drafts.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use credential_provisioner::{
    CredentialDraft, CredentialKind, GatewayError, ProvisionerConfig, RemoteResourceGateway,
};
use k8s_openapi::api::core::v1::Secret;
use kube::core::DynamicObject;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const NAMESPACE: &str = "migration-system";

/// One recorded gateway call, with the object name it targeted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateSecret(String),
    CreateResource(String),
    GetResource(String),
    DeleteResource(String),
    DeleteSecret(String),
}

/// What a scripted status fetch returns
#[derive(Debug, Clone)]
pub enum StatusReply {
    /// The reconciler has not written a status yet
    Absent,
    Status {
        status: &'static str,
        message: &'static str,
    },
    Error(GatewayError),
    /// Status block written verbatim
    Raw(serde_json::Value),
}

pub fn status(status: &'static str, message: &'static str) -> StatusReply {
    StatusReply::Status { status, message }
}

/// In-memory gateway that records every call and replays scripted results
///
/// Status fetches pop replies from a queue; once the queue is empty every
/// fetch reports no status.
#[derive(Default)]
pub struct ScriptedGateway {
    calls: Mutex<Vec<Call>>,
    create_secret_error: Mutex<Option<GatewayError>>,
    create_resource_error: Mutex<Option<GatewayError>>,
    delete_resource_error: Mutex<Option<GatewayError>>,
    delete_secret_error: Mutex<Option<GatewayError>>,
    statuses: Mutex<VecDeque<StatusReply>>,
    create_secret_gate: Mutex<Option<Arc<Notify>>>,
    create_resource_gate: Mutex<Option<Arc<Notify>>>,
    /// Signalled when `create_secret` is entered
    pub create_secret_started: Notify,
    /// Signalled when `create_resource` is entered
    pub create_resource_started: Notify,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn fail_create_secret(&self, error: GatewayError) {
        *self.create_secret_error.lock().unwrap() = Some(error);
    }

    pub fn fail_create_resource(&self, error: GatewayError) {
        *self.create_resource_error.lock().unwrap() = Some(error);
    }

    pub fn fail_delete_resource(&self, error: GatewayError) {
        *self.delete_resource_error.lock().unwrap() = Some(error);
    }

    pub fn fail_delete_secret(&self, error: GatewayError) {
        *self.delete_secret_error.lock().unwrap() = Some(error);
    }

    pub fn push_statuses(&self, replies: impl IntoIterator<Item = StatusReply>) {
        self.statuses.lock().unwrap().extend(replies);
    }

    /// Hold `create_secret` until the returned gate is notified
    pub fn gate_create_secret(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.create_secret_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold `create_resource` until the returned gate is notified
    pub fn gate_create_resource(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.create_resource_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn scripted(slot: &Mutex<Option<GatewayError>>) -> Result<(), GatewayError> {
        match slot.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteResourceGateway for ScriptedGateway {
    async fn create_secret(&self, _namespace: &str, secret: &Secret) -> Result<Secret, GatewayError> {
        self.record(Call::CreateSecret(
            secret.metadata.name.clone().unwrap_or_default(),
        ));
        self.create_secret_started.notify_one();

        let gate = self.create_secret_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        Self::scripted(&self.create_secret_error)?;
        Ok(secret.clone())
    }

    async fn create_resource(
        &self,
        _kind: CredentialKind,
        _namespace: &str,
        body: &DynamicObject,
    ) -> Result<DynamicObject, GatewayError> {
        self.record(Call::CreateResource(
            body.metadata.name.clone().unwrap_or_default(),
        ));
        self.create_resource_started.notify_one();

        let gate = self.create_resource_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        Self::scripted(&self.create_resource_error)?;
        Ok(body.clone())
    }

    async fn get_resource(
        &self,
        kind: CredentialKind,
        name: &str,
        _namespace: &str,
    ) -> Result<DynamicObject, GatewayError> {
        self.record(Call::GetResource(name.to_string()));
        let reply = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StatusReply::Absent);

        let object = DynamicObject::new(name, &kind.api_resource());
        match reply {
            StatusReply::Absent => Ok(object.data(json!({ "spec": {} }))),
            StatusReply::Status { status, message } => Ok(object.data(json!({
                "spec": {},
                "status": { "validationStatus": status, "validationMessage": message }
            }))),
            StatusReply::Error(error) => Err(error),
            StatusReply::Raw(status) => Ok(object.data(json!({ "spec": {}, "status": status }))),
        }
    }

    async fn delete_resource(
        &self,
        _kind: CredentialKind,
        name: &str,
        _namespace: &str,
    ) -> Result<(), GatewayError> {
        self.record(Call::DeleteResource(name.to_string()));
        Self::scripted(&self.delete_resource_error)
    }

    async fn delete_secret(&self, name: &str, _namespace: &str) -> Result<(), GatewayError> {
        self.record(Call::DeleteSecret(name.to_string()));
        Self::scripted(&self.delete_secret_error)
    }
}

/// Default budget: 30 polls every 2 seconds
pub fn config() -> ProvisionerConfig {
    ProvisionerConfig {
        namespace: NAMESPACE.to_string(),
        poll_interval_ms: 2000,
        max_poll_attempts: 30,
    }
}

pub fn vmware_draft(name: &str) -> CredentialDraft {
    CredentialDraft::new(CredentialKind::VMware, name)
        .with_secret("VCENTER_HOST", "vcenter.example.com")
        .with_secret("VCENTER_USERNAME", "administrator@vsphere.local")
        .with_secret("VCENTER_PASSWORD", "secret")
}

pub fn openstack_token_draft(name: &str) -> CredentialDraft {
    CredentialDraft::new(CredentialKind::OpenStack, name)
        .with_secret("OS_AUTH_URL", "https://keystone.example.com/v3")
        .with_secret("OS_AUTH_TOKEN", "gAAAAAB-token")
}
