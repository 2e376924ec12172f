//! # Kubernetes Gateway
//!
//! [`RemoteResourceGateway`] backed by a `kube::Client`. Credential resources
//! are addressed untyped through `Api<DynamicObject>` so one code path serves
//! every kind.

use super::{GatewayError, GatewayOperation, RemoteResourceGateway};
use crate::constants::FIELD_MANAGER;
use crate::crd::CredentialKind;
use crate::observability::metrics;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams, PostParams};
use kube::core::DynamicObject;
use kube::Client;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};

impl From<kube::Error> for GatewayError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => {
                GatewayError::from_code(response.code, response.message.clone())
            }
            other => GatewayError::other(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
}

impl std::fmt::Debug for KubeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeGateway").finish_non_exhaustive()
    }
}

impl KubeGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the ambient kubeconfig or in-cluster configuration
    ///
    /// # Errors
    /// Returns an error if no usable cluster configuration is found
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;
        Ok(Self::new(client))
    }

    fn resources(&self, kind: CredentialKind, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &kind.api_resource())
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

/// Run one API call, recording latency and classifying failures
async fn observe<T, F>(operation: GatewayOperation, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, kube::Error>>,
{
    let start = Instant::now();
    let result = call.await.map_err(GatewayError::from);
    metrics::record_gateway_operation(operation.as_str(), start.elapsed().as_secs_f64());

    if let Err(e) = &result {
        metrics::increment_gateway_errors(operation.as_str(), e.status.as_str());
        debug!(
            operation = operation.as_str(),
            status = e.status.as_str(),
            "Gateway call failed: {}",
            e
        );
    }
    result
}

#[async_trait]
impl RemoteResourceGateway for KubeGateway {
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, GatewayError> {
        let span = info_span!(
            "gateway.secret.create",
            secret.name = secret.metadata.name.as_deref().unwrap_or_default(),
            namespace = namespace
        );
        observe(
            GatewayOperation::CreateSecret,
            self.secrets(namespace).create(&Self::post_params(), secret),
        )
        .instrument(span)
        .await
    }

    async fn create_resource(
        &self,
        kind: CredentialKind,
        namespace: &str,
        body: &DynamicObject,
    ) -> Result<DynamicObject, GatewayError> {
        let span = info_span!(
            "gateway.resource.create",
            credential.kind = kind.as_str(),
            credential.name = body.metadata.name.as_deref().unwrap_or_default(),
            namespace = namespace
        );
        observe(
            GatewayOperation::CreateResource,
            self.resources(kind, namespace)
                .create(&Self::post_params(), body),
        )
        .instrument(span)
        .await
    }

    async fn get_resource(
        &self,
        kind: CredentialKind,
        name: &str,
        namespace: &str,
    ) -> Result<DynamicObject, GatewayError> {
        let span = info_span!(
            "gateway.resource.get",
            credential.kind = kind.as_str(),
            credential.name = name,
            namespace = namespace
        );
        observe(
            GatewayOperation::GetResource,
            self.resources(kind, namespace).get(name),
        )
        .instrument(span)
        .await
    }

    async fn delete_resource(
        &self,
        kind: CredentialKind,
        name: &str,
        namespace: &str,
    ) -> Result<(), GatewayError> {
        let span = info_span!(
            "gateway.resource.delete",
            credential.kind = kind.as_str(),
            credential.name = name,
            namespace = namespace
        );
        async move {
            let api = self.resources(kind, namespace);
            observe(
                GatewayOperation::DeleteResource,
                api.delete(name, &DeleteParams::default()),
            )
            .await
            .map(|_| ())
        }
        .instrument(span)
        .await
    }

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), GatewayError> {
        let span = info_span!("gateway.secret.delete", secret.name = name, namespace = namespace);
        async move {
            let api = self.secrets(namespace);
            observe(
                GatewayOperation::DeleteSecret,
                api.delete(name, &DeleteParams::default()),
            )
            .await
            .map(|_| ())
        }
        .instrument(span)
        .await
    }
}
