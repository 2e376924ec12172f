//! # CREDCTL CLI
//!
//! Command-line interface for provisioning migration credentials.
//!
//! `provision` runs one provisioning session against the cluster: it creates
//! the secret and credential resource, waits for the reconciler to validate
//! them, and cleans up if validation fails, times out or is interrupted with
//! Ctrl-C.
//!
//! ## Usage
//!
//! ```bash
//! # Provision OpenStack credentials from an env file
//! credctl provision --kind openstack --name pcd-east --secrets-file pcd.env
//!
//! # Provision vCenter credentials inline
//! credctl provision --kind vmware --name vc-lab \
//!   --secret VCENTER_HOST=vcenter.example.com \
//!   --secret VCENTER_USERNAME=administrator@vsphere.local \
//!   --secret VCENTER_PASSWORD=... --field datacenter=dc1
//!
//! # Show the validation status of a credential
//! credctl status --kind vmware --name vc-lab
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use credential_provisioner::compensation::CompensationSide;
use credential_provisioner::crd::CredentialStatus;
use credential_provisioner::observability::metrics;
use credential_provisioner::{
    config, CredentialDraft, CredentialKind, CredentialProvisioner, DeleteOutcome, KubeGateway,
    SessionOutcome,
};
use kube::api::Api;
use kube::core::DynamicObject;
use kube::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Migration credential provisioning CLI
#[derive(Parser)]
#[command(name = "credctl")]
#[command(about = "Provision and inspect VM-migration credentials", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Namespace for credentials (defaults to CREDENTIALS_NAMESPACE or migration-system)
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a credential and wait for it to be validated
    Provision {
        /// Credential kind: vmware, openstack or array
        #[arg(short, long)]
        kind: CredentialKind,

        /// Name of the credential resource
        #[arg(long)]
        name: String,

        /// .env file with secret fields (KEY=VALUE per line)
        #[arg(long)]
        secrets_file: Option<PathBuf>,

        /// Secret field, may be repeated
        #[arg(long = "secret", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        secrets: Vec<(String, String)>,

        /// Non-secret resource field, may be repeated
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        fields: Vec<(String, String)>,

        /// Delay between status polls in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Status polls before giving up
        #[arg(long)]
        max_poll_attempts: Option<u32>,

        /// Print Prometheus metrics for the run before exiting
        #[arg(long)]
        print_metrics: bool,
    },
    /// Show the validation status of a credential
    Status {
        /// Credential kind: vmware, openstack or array
        #[arg(short, long)]
        kind: CredentialKind,

        /// Name of the credential resource
        #[arg(long)]
        name: String,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credential_provisioner=info,credctl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = config::load_config();
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
    }

    match cli.command {
        Commands::Provision {
            kind,
            name,
            secrets_file,
            secrets,
            fields,
            poll_interval_ms,
            max_poll_attempts,
            print_metrics,
        } => {
            if let Some(interval) = poll_interval_ms {
                config.poll_interval_ms = interval;
            }
            if let Some(attempts) = max_poll_attempts {
                config.max_poll_attempts = attempts;
            }

            let mut draft = CredentialDraft::new(kind, name);
            if let Some(path) = secrets_file {
                let count = draft.load_secret_env_file(&path)?;
                info!("Loaded {} secret fields from {}", count, path.display());
            }
            for (key, value) in secrets {
                draft = draft.with_secret(key, value);
            }
            for (key, value) in fields {
                draft = draft.with_field(key, value);
            }

            metrics::register_metrics().context("Failed to register metrics")?;
            let result = provision_command(draft, config).await;
            if print_metrics {
                print!("{}", metrics::render_metrics()?);
            }
            result
        }
        Commands::Status { kind, name } => status_command(kind, name, &config.namespace).await,
    }
}

async fn provision_command(
    draft: CredentialDraft,
    config: credential_provisioner::ProvisionerConfig,
) -> Result<()> {
    let gateway = Arc::new(
        KubeGateway::try_default()
            .await
            .context("Ensure kubeconfig is configured")?,
    );
    let budget = config.poll_timeout();
    let provisioner = CredentialProvisioner::new(gateway, config);

    let handle = provisioner.start(&draft)?;
    drop(draft);

    println!(
        "Provisioning {} credential '{}/{}' (session {}, validation budget {}s)",
        handle.kind(),
        handle.namespace(),
        handle.resource_name(),
        handle.session_id(),
        budget.as_secs()
    );
    let _transitions = handle.on_state_change(|state| println!("  -> {state}"));

    let outcome = tokio::select! {
        outcome = handle.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted, cancelling and cleaning up...");
            provisioner.cancel_all();
            handle.wait().await
        }
    };

    report(&outcome);

    if !outcome.is_validated() {
        bail!("provisioning ended in {}", outcome.state);
    }
    Ok(())
}

fn report(outcome: &SessionOutcome) {
    println!("\nResult: {}", outcome.state);
    println!("  {}", outcome.message);

    if let Some(compensation) = &outcome.compensation {
        let describe = |outcome: &DeleteOutcome| match outcome {
            DeleteOutcome::Deleted => "deleted".to_string(),
            DeleteOutcome::AlreadyGone => "already gone".to_string(),
            DeleteOutcome::Skipped => "not created".to_string(),
            DeleteOutcome::Failed(e) => format!("FAILED ({e})"),
        };
        println!("\nCleanup:");
        println!(
            "  Resource {}: {}",
            compensation.target.resource_name,
            describe(&compensation.resource)
        );
        println!(
            "  Secret {}: {}",
            compensation.target.secret_name,
            describe(&compensation.secret)
        );
        if compensation.requires_manual_cleanup() {
            println!("\nSome objects could not be removed. Delete them manually:");
            for error in compensation.errors() {
                let object_kind = match error.side {
                    CompensationSide::Resource => {
                        compensation.target.kind.resource_kind().to_lowercase()
                    }
                    CompensationSide::Secret => "secret".to_string(),
                };
                println!(
                    "  kubectl -n {} delete {} {}",
                    error.namespace, object_kind, error.name
                );
            }
        }
    }
}

async fn status_command(kind: CredentialKind, name: String, namespace: &str) -> Result<()> {
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;
    let api: Api<DynamicObject> = Api::namespaced_with(client, namespace, &kind.api_resource());

    let resource = api
        .get(&name)
        .await
        .with_context(|| format!("Failed to get {} '{}/{}'", kind.resource_kind(), namespace, name))?;
    let status = CredentialStatus::from_object(&resource)
        .with_context(|| format!("Unreadable status on '{}/{}'", namespace, name))?;

    println!("{} '{}/{}':", kind.resource_kind(), namespace, name);
    println!(
        "  Validation Status: {}",
        status.validation_status.as_deref().unwrap_or("<none>")
    );
    if let Some(message) = &status.validation_message {
        println!("  Message: {message}");
    }
    if let Some(secret) = resource
        .data
        .get("spec")
        .and_then(|spec| spec.get("secretRef"))
        .and_then(|r| r.get("name"))
        .and_then(|n| n.as_str())
    {
        println!("  Secret: {secret}");
    }

    Ok(())
}
