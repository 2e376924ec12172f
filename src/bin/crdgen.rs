//! Print the credential CRDs as a multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/credentials.yaml
//! ```

use anyhow::{Context, Result};
use credential_provisioner::crd::{ArrayCreds, OpenstackCreds, VMwareCreds};
use kube::CustomResourceExt;

fn main() -> Result<()> {
    let crds = [VMwareCreds::crd(), OpenstackCreds::crd(), ArrayCreds::crd()];
    for crd in &crds {
        let yaml = serde_yaml::to_string(crd).with_context(|| {
            format!(
                "Failed to serialize CRD {}",
                crd.metadata.name.as_deref().unwrap_or("<unknown>")
            )
        })?;
        println!("---\n{}", yaml.trim_end());
    }
    Ok(())
}
