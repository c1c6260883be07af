//! Subcommand implementations

pub mod eval;
pub mod nodes;
pub mod run;

use anyhow::{bail, Context, Result};
use preflight_lib::{decode_nodes, BlobStore, ClusterNode, DirectoryStore};
use std::path::Path;

/// Open a collected support bundle directory
pub fn open_bundle(bundle: &Path) -> Result<DirectoryStore> {
    if !bundle.is_dir() {
        bail!("Bundle directory {} does not exist", bundle.display());
    }
    Ok(DirectoryStore::new(bundle))
}

/// Read and decode the collected node list
pub fn load_nodes(store: &dyn BlobStore) -> Result<Vec<ClusterNode>> {
    let payload = store
        .fetch(preflight_lib::store::NODES_KEY)
        .context("Failed to read node list from bundle")?;
    decode_nodes(&payload).context("Failed to decode node list")
}
