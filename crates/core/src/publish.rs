//! Publish pipeline: external compiler -> transaction assembly ->
//! submission -> package identity extraction.

use crate::client::{ChainClient, ExecuteOptions, FaucetClient};
use crate::config::HarnessConfig;
use crate::context::TestContext;
use crate::error::{ArtifactError, Error};
use crate::types::{Address, ExecutionResult, ObjectChange, ObjectId, TransactionBlock};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Shape of the compiler's stdout. Validated here at the boundary; any
/// mismatch is a single [`ArtifactError`], never a retry.
#[derive(Debug, Deserialize)]
pub struct ArtifactBundle {
    /// base64-encoded bytecode, one entry per module
    pub modules: Vec<String>,
    /// addresses of packages the modules link against
    pub dependencies: Vec<String>,
}

/// Decoded, ready-to-publish artifacts.
#[derive(Debug, Clone)]
pub struct CompiledPackage {
    pub modules: Vec<Vec<u8>>,
    pub dependencies: Vec<Address>,
}

impl TryFrom<ArtifactBundle> for CompiledPackage {
    type Error = ArtifactError;

    fn try_from(bundle: ArtifactBundle) -> Result<Self, ArtifactError> {
        let modules = bundle
            .modules
            .iter()
            .map(|m| BASE64.decode(m))
            .collect::<Result<Vec<_>, _>>()?;
        let dependencies = bundle
            .dependencies
            .iter()
            .map(|d| d.parse::<Address>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            modules,
            dependencies,
        })
    }
}

/// Runs the external compiler over `source_path`, writing artifacts into a
/// scoped temporary directory that is removed on every exit path. A
/// non-zero exit or unparseable stdout is fatal: compilation is
/// deterministic, so there is nothing to retry.
pub async fn compile_package(
    compiler_bin: &str,
    source_path: &Path,
) -> Result<CompiledPackage, ArtifactError> {
    let install_dir = tempfile::tempdir().map_err(ArtifactError::Spawn)?;
    debug!(compiler = compiler_bin, path = %source_path.display(), "compiling package");
    let output = tokio::process::Command::new(compiler_bin)
        .arg("move")
        .arg("build")
        .arg("--dump-bytecode-as-base64")
        .arg("--path")
        .arg(source_path)
        .arg("--install-dir")
        .arg(install_dir.path())
        .output()
        .await
        .map_err(ArtifactError::Spawn)?;

    if !output.status.success() {
        return Err(ArtifactError::CompilerFailed {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    let bundle: ArtifactBundle = serde_json::from_slice(&output.stdout)?;
    bundle.try_into()
    // install_dir dropped here, artifacts removed
}

/// Publishes already-compiled artifacts through the given context: one
/// block carrying the publish plus a transfer handing the upgrade
/// capability back to the publisher, so the publisher keeps upgrade
/// rights.
pub async fn publish_compiled(
    ctx: &TestContext,
    compiled: CompiledPackage,
) -> crate::Result<(ObjectId, ExecutionResult)> {
    let mut tx = TransactionBlock::new(ctx.address());
    tx.set_gas_budget(ctx.config().gas_budget);
    let upgrade_cap = tx.publish(compiled.modules, compiled.dependencies);
    tx.transfer_objects(vec![upgrade_cap], ctx.address());

    let result = ctx.signer().execute(tx, ExecuteOptions::default()).await?;
    // a failed publish is an environment or logic bug, never resubmitted
    result.ensure_success()?;

    let package_id = result
        .object_changes
        .iter()
        .find_map(|change| match change {
            ObjectChange::Published { package_id } => Some(*package_id),
            _ => None,
        })
        .ok_or(Error::PackageIdMissing)?;
    if package_id == ObjectId::ZERO {
        return Err(Error::PackageIdMissing);
    }
    info!(package = %package_id.to_canonical_string(), digest = %result.digest, "package published");
    Ok((package_id, result))
}

/// Compiles and publishes the package at `source_path` with an existing
/// context.
pub async fn publish_package(
    ctx: &TestContext,
    source_path: &Path,
) -> crate::Result<(ObjectId, ExecutionResult)> {
    let compiled = compile_package(&ctx.config().compiler_bin, source_path).await?;
    publish_compiled(ctx, compiled).await
}

/// Like [`publish_package`], but provisions a fresh funded context for
/// this publish alone. Wasteful on purpose: isolation over thrift.
pub async fn publish_package_isolated(
    config: HarnessConfig,
    chain: Arc<dyn ChainClient>,
    faucet: Arc<dyn FaucetClient>,
    source_path: &Path,
) -> crate::Result<(ObjectId, ExecutionResult)> {
    let ctx = TestContext::create(config, chain, faucet).await?;
    publish_package(&ctx, source_path).await
}
