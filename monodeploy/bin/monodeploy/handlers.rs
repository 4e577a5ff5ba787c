use std::path::PathBuf;

use monodeploy::{
    cli::AnsiStyles,
    management::{self, DeployOptions},
    reconcile::PlanAction,
    MonodeployError, MonodeployResult,
};
use tokio_util::sync::CancellationToken;

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

pub async fn plan_subcommand(path: Option<PathBuf>, config: Option<String>) -> MonodeployResult<()> {
    let plan = management::plan(path.as_deref(), config.as_deref()).await?;

    println!("{}", "services".header());
    for entry in plan.get_entries() {
        let action = match entry.get_action() {
            PlanAction::Build => "build".valid(),
            PlanAction::PassThrough => "keep".placeholder(),
        };
        let flags = match (entry.get_entry().enabled, entry.get_entry().archived) {
            (_, true) => " (archived)",
            (false, false) => " (disabled)",
            (true, false) => "",
        };
        println!("  {action} {}{flags}", entry.get_name().literal());
    }

    println!("{}", "storages".header());
    for storage in plan.get_storages() {
        let state = if storage.get_entry().enabled {
            "enabled".valid()
        } else {
            "disabled".placeholder()
        };
        println!("  {state} {}", storage.get_name().literal());
    }

    Ok(())
}

pub async fn deploy_subcommand(
    path: Option<PathBuf>,
    config: Option<String>,
    skip_verify: bool,
    comment: Option<String>,
) -> MonodeployResult<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling deployment");
                cancel.cancel();
            }
        }
    });

    let options = DeployOptions {
        skip_verify,
        comment,
    };
    let result = management::deploy(path.as_deref(), config.as_deref(), options, cancel).await;
    ctrl_c.abort();

    match result {
        Ok(report) => {
            println!(
                "{} {} published, {} uploaded, {} uploads skipped",
                "deployed".valid(),
                report.get_published().len(),
                report.get_uploaded().len(),
                report.get_skipped_uploads().len()
            );
            println!("manifest {}", report.get_manifest_digest().literal());
            Ok(())
        }
        Err(MonodeployError::Cancelled) => {
            println!("{}", "deployment cancelled".error());
            Err(MonodeployError::Cancelled)
        }
        Err(e) => Err(e),
    }
}

pub async fn validate_subcommand(
    path: Option<PathBuf>,
    config: Option<String>,
) -> MonodeployResult<()> {
    let hints = management::validate(path.as_deref(), config.as_deref()).await?;
    if hints.is_empty() {
        println!("{}", "no problems found".valid());
        return Ok(());
    }

    for hint in &hints {
        if hint.is_error() {
            println!("{}", hint.to_string().error());
        } else {
            println!("{hint}");
        }
    }

    if hints.iter().any(|h| h.is_error()) {
        return Err(MonodeployError::custom(anyhow::anyhow!(
            "project has validation errors"
        )));
    }

    Ok(())
}
