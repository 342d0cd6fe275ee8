//! Formweave headless renderer.

#![forbid(unsafe_code)]

mod cli_config;

use std::sync::Arc;
use std::time::Duration;

use formweave_application::{FormOrchestrator, FormStructureSource, SubmitOutcome, SubmitSink};
use formweave_core::{AppError, AppResult};
use formweave_infrastructure::{
    ConsoleSubmitSink, FileFormStructureSource, HttpFormStructureSource, HttpSubmitSink,
    default_field_type_registry,
};
use tracing::{error, info, warn};

use crate::cli_config::{CliConfig, StructureLocation, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = CliConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let source: Box<dyn FormStructureSource> = match &config.structure {
        StructureLocation::File(path) => Box::new(FileFormStructureSource::new(path.clone())),
        StructureLocation::Http(url) => {
            Box::new(HttpFormStructureSource::new(http_client.clone(), url.clone()))
        }
    };

    let sink: Arc<dyn SubmitSink> = match &config.submit_endpoint {
        Some(endpoint) => Arc::new(HttpSubmitSink::new(
            http_client,
            endpoint.url.clone(),
            endpoint.max_attempts,
            endpoint.retry_backoff_ms,
        )),
        None => Arc::new(ConsoleSubmitSink::new()),
    };

    let mut orchestrator = FormOrchestrator::load(
        source.as_ref(),
        default_field_type_registry(),
        config.render_mode,
        sink,
    )
    .await?;

    let (ready, planned) = orchestrator.readiness();
    info!(
        session_id = %orchestrator.session_id(),
        mode = config.render_mode.as_str(),
        ready,
        planned,
        "form initialized"
    );

    apply_value_edits(&mut orchestrator, &config);
    println!("{}", orchestrator.render());

    if !orchestrator.mode().is_editable() {
        return Ok(());
    }

    match orchestrator.submit().await {
        SubmitOutcome::Submitted(document) => {
            info!(
                session_id = %document.session_id(),
                fields = document.values().len(),
                "form submitted"
            );
            Ok(())
        }
        SubmitOutcome::Invalid { invalid_paths } => {
            println!("{}", orchestrator.render());
            let paths = invalid_paths
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            warn!(invalid = invalid_paths.len(), "form is invalid");
            Err(AppError::Validation(format!("invalid fields: {paths}")))
        }
        SubmitOutcome::Blocked => Err(AppError::Conflict(
            "submission blocked by a pending operation".to_owned(),
        )),
        SubmitOutcome::NotEditable => Ok(()),
        SubmitOutcome::Failed { message } => {
            error!(error = %message, "form submission failed");
            Err(AppError::Internal(message))
        }
    }
}

fn apply_value_edits(orchestrator: &mut FormOrchestrator, config: &CliConfig) {
    for edit in &config.value_edits {
        let result: AppResult<()> = orchestrator.input_transport(&edit.target, &edit.value);
        if let Err(error) = result {
            warn!(target_field = %edit.target, error = %error, "skipped value edit");
        }
    }
}
