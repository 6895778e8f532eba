//! Seva form client: fills and submits a benefit application from the shell.

#![forbid(unsafe_code)]

mod cli_config;
mod form_command;

use std::env;
use std::sync::Arc;

use seva_application::{FormService, OpenSessionInput, SessionStore, ValidationEngine};
use seva_core::AppError;
use seva_infrastructure::{FileSessionStore, HttpFormApiClient};
use tracing::{info, warn};

use crate::cli_config::{FormClientConfig, init_tracing};
use crate::form_command::FormCommand;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = FormCommand::parse(env::args().skip(1))?;
    let config = FormClientConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let session_store: Arc<dyn SessionStore> =
        Arc::new(FileSessionStore::new(config.session_file.clone()));
    match session_store.load().await? {
        Some(identity) => info!(
            username = identity.username(),
            user_type = ?identity.user_type(),
            designation = identity.designation().unwrap_or("-"),
            verified = identity.is_verified(),
            "using stored session"
        ),
        None => warn!("no stored session; requests are sent without a bearer token"),
    }
    let api_client = Arc::new(HttpFormApiClient::new(
        http_client,
        config.api_url.clone(),
        session_store,
    ));
    let validation_engine =
        ValidationEngine::with_remote_rules(api_client.clone(), api_client.clone());
    let form_service = FormService::new(
        api_client.clone(),
        api_client.clone(),
        api_client.clone(),
        api_client,
        validation_engine,
    );

    info!(
        api_url = %config.api_url,
        service_id = %command.service_id,
        action = ?command.action,
        "seva-form started"
    );

    let mut session = form_service
        .open_session(OpenSessionInput {
            service_id: command.service_id.clone(),
            mode: command.mode(),
            reference_number: command.reference_number.clone(),
        })
        .await?;
    form_command::fill_session(&form_service, &mut session, &command).await?;
    form_command::run(&form_service, &mut session, command.action).await
}
