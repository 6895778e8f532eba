use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;
use seva_application::{FormService, FormSession, StepOutcome, SubmitOutcome};
use seva_core::{AppError, AppResult, ReferenceNumber, ServiceId};
use seva_domain::{FieldValue, FormMode};
use seva_infrastructure::LocalFilePicker;
use tracing::{info, warn};

pub const USAGE: &str = "usage: seva-form <validate|save|submit> <service-id> <values.json> \
                         [reference-number] [FIELD=PATH ...]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Validate,
    Save,
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormCommand {
    pub action: Action,
    pub service_id: ServiceId,
    pub values_path: PathBuf,
    pub reference_number: Option<ReferenceNumber>,
    pub attachments: Vec<(String, PathBuf)>,
}

impl FormCommand {
    pub fn parse(args: impl IntoIterator<Item = String>) -> AppResult<Self> {
        let mut args = args.into_iter();
        let action = match args.next().as_deref() {
            Some("validate") => Action::Validate,
            Some("save") => Action::Save,
            Some("submit") => Action::Submit,
            _ => return Err(AppError::Validation(USAGE.to_owned())),
        };
        let service_id = ServiceId::new(
            args.next()
                .ok_or_else(|| AppError::Validation(USAGE.to_owned()))?,
        )?;
        let values_path = args
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| AppError::Validation(USAGE.to_owned()))?;

        let mut reference_number = None;
        let mut attachments = Vec::new();
        for arg in args {
            match arg.split_once('=') {
                Some((field, path)) if !field.is_empty() && !path.is_empty() => {
                    attachments.push((field.to_owned(), PathBuf::from(path)));
                }
                Some(_) => {
                    return Err(AppError::Validation(format!(
                        "attachment '{arg}' must look like FIELD=PATH"
                    )));
                }
                None if reference_number.is_none() && attachments.is_empty() => {
                    reference_number = Some(ReferenceNumber::new(arg));
                }
                None => return Err(AppError::Validation(USAGE.to_owned())),
            }
        }

        Ok(Self {
            action,
            service_id,
            values_path,
            reference_number,
            attachments,
        })
    }

    pub fn mode(&self) -> FormMode {
        if self.reference_number.is_some() {
            FormMode::Incomplete
        } else {
            FormMode::New
        }
    }
}

/// Fills a session from a flat JSON object and the requested attachments.
pub async fn fill_session(
    service: &FormService,
    session: &mut FormSession,
    command: &FormCommand,
) -> AppResult<()> {
    let raw = tokio::fs::read_to_string(&command.values_path)
        .await
        .map_err(|error| {
            AppError::NotFound(format!(
                "failed to read '{}': {error}",
                command.values_path.display()
            ))
        })?;
    let values = serde_json::from_str::<Value>(&raw)
        .map_err(|error| AppError::Validation(format!("values file is not valid JSON: {error}")))?;
    let Value::Object(values) = values else {
        return Err(AppError::Validation(
            "values file must hold a JSON object".to_owned(),
        ));
    };

    for (key, value) in values {
        let text = match value {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        match service
            .set_value(session, &key, FieldValue::text(text))
            .await
        {
            Err(AppError::NotFound(message)) => warn!(field = %key, %message, "skipping value"),
            other => other?,
        }
    }

    for (field, path) in &command.attachments {
        let picker = LocalFilePicker::new(path);
        service.attach_file(session, field, &picker).await?;
    }

    if service.lookup_ifsc(session).await?.is_some() {
        info!("filled IFSC code from bank branch");
    }
    Ok(())
}

/// Runs the requested action on a filled session.
pub async fn run(
    service: &FormService,
    session: &mut FormSession,
    action: Action,
) -> AppResult<()> {
    match action {
        Action::Validate => {
            walk_to_last_step(service, session).await?;
            let errors = service.validate_step(session).await?;
            if !errors.is_empty() {
                return Err(report_errors(session.current_step(), &errors));
            }
            println!("all {} steps are valid", session.step_count());
        }
        Action::Save => {
            let receipt = service.save(session).await?;
            println!(
                "{:?}: reference number {}",
                receipt.kind, receipt.reference_number
            );
        }
        Action::Submit => {
            walk_to_last_step(service, session).await?;
            match service.submit(session).await? {
                SubmitOutcome::Submitted(receipt) => println!(
                    "{:?}: reference number {}",
                    receipt.kind, receipt.reference_number
                ),
                SubmitOutcome::Invalid { errors } => {
                    return Err(report_errors(session.current_step(), &errors));
                }
            }
        }
    }
    Ok(())
}

async fn walk_to_last_step(service: &FormService, session: &mut FormSession) -> AppResult<()> {
    while !session.is_last_step() {
        match service.next(session).await? {
            StepOutcome::Advanced { step } => info!(step, "step passed"),
            StepOutcome::Invalid { errors } => {
                return Err(report_errors(session.current_step(), &errors));
            }
            StepOutcome::Unmodified { fields } => {
                return Err(AppError::Validation(format!(
                    "step {} has unmodified fields: {}",
                    session.current_step() + 1,
                    fields.join(", ")
                )));
            }
        }
    }
    Ok(())
}

fn report_errors(step: usize, errors: &BTreeMap<String, String>) -> AppError {
    for (field, message) in errors {
        println!("{field}: {message}");
    }
    AppError::Validation(format!(
        "step {} has {} invalid field(s)",
        step + 1,
        errors.len()
    ))
}
