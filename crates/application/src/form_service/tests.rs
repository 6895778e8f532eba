use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use seva_core::{AppError, AppResult, ReferenceNumber, ServiceId};
use seva_domain::{
    FieldValue, FileRef, FormMode, SelectOption, SubmissionKind, SubmissionPayload,
    SubmissionStatus, SubmittedContent, SubmittedField,
};
use tokio::sync::Mutex;

use super::{FormService, FormSession, OpenSessionInput, StepOutcome, SubmitOutcome};
use crate::form_ports::{
    BankDirectory, DependentOptionSource, FilePicker, FormContentSource, PickKind, PickOutcome,
    PriorSubmission, ServiceContent, SubmissionReceipt, SubmissionRequest, SubmissionSink,
};
use crate::validation_service::ValidationEngine;

const APPLICATION_FORM: &str = r#"[
  {
    "id": 0,
    "section": "Applicant Details",
    "fields": [
      {
        "name": "Name",
        "label": "Name",
        "type": "text",
        "validationFunctions": ["notEmpty", "onlyAlphabets"],
        "transformationFunctions": ["CapitalizeAlphabets"]
      },
      {
        "name": "Age",
        "label": "Age",
        "type": "text",
        "validationFunctions": ["notEmpty", "onlyDigits"]
      },
      {
        "name": "Gender",
        "label": "Gender",
        "type": "select",
        "options": [
          { "value": "Please Select", "label": "Please Select" },
          { "value": "Female", "label": "Female" }
        ],
        "validationFunctions": ["notEmpty"]
      }
    ]
  },
  {
    "id": 1,
    "section": "Present Address Details",
    "fields": [
      {
        "name": "PresentDistrict",
        "label": "District",
        "type": "select",
        "options": [
          { "value": "Please Select", "label": "Please Select" },
          { "value": "D1", "label": "District 1" }
        ],
        "validationFunctions": ["notEmpty"]
      },
      {
        "name": "PresentTehsil",
        "label": "Tehsil",
        "type": "select",
        "options": [{ "value": "Please Select", "label": "Please Select" }],
        "validationFunctions": ["notEmpty"]
      },
      { "name": "PresentAddress", "label": "Address", "type": "text" }
    ]
  },
  {
    "id": 2,
    "section": "Permanent Address Details",
    "fields": [
      {
        "name": "PermanentDistrict",
        "label": "District",
        "type": "select",
        "options": [
          { "value": "Please Select", "label": "Please Select" },
          { "value": "D1", "label": "District 1" }
        ]
      },
      {
        "name": "PermanentTehsil",
        "label": "Tehsil",
        "type": "select",
        "options": [{ "value": "Please Select", "label": "Please Select" }]
      },
      { "name": "PermanentAddress", "label": "Address", "type": "text" }
    ]
  },
  {
    "id": 3,
    "section": "Documents",
    "fields": [
      { "name": "ApplicantImage", "label": "Photo", "type": "file", "accept": ".jpg,.png" },
      {
        "name": "IdProof",
        "label": "Id Proof",
        "type": "enclosure",
        "options": [{ "value": "Aadhaar", "label": "Aadhaar" }],
        "validationFunctions": ["notEmpty"]
      },
      { "name": "BankName", "label": "Bank", "type": "text" },
      { "name": "BranchName", "label": "Branch", "type": "text" },
      {
        "name": "IfscCode",
        "label": "IFSC",
        "type": "text",
        "transformationFunctions": ["CaptilizeAlphabet"]
      }
    ]
  }
]"#;

const DISTRICT_FORM: &str = r#"[
  {
    "id": 0,
    "section": "Applicant Details",
    "fields": [
      { "name": "Name", "type": "text", "validationFunctions": ["notEmpty"] },
      {
        "name": "District",
        "type": "select",
        "options": [
          { "value": "Please Select", "label": "Please Select" },
          { "value": "D1", "label": "District 1" }
        ],
        "validationFunctions": ["notEmpty"]
      },
      {
        "name": "Tehsil",
        "type": "select",
        "options": [{ "value": "Please Select", "label": "Please Select" }]
      }
    ]
  },
  { "id": 1, "section": "Declaration", "fields": [{ "name": "Consent", "type": "text" }] }
]"#;

const BRANCH_FORM: &str = r#"[
  {
    "id": 0,
    "section": "Applicant Details",
    "fields": [
      {
        "name": "MaritalStatus",
        "type": "select",
        "options": [{ "value": "A", "label": "A" }, { "value": "B", "label": "B" }],
        "additionalFields": {
          "A": [{ "id": "f1", "type": "text", "validationFunctions": ["notEmpty"] }],
          "B": [{ "id": "f2", "type": "text", "validationFunctions": ["notEmpty"] }]
        }
      }
    ]
  },
  { "id": 1, "section": "Declaration", "fields": [{ "name": "Consent", "type": "text" }] }
]"#;

const SINGLE_STEP_FORM: &str = r#"[
  {
    "id": 0,
    "section": "Declaration",
    "fields": [
      { "name": "Name", "type": "text", "validationFunctions": ["notEmpty"] },
      { "name": "ApplicantImage", "type": "file", "accept": ".jpg" }
    ]
  }
]"#;

const ACCOUNT_FORM: &str = r#"[
  {
    "id": 0,
    "section": "Bank Details",
    "fields": [
      {
        "name": "HasAccount",
        "type": "select",
        "options": [{ "value": "Yes", "label": "Yes" }, { "value": "No", "label": "No" }],
        "additionalFields": [
          { "id": "AccountNumber", "type": "text", "validationFunctions": ["notEmpty"] }
        ]
      },
      { "name": "BankName", "type": "text" },
      { "name": "BranchName", "type": "text" }
    ]
  },
  { "id": 1, "section": "Declaration", "fields": [{ "name": "Consent", "type": "text" }] }
]"#;

struct FakeContentSource {
    status: bool,
    form_element: String,
    prior: PriorSubmission,
    requested_details: Mutex<Vec<String>>,
}

impl FakeContentSource {
    fn new(form_element: &str) -> Self {
        Self {
            status: true,
            form_element: form_element.to_owned(),
            prior: PriorSubmission::default(),
            requested_details: Mutex::new(Vec::new()),
        }
    }

    fn with_prior(mut self, prior: PriorSubmission) -> Self {
        self.prior = prior;
        self
    }
}

#[async_trait]
impl FormContentSource for FakeContentSource {
    async fn service_content(&self, _service_id: &ServiceId) -> AppResult<ServiceContent> {
        Ok(ServiceContent {
            status: self.status,
            form_element: self.form_element.clone(),
        })
    }

    async fn form_details(
        &self,
        reference_number: &ReferenceNumber,
    ) -> AppResult<PriorSubmission> {
        self.requested_details
            .lock()
            .await
            .push(reference_number.as_str().to_owned());
        Ok(self.prior.clone())
    }
}

struct FakeOptionSource {
    tehsils: BTreeMap<String, Vec<SelectOption>>,
    calls: Mutex<Vec<String>>,
}

impl FakeOptionSource {
    fn new() -> Self {
        Self {
            tehsils: BTreeMap::from([
                ("D1".to_owned(), vec![SelectOption::new("T1", "Tehsil 1")]),
                ("D2".to_owned(), vec![SelectOption::new("T2", "Tehsil 2")]),
            ]),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DependentOptionSource for FakeOptionSource {
    async fn tehsils_for_district(&self, district_id: &str) -> AppResult<Vec<SelectOption>> {
        self.calls.lock().await.push(district_id.to_owned());
        self.tehsils
            .get(district_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("no tehsils for '{district_id}'")))
    }
}

struct FakeBankDirectory {
    failing: bool,
}

#[async_trait]
impl BankDirectory for FakeBankDirectory {
    async fn ifsc_code(&self, _bank_name: &str, branch_name: &str) -> AppResult<Option<String>> {
        if self.failing {
            return Err(AppError::Remote("timed out".to_owned()));
        }
        Ok((branch_name == "Main").then(|| "sbin0001".to_owned()))
    }
}

struct FakeSubmissionSink {
    failing: bool,
    requests: Mutex<Vec<SubmissionRequest>>,
}

#[async_trait]
impl SubmissionSink for FakeSubmissionSink {
    async fn submit(&self, request: &SubmissionRequest) -> AppResult<SubmissionReceipt> {
        self.requests.lock().await.push(request.clone());
        if self.failing {
            return Err(AppError::Submission("Form submission failed.".to_owned()));
        }

        let kind = if request.return_fields.is_some() {
            SubmissionKind::Edit
        } else if request.status == SubmissionStatus::Initiated {
            SubmissionKind::Submit
        } else {
            SubmissionKind::Save
        };
        let reference_number = if request.reference_number.is_assigned() {
            request.reference_number.clone()
        } else {
            ReferenceNumber::new("APP-1")
        };
        Ok(SubmissionReceipt {
            kind,
            reference_number,
        })
    }
}

struct FakePicker(PickOutcome);

#[async_trait]
impl FilePicker for FakePicker {
    async fn pick(&self, _kind: PickKind) -> AppResult<PickOutcome> {
        Ok(self.0.clone())
    }
}

struct Fixture {
    service: FormService,
    content: Arc<FakeContentSource>,
    options: Arc<FakeOptionSource>,
    sink: Arc<FakeSubmissionSink>,
}

impl Fixture {
    fn new(content: FakeContentSource) -> Self {
        Self::with(content, false, false)
    }

    fn with(content: FakeContentSource, failing_sink: bool, failing_bank: bool) -> Self {
        let content = Arc::new(content);
        let options = Arc::new(FakeOptionSource::new());
        let sink = Arc::new(FakeSubmissionSink {
            failing: failing_sink,
            requests: Mutex::new(Vec::new()),
        });
        let service = FormService::new(
            content.clone(),
            options.clone(),
            Arc::new(FakeBankDirectory {
                failing: failing_bank,
            }),
            sink.clone(),
            ValidationEngine::new(),
        );
        Self {
            service,
            content,
            options,
            sink,
        }
    }

    async fn open(&self, mode: FormMode, reference_number: Option<&str>) -> FormSession {
        let opened = self
            .service
            .open_session(OpenSessionInput {
                service_id: service_id(),
                mode,
                reference_number: reference_number.map(ReferenceNumber::new),
            })
            .await;
        match opened {
            Ok(session) => session,
            Err(error) => panic!("session should open: {error}"),
        }
    }

    async fn set(&self, session: &mut FormSession, key: &str, value: &str) {
        let result = self
            .service
            .set_value(session, key, FieldValue::text(value))
            .await;
        assert!(result.is_ok(), "setting {key} failed: {result:?}");
    }
}

fn service_id() -> ServiceId {
    let Ok(service_id) = ServiceId::new("old-age-pension") else {
        panic!("service id should be valid");
    };
    service_id
}

fn options_of(session: &FormSession, section_index: usize, field_name: &str) -> Vec<SelectOption> {
    session
        .schema()
        .section(section_index)
        .and_then(|section| section.find_field(field_name))
        .map(|field| field.options().to_vec())
        .unwrap_or_default()
}

fn returned_application() -> PriorSubmission {
    let mut form_details = SubmissionPayload::new();
    form_details.push_section(
        "Applicant Details",
        vec![
            SubmittedField::new(
                "Name",
                "Name",
                Some(SubmittedContent::Value("RAVI".to_owned())),
                None,
            ),
            SubmittedField::new(
                "Age",
                "Age",
                Some(SubmittedContent::Value("40".to_owned())),
                None,
            ),
            SubmittedField::new(
                "Gender",
                "Gender",
                Some(SubmittedContent::Value("Female".to_owned())),
                None,
            ),
        ],
    );
    form_details.push_section(
        "Present Address Details",
        vec![SubmittedField::new(
            "District",
            "PresentDistrict",
            Some(SubmittedContent::Value("D2".to_owned())),
            None,
        )],
    );
    PriorSubmission {
        form_details,
        return_fields: vec!["Name".to_owned()],
    }
}

#[tokio::test]
async fn next_keeps_the_step_when_one_of_three_fields_fails() {
    let fixture = Fixture::new(FakeContentSource::new(APPLICATION_FORM));
    let mut session = fixture.open(FormMode::New, None).await;
    fixture.set(&mut session, "Name", "Ravi").await;
    fixture.set(&mut session, "Age", "4x").await;
    fixture.set(&mut session, "Gender", "Female").await;

    let outcome = fixture.service.next(&mut session).await;

    assert_eq!(
        outcome.ok(),
        Some(StepOutcome::Invalid {
            errors: BTreeMap::from([("Age".to_owned(), "Please enter only digits.".to_owned())]),
        })
    );
    assert_eq!(session.current_step(), 0);
    assert_eq!(session.errors().len(), 1);
    assert!(!session.values().contains("PresentAddress"));
}

#[tokio::test]
async fn district_selection_fills_tehsil_options() {
    let fixture = Fixture::new(FakeContentSource::new(DISTRICT_FORM));
    let mut session = fixture.open(FormMode::New, None).await;

    let outcome = fixture.service.next(&mut session).await;
    let Ok(StepOutcome::Invalid { errors }) = outcome else {
        panic!("empty name should block the step");
    };
    assert_eq!(
        errors.get("Name").map(String::as_str),
        Some("This field is required.")
    );

    fixture.set(&mut session, "District", "D1").await;

    assert_eq!(
        options_of(&session, 0, "Tehsil"),
        vec![
            SelectOption::please_select(),
            SelectOption::new("T1", "Tehsil 1")
        ]
    );
    assert_eq!(*fixture.options.calls.lock().await, vec!["D1".to_owned()]);
}

#[tokio::test]
async fn failed_tehsil_fetch_keeps_the_current_options() {
    let fixture = Fixture::new(FakeContentSource::new(DISTRICT_FORM));
    let mut session = fixture.open(FormMode::New, None).await;

    fixture.set(&mut session, "District", "D9").await;

    assert_eq!(
        options_of(&session, 0, "Tehsil"),
        vec![SelectOption::please_select()]
    );
}

#[tokio::test]
async fn edit_mode_unlocks_only_returned_fields() {
    let fixture = Fixture::new(
        FakeContentSource::new(APPLICATION_FORM).with_prior(returned_application()),
    );
    let mut session = fixture.open(FormMode::Edit, Some("APP-9")).await;

    assert_eq!(
        *fixture.content.requested_details.lock().await,
        vec!["APP-9".to_owned()]
    );
    assert!(session.is_field_disabled("Age"));
    assert!(session.is_field_disabled("Gender"));
    assert!(!session.is_field_disabled("Name"));
    assert!(matches!(
        fixture
            .service
            .set_value(&mut session, "Age", FieldValue::text("41"))
            .await,
        Err(AppError::Validation(_))
    ));

    assert_eq!(
        fixture.service.next(&mut session).await.ok(),
        Some(StepOutcome::Unmodified {
            fields: vec!["Name".to_owned()],
        })
    );

    fixture.set(&mut session, "Name", "Ravi Kumar").await;
    assert_eq!(
        fixture.service.next(&mut session).await.ok(),
        Some(StepOutcome::Advanced { step: 1 })
    );

    let receipt = fixture.service.save(&mut session).await;
    assert_eq!(receipt.ok().map(|receipt| receipt.kind), Some(SubmissionKind::Edit));
    let requests = fixture.sink.requests.lock().await;
    assert_eq!(requests[0].return_fields, Some(vec!["Name".to_owned()]));
    assert_eq!(requests[0].reference_number.as_str(), "APP-9");
}

#[tokio::test]
async fn seeded_sessions_fetch_tehsils_and_default_selects() {
    let mut prior = returned_application();
    prior.form_details = {
        let mut form_details = SubmissionPayload::new();
        form_details.push_section(
            "Present Address Details",
            vec![SubmittedField::new(
                "District",
                "PresentDistrict",
                Some(SubmittedContent::Value("D2".to_owned())),
                None,
            )],
        );
        form_details
    };
    let fixture = Fixture::new(FakeContentSource::new(APPLICATION_FORM).with_prior(prior));

    let session = fixture.open(FormMode::Incomplete, Some("APP-3")).await;

    assert_eq!(*fixture.options.calls.lock().await, vec!["D2".to_owned()]);
    assert_eq!(
        options_of(&session, 1, "PresentTehsil"),
        vec![
            SelectOption::please_select(),
            SelectOption::new("T2", "Tehsil 2")
        ]
    );
    assert_eq!(session.values().text("Gender"), Some("Please Select"));
    assert_eq!(session.return_fields(), None);
    assert!(!session.is_field_disabled("Age"));
}

#[tokio::test]
async fn copying_the_address_refreshes_only_the_permanent_section() {
    let fixture = Fixture::new(FakeContentSource::new(APPLICATION_FORM));
    let mut session = fixture.open(FormMode::New, None).await;
    fixture.set(&mut session, "PresentDistrict", "D1").await;
    fixture.set(&mut session, "PresentAddress", "Main Road").await;
    fixture.options.calls.lock().await.clear();
    let Some(present_before) = session.schema().section(1).cloned() else {
        panic!("present address section should exist");
    };

    let copied = fixture.service.copy_present_address(&mut session).await;

    assert!(matches!(copied, Ok(3)));
    assert_eq!(*fixture.options.calls.lock().await, vec!["D1".to_owned()]);
    let Some(present_after) = session.schema().section(1) else {
        panic!("present address section should exist");
    };
    assert!(Arc::ptr_eq(&present_before, present_after));
    assert_eq!(
        options_of(&session, 2, "PermanentTehsil"),
        vec![
            SelectOption::please_select(),
            SelectOption::new("T1", "Tehsil 1")
        ]
    );
    assert_eq!(session.values().text("PermanentDistrict"), Some("D1"));
    assert_eq!(session.values().text("PermanentAddress"), Some("Main Road"));
}

#[tokio::test]
async fn switching_branches_moves_validation_to_the_new_branch() {
    let fixture = Fixture::new(FakeContentSource::new(BRANCH_FORM));
    let mut session = fixture.open(FormMode::New, None).await;
    assert_eq!(session.values().text("MaritalStatus"), Some("A"));

    let Ok(StepOutcome::Invalid { errors }) = fixture.service.next(&mut session).await else {
        panic!("empty branch field should block the step");
    };
    assert_eq!(errors.keys().collect::<Vec<_>>(), ["MaritalStatus_f1"]);

    fixture.set(&mut session, "MaritalStatus", "B").await;
    let Ok(StepOutcome::Invalid { errors }) = fixture.service.next(&mut session).await else {
        panic!("empty branch field should block the step");
    };
    assert_eq!(errors.keys().collect::<Vec<_>>(), ["MaritalStatus_f2"]);

    fixture.set(&mut session, "MaritalStatus_f2", "yes").await;
    assert_eq!(
        fixture.service.next(&mut session).await.ok(),
        Some(StepOutcome::Advanced { step: 1 })
    );

    assert!(fixture.service.save(&mut session).await.is_ok());
    let requests = fixture.sink.requests.lock().await;
    assert!(requests[0].payload.find("MaritalStatus_f1").is_none());
    assert!(requests[0].payload.find("MaritalStatus_f2").is_some());
}

#[tokio::test]
async fn stale_validation_results_are_discarded() {
    let fixture = Fixture::new(FakeContentSource::new(APPLICATION_FORM));
    let mut session = fixture.open(FormMode::New, None).await;
    let Some(stale) = session.begin_validation("Name") else {
        panic!("Name should be validatable");
    };

    fixture.set(&mut session, "Name", "Ravi").await;
    let outcome = stale.run(fixture.service.validation_engine()).await;

    assert!(!outcome.is_valid());
    assert!(!session.apply_validation(&stale, outcome));
    assert_eq!(session.error("Name"), None);

    let Some(fresh) = session.begin_validation("Name") else {
        panic!("Name should be validatable");
    };
    let outcome = fresh.run(fixture.service.validation_engine()).await;
    assert!(session.apply_validation(&fresh, outcome));
}

#[tokio::test]
async fn drafts_skip_validation_and_keep_the_assigned_reference() {
    let fixture = Fixture::new(FakeContentSource::new(APPLICATION_FORM));
    let mut session = fixture.open(FormMode::New, None).await;
    fixture.set(&mut session, "Name", "ravi").await;

    let first = fixture.service.save(&mut session).await;
    let second = fixture.service.save(&mut session).await;

    assert_eq!(first.ok().map(|receipt| receipt.kind), Some(SubmissionKind::Save));
    assert!(second.is_ok());
    assert_eq!(session.reference_number().as_str(), "APP-1");
    let requests = fixture.sink.requests.lock().await;
    assert_eq!(requests[0].status, SubmissionStatus::Incomplete);
    assert!(!requests[0].reference_number.is_assigned());
    assert_eq!(requests[1].reference_number.as_str(), "APP-1");
    assert_eq!(requests[0].return_fields, None);
    assert_eq!(
        requests[0]
            .payload
            .find("Name")
            .and_then(SubmittedField::content),
        Some(&SubmittedContent::Value("RAVI".to_owned()))
    );
}

#[tokio::test]
async fn submit_is_only_available_on_the_last_step() {
    let fixture = Fixture::new(FakeContentSource::new(APPLICATION_FORM));
    let mut session = fixture.open(FormMode::New, None).await;

    assert!(matches!(
        fixture.service.submit(&mut session).await,
        Err(AppError::Conflict(_))
    ));
    assert!(fixture.sink.requests.lock().await.is_empty());
}

#[tokio::test]
async fn submit_validates_sends_files_and_ends_the_session() {
    let fixture = Fixture::new(FakeContentSource::new(SINGLE_STEP_FORM));
    let mut session = fixture.open(FormMode::New, None).await;

    let outcome = fixture.service.submit(&mut session).await;
    assert!(matches!(outcome, Ok(SubmitOutcome::Invalid { .. })));
    assert!(fixture.sink.requests.lock().await.is_empty());

    fixture.set(&mut session, "Name", "Ravi").await;
    let picker = FakePicker(PickOutcome::Picked(FileRef::new(
        "file:///tmp/photo.jpg",
        "photo.jpg",
        "image/jpeg",
    )));
    let attached = fixture
        .service
        .attach_file(&mut session, "ApplicantImage", &picker)
        .await;
    assert!(matches!(attached, Ok(true)));

    let outcome = fixture.service.submit(&mut session).await;
    let Ok(SubmitOutcome::Submitted(receipt)) = outcome else {
        panic!("valid application should be submitted");
    };
    assert_eq!(receipt.kind, SubmissionKind::Submit);
    assert!(session.is_submitted());
    {
        let requests = fixture.sink.requests.lock().await;
        assert_eq!(requests[0].status, SubmissionStatus::Initiated);
        assert_eq!(requests[0].files.len(), 1);
        assert_eq!(requests[0].files[0].field_name, "ApplicantImage");
    }

    assert!(matches!(
        fixture
            .service
            .set_value(&mut session, "Name", FieldValue::text("Other"))
            .await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        fixture.service.save(&mut session).await,
        Err(AppError::Conflict(_))
    ));
}

#[tokio::test]
async fn failed_submission_retains_the_session() {
    let fixture = Fixture::with(FakeContentSource::new(SINGLE_STEP_FORM), true, false);
    let mut session = fixture.open(FormMode::New, None).await;
    fixture.set(&mut session, "Name", "Ravi").await;

    let outcome = fixture.service.submit(&mut session).await;

    assert!(matches!(outcome, Err(AppError::Submission(_))));
    assert!(!session.is_submitted());
    assert_eq!(session.values().text("Name"), Some("Ravi"));
    assert_eq!(session.current_step(), 0);
}

#[tokio::test]
async fn prev_never_goes_below_the_first_step() {
    let fixture = Fixture::new(FakeContentSource::new(BRANCH_FORM));
    let mut session = fixture.open(FormMode::New, None).await;
    fixture.set(&mut session, "MaritalStatus_f1", "yes").await;
    assert!(fixture.service.next(&mut session).await.is_ok());

    assert!(matches!(fixture.service.prev(&mut session), Ok(0)));
    assert!(matches!(fixture.service.prev(&mut session), Ok(0)));
}

#[tokio::test]
async fn attaching_files_targets_the_enclosure_file_slot() {
    let fixture = Fixture::new(FakeContentSource::new(APPLICATION_FORM));
    let mut session = fixture.open(FormMode::New, None).await;
    let document = FileRef::new("file:///tmp/id.pdf", "id.pdf", "application/pdf");

    let attached = fixture
        .service
        .attach_file(
            &mut session,
            "IdProof",
            &FakePicker(PickOutcome::Picked(document.clone())),
        )
        .await;
    assert!(matches!(attached, Ok(true)));
    assert_eq!(
        session.values().get("IdProof_file"),
        Some(&FieldValue::File(document))
    );

    let cancelled = fixture
        .service
        .attach_file(&mut session, "ApplicantImage", &FakePicker(PickOutcome::Cancelled))
        .await;
    assert!(matches!(cancelled, Ok(false)));
    assert!(!session.values().contains("ApplicantImage"));

    let rejected = fixture
        .service
        .attach_file(&mut session, "Name", &FakePicker(PickOutcome::Cancelled))
        .await;
    assert!(matches!(rejected, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn ifsc_lookup_fills_or_clears_the_code() {
    let fixture = Fixture::new(FakeContentSource::new(APPLICATION_FORM));
    let mut session = fixture.open(FormMode::New, None).await;
    fixture.set(&mut session, "BankName", "SBI").await;

    assert!(matches!(
        fixture.service.lookup_ifsc(&mut session).await,
        Ok(None)
    ));
    assert!(!session.values().contains("IfscCode"));

    fixture.set(&mut session, "BranchName", "Main").await;
    let code = fixture.service.lookup_ifsc(&mut session).await;
    assert_eq!(code.ok().flatten().as_deref(), Some("sbin0001"));
    assert_eq!(session.values().text("IfscCode"), Some("SBIN0001"));

    fixture.set(&mut session, "BranchName", "Unknown").await;
    assert!(matches!(
        fixture.service.lookup_ifsc(&mut session).await,
        Ok(None)
    ));
    assert_eq!(session.values().text("IfscCode"), Some(""));
}

#[tokio::test]
async fn failed_ifsc_lookup_clears_the_code() {
    let fixture = Fixture::with(FakeContentSource::new(APPLICATION_FORM), false, true);
    let mut session = fixture.open(FormMode::New, None).await;
    fixture.set(&mut session, "BankName", "SBI").await;
    fixture.set(&mut session, "BranchName", "Main").await;
    fixture.set(&mut session, "IfscCode", "OLD").await;

    assert!(matches!(
        fixture.service.lookup_ifsc(&mut session).await,
        Ok(None)
    ));
    assert_eq!(session.values().text("IfscCode"), Some(""));
}

#[tokio::test]
async fn sessions_need_a_configured_form_and_a_reference_to_resume() {
    let mut unconfigured = FakeContentSource::new(APPLICATION_FORM);
    unconfigured.status = false;
    let fixture = Fixture::new(unconfigured);
    let opened = fixture
        .service
        .open_session(OpenSessionInput {
            service_id: service_id(),
            mode: FormMode::New,
            reference_number: None,
        })
        .await;
    assert!(matches!(opened, Err(AppError::Schema(_))));

    let fixture = Fixture::new(FakeContentSource::new(r#"[{ "id": 0, "fields": [] }]"#));
    let opened = fixture
        .service
        .open_session(OpenSessionInput {
            service_id: service_id(),
            mode: FormMode::New,
            reference_number: None,
        })
        .await;
    assert!(matches!(opened, Err(AppError::Schema(_))));

    let fixture = Fixture::new(FakeContentSource::new(APPLICATION_FORM));
    let opened = fixture
        .service
        .open_session(OpenSessionInput {
            service_id: service_id(),
            mode: FormMode::Incomplete,
            reference_number: None,
        })
        .await;
    assert!(matches!(opened, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn validate_step_reports_errors_without_moving() {
    let fixture = Fixture::new(FakeContentSource::new(SINGLE_STEP_FORM));
    let mut session = fixture.open(FormMode::New, None).await;

    let errors = fixture.service.validate_step(&mut session).await;

    let Ok(errors) = errors else {
        panic!("open session should validate");
    };
    assert_eq!(
        errors.get("Name").map(String::as_str),
        Some("This field is required.")
    );
    assert_eq!(
        session.error("Name"),
        Some("This field is required.")
    );
    assert_eq!(session.current_step(), 0);
}

#[tokio::test]
async fn empty_form_definitions_cannot_be_opened() {
    let fixture = Fixture::new(FakeContentSource::new("[]"));
    let opened = fixture
        .service
        .open_session(OpenSessionInput {
            service_id: service_id(),
            mode: FormMode::New,
            reference_number: None,
        })
        .await;

    let Err(AppError::Schema(message)) = opened else {
        panic!("an empty form must not open");
    };
    assert_eq!(message, "no form configuration available");
    assert!(fixture.sink.requests.lock().await.is_empty());
}

#[tokio::test]
async fn unconditional_children_are_validated_whatever_the_parent_holds() {
    let fixture = Fixture::new(FakeContentSource::new(ACCOUNT_FORM));
    let mut session = fixture.open(FormMode::New, None).await;
    assert_eq!(session.values().text("HasAccount"), Some("Yes"));

    let Ok(StepOutcome::Invalid { errors }) = fixture.service.next(&mut session).await else {
        panic!("empty nested field should block the step");
    };
    assert_eq!(errors.keys().collect::<Vec<_>>(), ["HasAccount_AccountNumber"]);

    fixture.set(&mut session, "HasAccount", "No").await;
    let Ok(StepOutcome::Invalid { errors }) = fixture.service.next(&mut session).await else {
        panic!("nested field stays required for every parent value");
    };
    assert_eq!(errors.keys().collect::<Vec<_>>(), ["HasAccount_AccountNumber"]);

    fixture.set(&mut session, "HasAccount_AccountNumber", "001122").await;
    assert_eq!(
        fixture.service.next(&mut session).await.ok(),
        Some(StepOutcome::Advanced { step: 1 })
    );
}

#[tokio::test]
async fn ifsc_lookup_is_skipped_when_the_form_has_no_code_field() {
    let fixture = Fixture::new(FakeContentSource::new(ACCOUNT_FORM));
    let mut session = fixture.open(FormMode::New, None).await;
    fixture.set(&mut session, "BankName", "SBI").await;
    fixture.set(&mut session, "BranchName", "Main").await;

    assert!(matches!(
        fixture.service.lookup_ifsc(&mut session).await,
        Ok(None)
    ));
    assert!(!session.values().contains("IfscCode"));
}
