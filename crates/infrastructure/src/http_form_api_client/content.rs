use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use seva_application::{
    BankDirectory, DependentOptionSource, FormContentSource, PriorSubmission, ServiceContent,
};
use seva_core::{AppError, AppResult, ReferenceNumber, ServiceId};
use seva_domain::{SelectOption, SubmissionPayload};

use super::HttpFormApiClient;

const SERVICE_CONTENT_PATH: &str = "/User/GetServiceContent";
const FORM_DETAILS_PATH: &str = "/User/GetFormDetails";
const TEHSILS_PATH: &str = "/Base/GetTeshilForDistrict";
const IFSC_CODE_PATH: &str = "/Base/GetIFSCCode";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceContentResponse {
    status: bool,
    #[serde(default)]
    form_element: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormDetailsResponse {
    #[serde(default)]
    form_details: Value,
    #[serde(default)]
    additional_details: Option<AdditionalDetailsResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdditionalDetailsResponse {
    #[serde(default)]
    return_fields: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TehsilsResponse {
    status: bool,
    #[serde(default)]
    tehsils: Vec<TehsilResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TehsilResponse {
    tehsil_id: Value,
    tehsil_name: String,
}

#[derive(Debug, Deserialize)]
struct IfscCodeResponse {
    status: bool,
    #[serde(default)]
    result: Vec<String>,
}

#[async_trait]
impl FormContentSource for HttpFormApiClient {
    async fn service_content(&self, service_id: &ServiceId) -> AppResult<ServiceContent> {
        let request = self
            .get(SERVICE_CONTENT_PATH)
            .await?
            .query(&[("serviceId", service_id.as_str())]);
        let response: ServiceContentResponse =
            self.send_json(SERVICE_CONTENT_PATH, request).await?;

        // Backends serve the definition either as a JSON string or inline.
        let form_element = match response.form_element {
            Value::String(raw) => raw,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Ok(ServiceContent {
            status: response.status,
            form_element,
        })
    }

    async fn form_details(
        &self,
        reference_number: &ReferenceNumber,
    ) -> AppResult<PriorSubmission> {
        let request = self
            .get(FORM_DETAILS_PATH)
            .await?
            .query(&[("applicationId", reference_number.as_str())]);
        let response: FormDetailsResponse = self.send_json(FORM_DETAILS_PATH, request).await?;

        let form_details = match response.form_details {
            Value::Null => SubmissionPayload::new(),
            Value::String(raw) => serde_json::from_str(&raw).map_err(|error| {
                AppError::Remote(format!("stored form details are not valid JSON: {error}"))
            })?,
            other => serde_json::from_value(other).map_err(|error| {
                AppError::Remote(format!("stored form details are malformed: {error}"))
            })?,
        };
        let return_fields = response
            .additional_details
            .map(|details| return_fields(&details.return_fields))
            .unwrap_or_default();

        Ok(PriorSubmission {
            form_details,
            return_fields,
        })
    }
}

#[async_trait]
impl DependentOptionSource for HttpFormApiClient {
    async fn tehsils_for_district(&self, district_id: &str) -> AppResult<Vec<SelectOption>> {
        let request = self
            .get(TEHSILS_PATH)
            .await?
            .query(&[("districtId", district_id)]);
        let response: TehsilsResponse = self.send_json(TEHSILS_PATH, request).await?;
        if !response.status {
            return Err(AppError::NotFound(format!(
                "no tehsils listed for district '{district_id}'"
            )));
        }

        Ok(response
            .tehsils
            .into_iter()
            .filter_map(|tehsil| {
                scalar_text(&tehsil.tehsil_id)
                    .map(|tehsil_id| SelectOption::new(tehsil_id, tehsil.tehsil_name))
            })
            .collect())
    }
}

#[async_trait]
impl BankDirectory for HttpFormApiClient {
    async fn ifsc_code(&self, bank_name: &str, branch_name: &str) -> AppResult<Option<String>> {
        let request = self
            .get(IFSC_CODE_PATH)
            .await?
            .query(&[("bankName", bank_name), ("branchName", branch_name)]);
        let response: IfscCodeResponse = self.send_json(IFSC_CODE_PATH, request).await?;

        Ok(response
            .status
            .then(|| response.result.into_iter().next())
            .flatten()
            .filter(|code| !code.is_empty()))
    }
}

/// Reads `returnFields` sent either as a list or as a comma separated string.
fn return_fields(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        Value::String(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
