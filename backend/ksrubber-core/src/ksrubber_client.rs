// src/ksrubber_client.rs

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::ksrubber_data::*;

pub const DEFAULT_API_BASE_URL: &str = "https://ksrubber-backend.vercel.app/afx/pro_ksrubber/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Backend error: Status={status}, Message='{message}'")]
    Status { status: StatusCode, message: String },

    /// 2xx response whose `status` field is not `"success"`.
    #[error("Backend rejected '{context}' (status '{status}')")]
    Rejected { context: String, status: String },

    #[error("Response for '{context}' has no usable '{field}'")]
    MissingField { context: String, field: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Every backend call the dashboard makes. The engine only talks to this
/// trait, so flows can run against [`KsRubberClient`] or an in-memory fake.
#[async_trait]
pub trait ProductionApi: Send + Sync {
    async fn list_dies(&self) -> Result<Vec<DieRecord>, ApiError>;
    /// Returns the id assigned to the new die.
    async fn add_die(&self, die: &NewDie) -> Result<String, ApiError>;
    async fn edit_die(&self, die_id: &str, update: &DieUpdate) -> Result<DieRecord, ApiError>;
    async fn delete_die(&self, die_id: &str) -> Result<(), ApiError>;

    async fn list_daily_production(&self) -> Result<Vec<DailyProductionRecord>, ApiError>;
    async fn add_daily_production(&self, entry: &DailyProductionEntry) -> Result<(), ApiError>;
    async fn delete_production(&self, sno: &str) -> Result<(), ApiError>;

    async fn compute_production(&self, request: &ComputeRequest) -> Result<ComputePreview, ApiError>;
    async fn submit_production(
        &self,
        submission: &ProductionSubmission,
    ) -> Result<SubmitReceipt, ApiError>;

    async fn monthly_income_totals(&self) -> Result<MonthlyIncomeTotals, ApiError>;
    async fn update_current_expenses(&self, expenses: &Expenses) -> Result<Expenses, ApiError>;
    async fn base_income(&self) -> Result<Decimal, ApiError>;
    async fn update_base_income(&self, income: Decimal) -> Result<Decimal, ApiError>;
    async fn month_income(&self, year: i32, month: u32) -> Result<Decimal, ApiError>;
}

#[derive(Clone)]
pub struct KsRubberClient {
    config: Arc<ClientConfig>,
    http_client: Client,
}

impl KsRubberClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        if config.base_url.trim().is_empty() {
            return Err(ApiError::Config("API base URL is empty".to_string()));
        }
        // Fail early on a malformed base URL rather than on the first request.
        Url::parse(&config.base_url)?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ApiError> {
        let base = self.config.base_url.trim_end_matches('/');
        let url = format!("{}/{}", base, endpoint.trim_start_matches('/'));
        Ok(Url::parse(&url)?)
    }

    pub fn build_request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint_url(endpoint)?;
        Ok(self
            .http_client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json"))
    }

    /// Sends the request and returns the decoded JSON body of a 2xx response.
    pub async fn send_json(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<Value, ApiError> {
        let request = match request_builder.build() {
            Ok(req) => req,
            Err(e) => {
                error!("Request build failed for '{}': {}", context_msg, e);
                return Err(ApiError::Request(e));
            }
        };
        let request_url = request.url().to_string();
        debug!("Sending request for '{}' to URL: {}", context_msg, request_url);

        let resp = match self.http_client.execute(request).await {
            Ok(resp) => resp,
            Err(e) => {
                error!(
                    "HTTP execution failed before receiving response for '{}' (URL: {}): {}",
                    context_msg, request_url, e
                );
                return Err(ApiError::Request(e));
            }
        };

        let status = resp.status();
        info!(
            "Received response for '{}' (URL: {}): Status={}",
            context_msg, request_url, status
        );

        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
            error!(
                "API Error Response: Status={}, Body='{}' for URL: {}",
                status, error_body, request_url
            );
            return Err(ApiError::Status {
                status,
                message: error_message_from_body(&error_body),
            });
        }

        let bytes = resp.bytes().await?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) => {
                debug!("Decoded response body for '{}'", context_msg);
                Ok(body)
            }
            Err(e) => {
                error!(
                    "JSON deserialization failed for '{}' (URL: {}): {}",
                    context_msg, request_url, e
                );
                Err(ApiError::Json(e))
            }
        }
    }

    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        context_msg: &str,
    ) -> Result<Value, ApiError> {
        let request = self.build_request(method, endpoint)?;
        self.send_json(request, context_msg).await
    }
}

/// FastAPI-style backends report `detail`, others `message`.
fn error_message_from_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(parsed) => parsed
            .get("message")
            .or_else(|| parsed.get("detail"))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| body.to_string()),
        Err(_) => body.to_string(),
    }
}

/// Accepts bodies without a `status` field; rejects any explicit non-success.
fn ensure_success(body: &Value, context_msg: &str) -> Result<(), ApiError> {
    match body.get("status").and_then(Value::as_str) {
        None | Some(STATUS_SUCCESS) => Ok(()),
        Some(other) => {
            warn!("'{}' answered with status '{}'", context_msg, other);
            Err(ApiError::Rejected {
                context: context_msg.to_string(),
                status: other.to_string(),
            })
        }
    }
}

fn take_data(body: &mut Value) -> Value {
    body.get_mut("data").map(Value::take).unwrap_or(Value::Null)
}

#[async_trait]
impl ProductionApi for KsRubberClient {
    async fn list_dies(&self) -> Result<Vec<DieRecord>, ApiError> {
        let context = "List Dies";
        let mut body = self.call(Method::GET, "get_all_die", context).await?;
        ensure_success(&body, context)?;
        Ok(items_from_value(take_data(&mut body), context))
    }

    async fn add_die(&self, die: &NewDie) -> Result<String, ApiError> {
        let context = "Add Die";
        let request = self.build_request(Method::POST, "add_die")?.json(die);
        let body = self.send_json(request, context).await?;
        ensure_success(&body, context)?;
        body.get("DieId")
            .or_else(|| body.get("data").and_then(|data| data.get("DieId")))
            .map(string_from_value)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::MissingField {
                context: context.to_string(),
                field: "DieId".to_string(),
            })
    }

    async fn edit_die(&self, die_id: &str, update: &DieUpdate) -> Result<DieRecord, ApiError> {
        let context = "Edit Die";
        let endpoint = format!("edit_die/{}", die_id);
        let request = self.build_request(Method::PUT, &endpoint)?.json(update);
        let mut body = self.send_json(request, context).await?;
        ensure_success(&body, context)?;
        Ok(serde_json::from_value(take_data(&mut body))?)
    }

    async fn delete_die(&self, die_id: &str) -> Result<(), ApiError> {
        let context = "Delete Die";
        let endpoint = format!("delete_die/{}", die_id);
        let body = self.call(Method::DELETE, &endpoint, context).await?;
        ensure_success(&body, context)
    }

    async fn list_daily_production(&self) -> Result<Vec<DailyProductionRecord>, ApiError> {
        let context = "List Daily Production";
        let mut body = self.call(Method::GET, "daily-production/", context).await?;
        ensure_success(&body, context)?;
        Ok(items_from_value(take_data(&mut body), context))
    }

    async fn add_daily_production(&self, entry: &DailyProductionEntry) -> Result<(), ApiError> {
        let context = "Add Daily Production";
        let request = self
            .build_request(Method::POST, "add_daily_production")?
            .json(entry);
        let body = self.send_json(request, context).await?;
        ensure_success(&body, context)
    }

    async fn delete_production(&self, sno: &str) -> Result<(), ApiError> {
        let context = "Delete Production";
        let endpoint = format!("delete_production/{}", sno);
        let body = self.call(Method::DELETE, &endpoint, context).await?;
        ensure_success(&body, context)
    }

    async fn compute_production(&self, request: &ComputeRequest) -> Result<ComputePreview, ApiError> {
        let context = "Compute Production";
        let input_date = request.input_date.format("%Y-%m-%d").to_string();
        let sub_flag = request.sub_flag.to_string();
        let builder = self
            .build_request(Method::POST, "compute_production/")?
            .query(&[("input_date", input_date.as_str()), ("sub_flag", sub_flag.as_str())])
            .json(request);
        let body = self.send_json(builder, context).await?;
        ensure_success(&body, context)?;
        Ok(serde_json::from_value(body)?)
    }

    async fn submit_production(
        &self,
        submission: &ProductionSubmission,
    ) -> Result<SubmitReceipt, ApiError> {
        let context = "Submit Production";
        let request = self
            .build_request(Method::POST, "calculate_production_hours")?
            .json(submission);
        let body = self.send_json(request, context).await?;
        ensure_success(&body, context)?;
        Ok(serde_json::from_value(body)?)
    }

    async fn monthly_income_totals(&self) -> Result<MonthlyIncomeTotals, ApiError> {
        let context = "Monthly Income Totals";
        let body = self.call(Method::GET, "monthly-income/", context).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn update_current_expenses(&self, expenses: &Expenses) -> Result<Expenses, ApiError> {
        let context = "Update Current Expenses";
        let request = self
            .build_request(Method::PUT, "monthly-income/current")?
            .json(expenses);
        let mut body = self.send_json(request, context).await?;
        ensure_success(&body, context)?;
        let data = take_data(&mut body);
        if !data.is_object() {
            return Err(ApiError::MissingField {
                context: context.to_string(),
                field: "data".to_string(),
            });
        }
        Ok(serde_json::from_value(data)?)
    }

    async fn base_income(&self) -> Result<Decimal, ApiError> {
        let context = "Get Base Income";
        let body = self.call(Method::GET, "get-setting-income", context).await?;
        Ok(income_from_response(&body).unwrap_or_else(|| {
            warn!("'{}' returned no recognisable income; using 0", context);
            Decimal::ZERO
        }))
    }

    async fn update_base_income(&self, income: Decimal) -> Result<Decimal, ApiError> {
        let context = "Update Base Income";
        let income_param = income.normalize().to_string();
        let request = self
            .build_request(Method::PUT, "setting-income")?
            .query(&[("income", income_param.as_str())]);
        let body = self.send_json(request, context).await?;
        ensure_success(&body, context)?;
        income_from_response(&body).ok_or_else(|| ApiError::MissingField {
            context: context.to_string(),
            field: "income".to_string(),
        })
    }

    async fn month_income(&self, year: i32, month: u32) -> Result<Decimal, ApiError> {
        let context = "Get Month Income";
        let year_param = year.to_string();
        let month_param = month.to_string();
        let request = self
            .build_request(Method::GET, "get_month_income/")?
            .query(&[("year", year_param.as_str()), ("month", month_param.as_str())]);
        let body = self.send_json(request, context).await?;
        Ok(month_income_from_response(&body))
    }
}
