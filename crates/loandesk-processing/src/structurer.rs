//! Structured-data extraction
//!
//! Turns OCR text into a flat field map with a language model. The result
//! always carries the exact input text under `raw_extracted_text`; model
//! failures are recorded on the record instead of being returned as errors.

use loandesk_core::models::{
    concatenate_text, ExtractionResult, StructuredRecord, DOCUMENT_TYPE_FIELD, ERROR_FIELD,
};
use loandesk_plugins::LlmClient;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;

const SYSTEM_PROMPT: &str = "You are a document analysis expert specialized in extracting \
structured data from financial and loan application documents.

Extract all information relevant to financial analysis: personal details, income, expenses, \
assets, liabilities and other financial data.

Instructions:
1. Omit fields that cannot be found in the documents.
2. Keep currency symbols on monetary values (e.g. \"$5,000\").
3. If a value appears more than once, use the most specific instance.
4. Decide the document type (pay slip, bank statement, ID, loan application, ...) and report it \
as document_type.
5. For allowances, look for medical allowance, HRA and other allowances.

Return a single JSON object whose keys are snake_case field names that reflect the fields found \
(e.g. \"account_balance\", \"employer_name\", \"hra_allowance\").";

/// Loan fields the model is pointed at when the caller gives no hints.
pub const DEFAULT_FIELD_HINTS: &[&str] = &[
    "first_name",
    "middle_name",
    "last_name",
    "sex",
    "dob",
    "drivers_licence_number",
    "passport_number",
    "medicare_number",
    "address",
    "gross_wage_per_month",
    "tax",
    "net_wage_per_month",
    "super_per_month",
    "rental_property_income",
    "dividend_income",
    "interest_income",
    "allowance_income",
    "other_investment_income",
    "grocery_expenses_per_month",
    "education_expenses",
    "mortgage_expenses",
    "travel_expenses",
    "other_expenses",
    "main_residence_address",
    "main_residence_purchase_price",
    "number_of_investment_properties",
    "investment_property_purchase_price",
    "car_model_make",
    "car_purchase_price",
    "share_portfolio_market_value",
    "mortgage_outstanding",
    "credit_card_limit",
    "personal_loan_outstanding",
    "car_loan_outstanding",
    "other_loans_outstanding",
    "number_of_dependents",
    "age_of_dependents",
    "hecs_fees_outstanding",
    "name_of_last_employer",
    "referee_name",
    "document_type",
];

#[derive(Clone)]
pub struct Structurer {
    llm: Option<Arc<dyn LlmClient>>,
    remote_permits: Option<Arc<Semaphore>>,
}

impl Structurer {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            llm,
            remote_permits: None,
        }
    }

    /// Share the process-wide cap on remote calls.
    pub fn with_remote_permits(mut self, permits: Arc<Semaphore>) -> Self {
        self.remote_permits = Some(permits);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    /// Structure the extraction results of one submission.
    pub async fn structure(
        &self,
        results: &[ExtractionResult],
        field_hints: &[&str],
    ) -> StructuredRecord {
        let raw_text = concatenate_text(results);

        let Some(llm) = &self.llm else {
            tracing::debug!("No language model configured, returning raw text only");
            let mut record = StructuredRecord::new(raw_text);
            record.insert(DOCUMENT_TYPE_FIELD, "Unknown");
            return record;
        };

        let user_prompt = build_prompt(results, field_hints);

        let _permit = match &self.remote_permits {
            Some(permits) => permits.acquire().await.ok(),
            None => None,
        };

        let start = std::time::Instant::now();
        match llm.complete_json(SYSTEM_PROMPT, &user_prompt).await {
            Ok(content) => {
                let record = parse_model_output(&raw_text, &content);
                tracing::info!(
                    model = llm.model(),
                    fields = record.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Structured data extracted"
                );
                record
            }
            Err(e) => {
                tracing::warn!(model = llm.model(), error = %e, "Structured data extraction failed");
                let mut record = StructuredRecord::new(raw_text);
                record.insert(DOCUMENT_TYPE_FIELD, "Error");
                record.insert(ERROR_FIELD, e.to_string());
                record
            }
        }
    }
}

/// User prompt listing each document under its own header.
pub fn build_prompt(results: &[ExtractionResult], field_hints: &[&str]) -> String {
    let hints = if field_hints.is_empty() {
        DEFAULT_FIELD_HINTS
    } else {
        field_hints
    };

    let mut prompt = String::from(
        "Extract all financial and personal information fields from the documents below and \
return them as JSON.\n\nFor pay slips and salary statements:\n\
- gross_wage_per_month from \"Gross Salary\", \"Basic Salary\" or \"Total Earnings\"\n\
- allowance_income from \"HRA\", \"Medical Allowance\" or \"Other Allowances\"\n\
- tax from \"Tax\", \"Income Tax\" or \"Tax Deduction\"\n\
- net_wage_per_month from \"Net Salary\", \"Take Home Pay\" or \"Net Amount\"\n\
- name_of_last_employer from any employer mentioned\n\
For addresses, use the most complete address as address.\n\n",
    );

    prompt.push_str("Fields of interest: ");
    prompt.push_str(&hints.join(", "));
    prompt.push_str("\n\n");

    for result in results {
        prompt.push_str(&format!("--- Document: {} ---\n", result.source_file));
        prompt.push_str(result.text.trim());
        prompt.push_str("\n\n");
    }

    prompt
}

/// Turn model output into a record, falling back to a parse-error record
/// when the output is not a JSON object.
pub fn parse_model_output(raw_text: &str, content: &str) -> StructuredRecord {
    let mut record = StructuredRecord::new(raw_text);

    match serde_json::from_str::<Value>(strip_code_fences(content)) {
        Ok(Value::Object(fields)) => {
            for (key, value) in &fields {
                record.insert(key.as_str(), stringify(value));
            }
        }
        Ok(other) => {
            record.insert(DOCUMENT_TYPE_FIELD, "Unknown");
            record.insert(
                ERROR_FIELD,
                format!(
                    "Failed to parse structured data: expected a JSON object, got {}",
                    json_kind(&other)
                ),
            );
        }
        Err(e) => {
            record.insert(DOCUMENT_TYPE_FIELD, "Unknown");
            record.insert(ERROR_FIELD, format!("Failed to parse structured data: {}", e));
        }
    }

    record
}

/// Models sometimes wrap JSON in markdown fences even in JSON mode.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"));
    inner.map(str::trim).unwrap_or(trimmed)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
