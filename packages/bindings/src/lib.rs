use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Serialize;
use serde_json::json;

use net_pay_core::context::ContextOptions;
use net_pay_core::rules::repository;
use net_pay_core::{
    CountryRuleDocument, NetPayError, NetPayResult, RuleRepository, SalaryInput, SalaryRequest,
};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Engine failures become `{"error": {category, details, message}}` so the
/// caller can translate them; only output serialization throws.
fn respond<T: Serialize>(result: NetPayResult<T>) -> NapiResult<String> {
    let value = match result {
        Ok(output) => serde_json::to_value(output).map_err(to_napi_error)?,
        Err(e) => json!({ "error": e.to_payload() }),
    };
    serde_json::to_string(&value).map_err(to_napi_error)
}

fn parse_document(country_code: &str, document_json: &str) -> NetPayResult<CountryRuleDocument> {
    Ok(RuleRepository::parse_document(
        country_code,
        document_json.as_bytes(),
    )?)
}

fn context_from_json(
    document_json: &str,
    options_json: &str,
) -> NetPayResult<net_pay_core::TaxContext> {
    let options: ContextOptions = serde_json::from_str(options_json)?;
    let document = parse_document(&options.country_code, document_json)?;
    Ok(net_pay_core::build_tax_context(&document, &options)?)
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[napi]
pub fn build_tax_context(document_json: String, options_json: String) -> NapiResult<String> {
    respond(context_from_json(&document_json, &options_json))
}

// ---------------------------------------------------------------------------
// Salary
// ---------------------------------------------------------------------------

/// Request JSON carries the serialized context plus the salary input.
#[napi]
pub fn compute_salary(request_json: String) -> NapiResult<String> {
    let result = serde_json::from_str::<SalaryRequest>(&request_json)
        .map_err(NetPayError::from)
        .and_then(|request| Ok(net_pay_core::compute_salary_request(&request)?));
    respond(result)
}

#[napi]
pub fn compute_salary_with_document(
    document_json: String,
    options_json: String,
    input_json: String,
) -> NapiResult<String> {
    let result = context_from_json(&document_json, &options_json).and_then(|ctx| {
        let input: SalaryInput = serde_json::from_str(&input_json)?;
        Ok(net_pay_core::compute_salary(&ctx, &input)?)
    });
    respond(result)
}

// ---------------------------------------------------------------------------
// Rule documents
// ---------------------------------------------------------------------------

#[napi]
pub fn lint_document(document_json: String) -> NapiResult<String> {
    let result = parse_document("", &document_json)
        .and_then(|document| Ok(net_pay_core::lint_document(&document)?));
    respond(result)
}

#[napi]
pub fn supported_countries() -> NapiResult<String> {
    let countries: Vec<_> = repository::supported_countries()
        .into_iter()
        .map(|code| {
            json!({
                "countryCode": code,
                "file": repository::rule_file_for(code),
            })
        })
        .collect();
    serde_json::to_string(&countries).map_err(to_napi_error)
}
