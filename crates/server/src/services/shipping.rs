//! AI shipping company suggestions.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use rabit_core::FieldErrors;

use crate::claude::{ClaudeClient, ClaudeError, Tool};

const TOOL_NAME: &str = "suggest_shipping_companies";

/// Suggestion form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShippingRequest {
    /// Products, quantities and destination of the order.
    #[validate(length(min = 10, message = "Order details must be at least 10 characters long."))]
    pub order_details: String,
    /// Shipping times, costs and reliability seen for carriers so far.
    #[validate(length(
        min = 10,
        message = "Performance data must be at least 10 characters long."
    ))]
    pub past_performance_data: String,
}

/// The model's recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSuggestion {
    pub suggested_companies: Vec<String>,
    pub reasoning: String,
}

#[derive(Debug, Error)]
pub enum ShippingError {
    #[error("invalid input: {0}")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Ai(#[from] ClaudeError),
}

impl ShippingRequest {
    fn prompt(&self) -> String {
        format!(
            "You are an expert logistics consultant. Given the following order details and past \
             performance data, suggest the best shipping companies for this order.\n\n\
             Order Details: {}\n\
             Past Performance Data: {}\n\n\
             Consider factors such as shipping time, cost, reliability, and any other relevant \
             information.\n\n\
             Output the list of suggested companies and reasoning.",
            self.order_details, self.past_performance_data
        )
    }
}

fn suggestion_tool() -> Tool {
    Tool {
        name: TOOL_NAME.to_string(),
        description: "Record the suggested shipping companies for the order.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "suggested_companies": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "A list of suggested shipping companies."
                },
                "reasoning": {
                    "type": "string",
                    "description": "The reasoning behind the shipping company suggestions."
                }
            },
            "required": ["suggested_companies", "reasoning"]
        }),
    }
}

/// Validate the form and ask the model for a suggestion.
///
/// Nothing is sent when the form is invalid.
///
/// # Errors
///
/// Returns `ShippingError::Invalid` with per-field messages, or
/// `ShippingError::Ai` for any model, transport or parse failure.
#[tracing::instrument(skip_all)]
pub async fn suggest_shipping(
    claude: &ClaudeClient,
    request: &ShippingRequest,
) -> Result<ShippingSuggestion, ShippingError> {
    request
        .validate()
        .map_err(|e| ShippingError::Invalid(e.into()))?;

    let suggestion: ShippingSuggestion = claude
        .call_tool(request.prompt(), suggestion_tool())
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "shipping suggestion failed"))?;

    tracing::info!(
        companies = suggestion.suggested_companies.len(),
        "shipping suggestion received"
    );
    Ok(suggestion)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(details: &str, performance: &str) -> ShippingRequest {
        ShippingRequest {
            order_details: details.to_string(),
            past_performance_data: performance.to_string(),
        }
    }

    #[test]
    fn test_short_fields_fail_validation() {
        let errors: FieldErrors = request("2 shirts", "ok")
            .validate()
            .unwrap_err()
            .into();
        assert_eq!(
            errors.get("order_details").unwrap(),
            ["Order details must be at least 10 characters long."]
        );
        assert_eq!(
            errors.get("past_performance_data").unwrap(),
            ["Performance data must be at least 10 characters long."]
        );
    }

    #[test]
    fn test_prompt_carries_both_fields() {
        let prompt = request("3 lamps to Cairo", "Aramex: 2 days, 99% on time").prompt();
        assert!(prompt.contains("Order Details: 3 lamps to Cairo"));
        assert!(prompt.contains("Past Performance Data: Aramex: 2 days, 99% on time"));
    }

    #[test]
    fn test_tool_schema_requires_output_fields() {
        let tool = suggestion_tool();
        assert_eq!(tool.name, TOOL_NAME);
        assert_eq!(
            tool.input_schema["required"],
            serde_json::json!(["suggested_companies", "reasoning"])
        );
    }
}
