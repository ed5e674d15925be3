use thiserror::Error;

use coverdesk_core::domain::quote::Quote;
use coverdesk_db::repositories::quote::{quote_source_as_str, quote_status_as_str};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer was not valid utf-8: {0}")]
    Encoding(String),
}

/// Quote list as CSV. The writer quotes embedded commas, quotes, and
/// newlines, so free-text fields cannot corrupt the row structure.
pub fn quotes_to_csv(quotes: &[Quote]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "id",
        "reference",
        "status",
        "source",
        "customer_name",
        "customer_phone",
        "vehicle",
        "plan",
        "agent_name",
        "created_at",
    ])?;

    for quote in quotes {
        let vehicle = quote
            .vehicle
            .as_ref()
            .map(|vehicle| format!("{} {} {}", vehicle.year, vehicle.make, vehicle.model))
            .unwrap_or_default();
        let plan = quote
            .selected_plan
            .as_ref()
            .map(|plan| plan.plan_name.clone())
            .unwrap_or_default();

        writer.write_record([
            quote.id.0.as_str(),
            quote.quote_reference.as_str(),
            quote_status_as_str(quote.status),
            quote_source_as_str(quote.source),
            quote.customer.name.as_str(),
            quote.customer.phone.as_str(),
            vehicle.as_str(),
            plan.as_str(),
            quote.agent_name.as_str(),
            quote.created_at.to_rfc3339().as_str(),
        ])?;
    }

    let bytes =
        writer.into_inner().map_err(|error| ExportError::Encoding(error.to_string()))?;
    String::from_utf8(bytes).map_err(|error| ExportError::Encoding(error.to_string()))
}
