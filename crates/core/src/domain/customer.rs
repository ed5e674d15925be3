use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Credit score floor for native installment eligibility. Customers below it
/// need a credit-control exception before a plan can be paid in installments.
pub const MIN_INSTALLMENT_CREDIT_SCORE: u16 = 650;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub cpr: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub credit_eligible: bool,
    pub credit_score: Option<u16>,
}

impl Customer {
    pub fn installment_eligible(&self) -> bool {
        self.credit_eligible
            && self.credit_score.is_some_and(|score| score >= MIN_INSTALLMENT_CREDIT_SCORE)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub plate: String,
    pub chassis: String,
    pub make: String,
    pub model: String,
    pub year: u16,
    pub insured_value: Decimal,
    pub is_financed: bool,
    pub has_modifications: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelCriteria {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub travellers: u8,
}
