//! Draft template reference data.

use serde::{Deserialize, Serialize};

/// Document types drafts can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Nda,
    EmploymentContract,
    ServiceAgreement,
    PowerOfAttorney,
    CommercialLease,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nda => "nda",
            Self::EmploymentContract => "employment_contract",
            Self::ServiceAgreement => "service_agreement",
            Self::PowerOfAttorney => "power_of_attorney",
            Self::CommercialLease => "commercial_lease",
        }
    }

    /// Human-readable name for listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Nda => "Non-Disclosure Agreement",
            Self::EmploymentContract => "Employment Contract",
            Self::ServiceAgreement => "Service Agreement",
            Self::PowerOfAttorney => "Power of Attorney",
            Self::CommercialLease => "Commercial Lease",
        }
    }
}

/// An immutable draft template. Seed data owned by the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub template_type: TemplateType,
    pub title: String,
    pub description: String,
}
