//! The draft template catalog.
//!
//! Templates are immutable seed data owned by the application; the catalog
//! only looks them up. Generating a draft from a template creates a pending
//! workflow item, since every draft needs legal team review before
//! finalization.

use thiserror::Error;

use crate::models::{Template, TemplateType};

#[derive(Debug, Error)]
#[error("Unknown template: {0}")]
pub struct TemplateNotFound(pub String);

/// Read-only template lookup.
pub struct TemplateCatalog {
    templates: Vec<Template>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateCatalog {
    /// Catalog with the firm's approved templates.
    pub fn new() -> Self {
        let seed = [
            (
                TemplateType::Nda,
                "Non-Disclosure Agreement",
                "Standard mutual NDA.",
            ),
            (
                TemplateType::EmploymentContract,
                "Employment Contract",
                "Omani Labour Law compliant contract.",
            ),
            (
                TemplateType::ServiceAgreement,
                "Service Agreement",
                "General B2B service provision.",
            ),
            (
                TemplateType::PowerOfAttorney,
                "Power of Attorney",
                "Standard legal representation.",
            ),
            (
                TemplateType::CommercialLease,
                "Commercial Lease",
                "Property rental agreement.",
            ),
        ];

        let templates = seed
            .into_iter()
            .map(|(template_type, title, description)| Template {
                id: template_type.as_str().to_string(),
                template_type,
                title: title.to_string(),
                description: description.to_string(),
            })
            .collect();
        Self { templates }
    }

    /// All templates, in catalog order.
    pub fn list(&self) -> &[Template] {
        &self.templates
    }

    /// Look up one template by id.
    pub fn get(&self, id: &str) -> Result<&Template, TemplateNotFound> {
        self.templates
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| TemplateNotFound(id.to_string()))
    }
}
