use serde::{Deserialize, Serialize};

use super::customer::DocumentType;

/// District, province and department names stamped from the geography lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoStamp {
    pub district: String,
    pub province: String,
    pub department: String,
}

/// Sender, recipient or pickup party; every field is independently optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactBlock {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Geography code for the address, used to stamp `geo`
    pub district_code: Option<String>,
    pub geo: Option<GeoStamp>,
}

impl ContactBlock {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            phone: Some(phone.into()),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>, district_code: Option<String>) -> Self {
        self.address = Some(address.into());
        self.district_code = district_code;
        self
    }

    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.address.is_none()
            && self.district_code.is_none()
    }

    /// Whether the geography lookup still has something to stamp
    pub fn needs_geo_stamp(&self) -> bool {
        self.geo.is_none() && self.district_code.is_some()
    }
}

/// Invoicing party when it differs from the sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingBlock {
    pub document_type: DocumentType,
    pub document_number: String,
    pub legal_name: String,
    pub address: Option<String>,
}
