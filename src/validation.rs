//! Input validation for the courier core
//!
//! National formats (mobile and landline phones, DNI, RUC with its check
//! digit, foreigner cards and passports) plus the contact and draft checks
//! that run before any lookup.

use crate::error::{CourierError, Result};
use crate::models::{BillingBlock, ContactBlock, DocumentType, ShipmentDraft};

/// RUC check-digit weights, applied to the first ten digits
const RUC_WEIGHTS: [u32; 10] = [5, 4, 3, 2, 7, 6, 5, 4, 3, 2];

/// RUC taxpayer-kind prefixes
const RUC_PREFIXES: [&str; 4] = ["10", "15", "17", "20"];

const MAX_URL_LENGTH: usize = 2048;

/// Canonical nine-digit national number, or `None` when the input is not a
/// phone number.
///
/// Spaces, dashes, dots and parentheses are ignored, as is a leading `+51`
/// or `51` country code. Mobiles start with 9, landlines with their 0 area
/// prefix.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    if let Some(rest) = digits.strip_prefix('+') {
        digits = rest.to_string();
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if digits.len() == 11 && digits.starts_with("51") {
        digits = digits[2..].to_string();
    }
    if digits.len() == 9 && (digits.starts_with('9') || digits.starts_with('0')) {
        Some(digits)
    } else {
        None
    }
}

/// Normalized phone or a validation error naming `field`
pub fn validate_phone(field: &str, raw: &str) -> Result<String> {
    normalize_phone(raw).ok_or_else(|| {
        CourierError::validation(field, format!("'{raw}' is not a valid national phone number"))
    })
}

pub fn is_valid_dni(number: &str) -> bool {
    number.len() == 8 && number.chars().all(|c| c.is_ascii_digit())
}

/// Eleven digits, a known taxpayer prefix and a matching mod-11 check digit
pub fn is_valid_ruc(number: &str) -> bool {
    if number.len() != 11 || !number.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if !RUC_PREFIXES.iter().any(|prefix| number.starts_with(prefix)) {
        return false;
    }

    let digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();
    let sum: u32 = digits[..10]
        .iter()
        .zip(RUC_WEIGHTS)
        .map(|(digit, weight)| digit * weight)
        .sum();
    let check = match 11 - sum % 11 {
        10 => 0,
        11 => 1,
        other => other,
    };
    digits[10] == check
}

/// Validate a document number against its declared type
pub fn validate_document(document_type: DocumentType, number: &str) -> Result<()> {
    let valid = match document_type {
        DocumentType::Dni => is_valid_dni(number),
        DocumentType::Ruc => is_valid_ruc(number),
        DocumentType::ForeignerCard | DocumentType::Passport => {
            (6..=12).contains(&number.len()) && number.chars().all(|c| c.is_ascii_alphanumeric())
        }
        DocumentType::Placeholder => number.starts_with("TMP-"),
    };
    if valid {
        Ok(())
    } else {
        Err(CourierError::validation(
            "document_number",
            format!("'{number}' is not a valid {document_type}"),
        ))
    }
}

/// `local@domain.tld`, nothing stricter
pub fn validate_email(field: &str, email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CourierError::validation(field, format!("'{email}' is not a valid email address")))
    }
}

/// Photo and signature references must be absolute http(s) URLs
pub fn validate_evidence_url(field: &str, url: &str) -> Result<()> {
    let has_scheme = url.starts_with("https://") || url.starts_with("http://");
    if !has_scheme || url.len() > MAX_URL_LENGTH || url.chars().any(char::is_whitespace) {
        return Err(CourierError::validation(
            field,
            "must be an absolute http(s) URL without whitespace",
        ));
    }
    Ok(())
}

/// Shape checks for one contact block; every field stays optional
pub fn validate_contact(field: &str, contact: &ContactBlock) -> Result<()> {
    if let Some(phone) = contact.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        validate_phone(&format!("{field}.phone"), phone)?;
    }
    if let Some(email) = contact.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(&format!("{field}.email"), email)?;
    }
    Ok(())
}

pub fn validate_billing(billing: &BillingBlock) -> Result<()> {
    if billing.legal_name.trim().is_empty() {
        return Err(CourierError::validation("billing.legal_name", "must not be empty"));
    }
    validate_document(billing.document_type, &billing.document_number)
        .map_err(|_| {
            CourierError::validation(
                "billing.document_number",
                format!("'{}' is not a valid {}", billing.document_number, billing.document_type),
            )
        })
}

/// Everything a shipment needs before a tracking code is spent on it
pub fn validate_shipment_draft(draft: &ShipmentDraft) -> Result<()> {
    draft.route.validate()?;
    draft.package.validate()?;

    validate_contact("sender", &draft.sender)?;
    validate_contact("recipient", &draft.recipient)?;
    if let Some(pickup) = &draft.pickup {
        validate_contact("pickup", pickup)?;
    }
    if !draft.sender.has_phone() && !draft.recipient.has_phone() {
        return Err(CourierError::validation(
            "contacts",
            "sender or recipient must carry a phone number",
        ));
    }
    if let Some(billing) = &draft.billing {
        validate_billing(billing)?;
    }
    if !draft.price.is_consistent() {
        return Err(CourierError::validation("price", "total must equal subtotal plus tax"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_normalization() {
        assert_eq!(normalize_phone("987 654 321").as_deref(), Some("987654321"));
        assert_eq!(normalize_phone("+51 987-654-321").as_deref(), Some("987654321"));
        assert_eq!(normalize_phone("51987654321").as_deref(), Some("987654321"));
        assert_eq!(normalize_phone("(01) 4567890").as_deref(), Some("014567890"));
        assert!(normalize_phone("12345").is_none());
        assert!(normalize_phone("887654321").is_none());
        assert!(normalize_phone("98765432a").is_none());
    }

    #[test]
    fn test_validate_phone_names_field() {
        let err = validate_phone("customer.phone", "123").unwrap_err();
        assert!(matches!(err, CourierError::Validation { ref field, .. } if field == "customer.phone"));
    }

    #[test]
    fn test_ruc_check_digit() {
        assert!(is_valid_ruc("20100000017"));
        assert!(is_valid_ruc("20601053421"));
        assert!(is_valid_ruc("10456789124"));
        assert!(!is_valid_ruc("20100000018"));
        assert!(!is_valid_ruc("30100000017"));
        assert!(!is_valid_ruc("2010000001"));
    }

    #[test]
    fn test_documents_by_type() {
        assert!(validate_document(DocumentType::Dni, "45678912").is_ok());
        assert!(validate_document(DocumentType::Dni, "4567891").is_err());
        assert!(validate_document(DocumentType::Passport, "AB123456").is_ok());
        assert!(validate_document(DocumentType::ForeignerCard, "12-34").is_err());
    }

    #[test]
    fn test_email_and_urls() {
        assert!(validate_email("email", "ana@example.pe").is_ok());
        assert!(validate_email("email", "ana@localhost").is_err());
        assert!(validate_email("email", "not an email").is_err());
        assert!(validate_evidence_url("photo_url", "https://files.example.pe/p/1.jpg").is_ok());
        assert!(validate_evidence_url("photo_url", "file:///tmp/1.jpg").is_err());
    }
}
