//! # Tracking Codes
//!
//! Human-readable shipment codes of the form `PREFIX-YYYYMMDD-NNNNNN`:
//!
//! - `PREFIX`: first three letters of the origin branch's locality, accents
//!   folded and uppercased; localities with fewer than three letters use the
//!   configured fallback (`UNK`)
//! - `YYYYMMDD`: creation date
//! - `NNNNNN`: uniform random number from the operating system's CSPRNG
//!
//! The generator does not guarantee uniqueness. The shipments table carries a
//! unique constraint on the code and the creation path regenerates on a
//! collision through [`crate::database::with_unique_retry`].

use chrono::NaiveDate;
use rand::rngs::OsRng;
use rand::Rng;
use std::sync::Arc;

use crate::collaborators::BranchRegistry;
use crate::config::TrackingConfig;
use crate::error::{CourierError, Result};

const SERIAL_SPACE: u32 = 1_000_000;

#[derive(Clone)]
pub struct TrackingCodeGenerator {
    branches: Arc<dyn BranchRegistry>,
    fallback_prefix: String,
}

impl std::fmt::Debug for TrackingCodeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingCodeGenerator")
            .field("fallback_prefix", &self.fallback_prefix)
            .finish_non_exhaustive()
    }
}

impl TrackingCodeGenerator {
    pub fn new(branches: Arc<dyn BranchRegistry>, config: &TrackingConfig) -> Self {
        Self {
            branches,
            fallback_prefix: config.fallback_prefix.clone(),
        }
    }

    /// A fresh candidate code for a shipment leaving `origin_branch_id` on `date`
    pub async fn generate(&self, origin_branch_id: i64, date: NaiveDate) -> Result<String> {
        let prefix = self.prefix_for(origin_branch_id).await?;
        Ok(self.code_with_prefix(&prefix, date))
    }

    /// Prefix for a branch; resolve once and reuse across retries
    pub async fn prefix_for(&self, origin_branch_id: i64) -> Result<String> {
        let branch = self
            .branches
            .get_branch(origin_branch_id)
            .await?
            .ok_or(CourierError::BranchNotFound(origin_branch_id))?;
        Ok(locality_prefix(&branch.locality).unwrap_or_else(|| self.fallback_prefix.clone()))
    }

    /// Draw a new serial under a known prefix
    pub fn code_with_prefix(&self, prefix: &str, date: NaiveDate) -> String {
        let serial = OsRng.gen_range(0..SERIAL_SPACE);
        format!("{prefix}-{}-{serial:06}", date.format("%Y%m%d"))
    }
}

/// First three letters of a locality, accents folded, uppercased.
/// `None` when fewer than three ASCII letters remain.
pub fn locality_prefix(locality: &str) -> Option<String> {
    let letters: String = locality
        .chars()
        .map(fold_accent)
        .filter(char::is_ascii_alphabetic)
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    (letters.len() == 3).then_some(letters)
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
        'ñ' | 'Ñ' => 'n',
        other => other,
    }
}

/// Whether `code` has the `AAA-YYYYMMDD-NNNNNN` shape with a real date
pub fn is_well_formed(code: &str) -> bool {
    let mut parts = code.split('-');
    let (Some(prefix), Some(date), Some(serial), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    prefix.len() == 3
        && prefix.chars().all(|c| c.is_ascii_uppercase())
        && date.len() == 8
        && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
        && serial.len() == 6
        && serial.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryStore;
    use crate::models::Branch;

    #[test]
    fn test_locality_prefix() {
        assert_eq!(locality_prefix("Lima").as_deref(), Some("LIM"));
        assert_eq!(locality_prefix("arequipa").as_deref(), Some("ARE"));
        assert_eq!(locality_prefix("Ñaña").as_deref(), Some("NAN"));
        assert_eq!(locality_prefix("Ático").as_deref(), Some("ATI"));
        assert_eq!(locality_prefix("Km 21"), None);
        assert_eq!(locality_prefix("123"), None);
    }

    #[test]
    fn test_well_formed() {
        assert!(is_well_formed("LIM-20260115-004211"));
        assert!(!is_well_formed("LIM-20261315-004211"));
        assert!(!is_well_formed("LIMA-20260115-004211"));
        assert!(!is_well_formed("LIM-20260115-4211"));
        assert!(!is_well_formed("LIM-20260115-004211-1"));
    }

    #[tokio::test]
    async fn test_generate_uses_branch_locality_or_fallback() {
        let store = Arc::new(InMemoryStore::new());
        store.add_branch(Branch::new(1, "Sede Central", "Lima"));
        store.add_branch(Branch::new(2, "Km 21", "Km 21"));
        let generator = TrackingCodeGenerator::new(store, &TrackingConfig::default());
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();

        let code = generator.generate(1, date).await.unwrap();
        assert!(code.starts_with("LIM-20260115-"));
        assert!(is_well_formed(&code));

        let fallback = generator.generate(2, date).await.unwrap();
        assert!(fallback.starts_with("UNK-20260115-"));

        let err = generator.generate(99, date).await.unwrap_err();
        assert!(matches!(err, CourierError::BranchNotFound(99)));
    }
}
