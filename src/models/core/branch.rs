use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};

/// Branch record owned by the branch registry
/// Maps to `courier_branches` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Branch {
    pub branch_id: i64,
    pub name: String,
    /// City or town the branch serves; drives the tracking-code prefix
    pub locality: String,
    pub address: Option<String>,
    pub active: bool,
}

impl Branch {
    pub fn new(branch_id: i64, name: impl Into<String>, locality: impl Into<String>) -> Self {
        Self {
            branch_id,
            name: name.into(),
            locality: locality.into(),
            address: None,
            active: true,
        }
    }

    /// Location label written on shipment events
    pub fn label(&self) -> String {
        self.name.clone()
    }

    /// Find a branch by ID
    pub async fn find_by_id(
        conn: &mut PgConnection,
        branch_id: i64,
    ) -> Result<Option<Branch>, sqlx::Error> {
        sqlx::query_as::<_, Branch>(
            r#"
            SELECT branch_id, name, locality, address, active
            FROM courier_branches
            WHERE branch_id = $1
            "#,
        )
        .bind(branch_id)
        .fetch_optional(&mut *conn)
        .await
    }
}
