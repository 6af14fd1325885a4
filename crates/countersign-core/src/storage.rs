use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use uuid::Uuid;

use crate::{
    contract::{Contract, ContractStatus, ContractView, Signature},
    Error, Result,
};

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS contracts (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    title TEXT NOT NULL,
    category TEXT,
    body TEXT NOT NULL,
    status TEXT NOT NULL,
    file_url TEXT,
    access_code TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contracts_owner ON contracts(owner);
CREATE INDEX IF NOT EXISTS idx_contracts_status ON contracts(status);
CREATE UNIQUE INDEX IF NOT EXISTS idx_contracts_code ON contracts(access_code);

CREATE TABLE IF NOT EXISTS signatures (
    id TEXT PRIMARY KEY,
    contract_id TEXT NOT NULL REFERENCES contracts(id) ON DELETE CASCADE,
    signer_name TEXT NOT NULL,
    signer_email TEXT,
    image_payload TEXT NOT NULL,
    status TEXT NOT NULL,
    signed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_signatures_contract ON signatures(contract_id);
"#;

type ContractRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    String,
    String,
    String,
);

type SignatureRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    String,
);

const CONTRACT_COLUMNS: &str =
    "id, owner, title, category, body, status, file_url, access_code, created_at, updated_at";

pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn open(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    // Contract operations

    pub async fn insert_contract(&self, contract: &Contract) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contracts (id, owner, title, category, body, status, file_url, access_code, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(contract.id.to_string())
        .bind(contract.owner.to_string())
        .bind(&contract.title)
        .bind(&contract.category)
        .bind(&contract.body)
        .bind(contract.status.as_str())
        .bind(&contract.file_url)
        .bind(&contract.access_code)
        .bind(contract.created_at.to_rfc3339())
        .bind(contract.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_contract(&self, id: Uuid) -> Result<Contract> {
        let row: ContractRow = sqlx::query_as(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::ContractNotFound(id))?;

        parse_contract_row(row)
    }

    /// Authenticated ownership gate: the contract must belong to `owner`.
    pub async fn get_owned_contract(&self, owner: Uuid, id: Uuid) -> Result<Contract> {
        let row: ContractRow = sqlx::query_as(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = ? AND owner = ?"
        ))
        .bind(id.to_string())
        .bind(owner.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::ContractNotFound(id))?;

        parse_contract_row(row)
    }

    /// Public gate: resolve a contract by its 8-character access code.
    pub async fn get_contract_by_access_code(&self, code: &str) -> Result<Contract> {
        let row: ContractRow = sqlx::query_as(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE access_code = ?"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::AccessCodeNotFound)?;

        parse_contract_row(row)
    }

    pub async fn list_contracts(
        &self,
        owner: Uuid,
        status: Option<ContractStatus>,
    ) -> Result<Vec<Contract>> {
        let rows: Vec<ContractRow> = match status {
            Some(s) => {
                sqlx::query_as(&format!(
                    "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE owner = ? AND status = ? ORDER BY created_at DESC"
                ))
                .bind(owner.to_string())
                .bind(s.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE owner = ? ORDER BY created_at DESC"
                ))
                .bind(owner.to_string())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(parse_contract_row).collect()
    }

    pub async fn update_contract(&self, contract: &Contract) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET title = ?, category = ?, body = ?, file_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&contract.title)
        .bind(&contract.category)
        .bind(&contract.body)
        .bind(&contract.file_url)
        .bind(Utc::now().to_rfc3339())
        .bind(contract.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::ContractNotFound(contract.id));
        }

        Ok(())
    }

    /// Move a contract to a new status. The lifecycle is forward-only;
    /// transitions that would roll back are rejected before any write.
    pub async fn update_status(&self, id: Uuid, status: ContractStatus) -> Result<Contract> {
        let current = self.get_contract(id).await?;
        if !current.status.can_transition_to(status) {
            return Err(Error::StatusTransition {
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }

        sqlx::query("UPDATE contracts SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        self.get_contract(id).await
    }

    pub async fn delete_contract(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::ContractNotFound(id));
        }

        Ok(())
    }

    // Signature operations

    pub async fn insert_signature(&self, signature: &Signature) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO signatures (id, contract_id, signer_name, signer_email, image_payload, status, signed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(signature.id.to_string())
        .bind(signature.contract_id.to_string())
        .bind(&signature.signer_name)
        .bind(&signature.signer_email)
        .bind(&signature.image_payload)
        .bind(signature.status.as_str())
        .bind(signature.signed_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_signatures(&self, contract_id: Uuid) -> Result<Vec<Signature>> {
        let rows: Vec<SignatureRow> = sqlx::query_as(
            r#"
            SELECT id, contract_id, signer_name, signer_email, image_payload, status, signed_at
            FROM signatures WHERE contract_id = ?
            ORDER BY signed_at, id
            "#,
        )
        .bind(contract_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_signature_row).collect()
    }

    /// Persist a signing action atomically: the (possibly placeholder-
    /// filled) body, the new signature row, and the status advance commit
    /// together or not at all. A failure mid-flow leaves the contract
    /// exactly as it was.
    pub async fn record_signing(
        &self,
        contract: &Contract,
        signature: &Signature,
        status: ContractStatus,
    ) -> Result<()> {
        let current = self.get_contract(contract.id).await?;
        if !current.status.can_transition_to(status) {
            return Err(Error::StatusTransition {
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE contracts SET body = ?, status = ?, updated_at = ? WHERE id = ?")
            .bind(&contract.body)
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(contract.id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO signatures (id, contract_id, signer_name, signer_email, image_payload, status, signed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(signature.id.to_string())
        .bind(signature.contract_id.to_string())
        .bind(&signature.signer_name)
        .bind(&signature.signer_email)
        .bind(&signature.image_payload)
        .bind(signature.status.as_str())
        .bind(signature.signed_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // View fetches: the single authoritative read used after every mutation

    pub async fn fetch_contract_view(&self, id: Uuid) -> Result<ContractView> {
        let contract = self.get_contract(id).await?;
        let signatures = self.list_signatures(id).await?;
        Ok(ContractView {
            contract,
            signatures,
        })
    }

    pub async fn fetch_owned_view(&self, owner: Uuid, id: Uuid) -> Result<ContractView> {
        let contract = self.get_owned_contract(owner, id).await?;
        let signatures = self.list_signatures(id).await?;
        Ok(ContractView {
            contract,
            signatures,
        })
    }

    pub async fn fetch_view_by_access_code(&self, code: &str) -> Result<ContractView> {
        let contract = self.get_contract_by_access_code(code).await?;
        let signatures = self.list_signatures(contract.id).await?;
        Ok(ContractView {
            contract,
            signatures,
        })
    }
}

fn parse_contract_row(row: ContractRow) -> Result<Contract> {
    let (id, owner, title, category, body, status, file_url, access_code, created_at, updated_at) =
        row;

    Ok(Contract {
        id: id.parse().map_err(|_| Error::ContractNotFound(Uuid::nil()))?,
        owner: owner
            .parse()
            .map_err(|_| Error::ContractNotFound(Uuid::nil()))?,
        title,
        category,
        body,
        status: status.parse()?,
        file_url,
        access_code,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_signature_row(row: SignatureRow) -> Result<Signature> {
    let (id, contract_id, signer_name, signer_email, image_payload, status, signed_at) = row;

    Ok(Signature {
        id: id.parse().map_err(|_| Error::ContractNotFound(Uuid::nil()))?,
        contract_id: contract_id
            .parse()
            .map_err(|_| Error::ContractNotFound(Uuid::nil()))?,
        signer_name,
        signer_email,
        image_payload,
        status: status.parse()?,
        signed_at: parse_timestamp(&signed_at)?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|_| Error::ContractNotFound(Uuid::nil()))?
        .with_timezone(&Utc))
}
