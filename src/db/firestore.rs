// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore backend.
//!
//! Documents cross this boundary as `serde_json::Value`; typing happens in
//! [`crate::db::Database`].

use crate::db::{Write, BATCH_SIZE};
use crate::error::AppError;
use firestore::errors::FirestoreError;
use serde_json::Value;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreBackend {
    client: firestore::FirestoreDb,
}

fn db_error(e: FirestoreError) -> AppError {
    AppError::Database(e.to_string())
}

impl FirestoreBackend {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn connect(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::connect_emulator(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn connect_emulator(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Get a document by ID.
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj::<Value>()
            .one(id)
            .await
            .map_err(db_error)
    }

    /// Create or replace a document.
    pub async fn set(&self, collection: &str, id: &str, doc: &Value) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Create a document, failing with `Conflict` if the ID is taken.
    pub async fn create(&self, collection: &str, id: &str, doc: &Value) -> Result<(), AppError> {
        let result: Result<(), FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => Err(AppError::Conflict(format!(
                "{}/{} already exists",
                collection, id
            ))),
            Err(e) => Err(db_error(e)),
        }
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// All documents of a collection.
    pub async fn list(&self, collection: &str) -> Result<Vec<Value>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collection)
            .obj::<Value>()
            .query()
            .await
            .map_err(db_error)
    }

    /// Documents whose string `field` equals `value`.
    pub async fn find_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collection)
            .filter(|q| q.for_all([q.field(field).eq(value)]))
            .obj::<Value>()
            .query()
            .await
            .map_err(db_error)
    }

    /// Apply all writes in one transaction; either all land or none do.
    pub async fn commit(&self, writes: &[Write]) -> Result<(), AppError> {
        if writes.len() > BATCH_SIZE {
            return Err(AppError::Database(format!(
                "Atomic commit of {} writes exceeds the {} write limit",
                writes.len(),
                BATCH_SIZE
            )));
        }

        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for write in writes {
            match write {
                Write::Set {
                    collection,
                    id,
                    doc,
                } => {
                    self.client
                        .fluent()
                        .update()
                        .in_col(collection)
                        .document_id(id)
                        .object(doc)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| {
                            AppError::Database(format!(
                                "Failed to add {}/{} to transaction: {}",
                                collection, id, e
                            ))
                        })?;
                }
                Write::Delete { collection, id } => {
                    self.client
                        .fluent()
                        .delete()
                        .from(collection)
                        .document_id(id)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| {
                            AppError::Database(format!(
                                "Failed to add deletion of {}/{} to transaction: {}",
                                collection, id, e
                            ))
                        })?;
                }
            }
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }
}
