//! Typed accessors for the API's resource collections.
//!
//! Each accessor is bound to one resource name and forwards to the generic
//! operations on [`EwhsClient`].

use crate::ewhs_api::client::EwhsClient;
use crate::ewhs_api::types::EwhsError;
use serde::Serialize;
use serde_json::Value;

pub const ORDERS: &str = "orders";
pub const SHIPMENTS: &str = "shipments";
pub const STOCK: &str = "stock";

/// Orders: full CRUD
#[derive(Debug, Clone, Copy)]
pub struct Orders<'a> {
    client: &'a EwhsClient,
}

impl<'a> Orders<'a> {
    pub(crate) fn new(client: &'a EwhsClient) -> Self {
        Self { client }
    }

    /// List orders, optionally filtered (e.g. `[("status", "created")]`)
    pub async fn list(self, params: &[(&str, &str)]) -> Result<Option<Value>, EwhsError> {
        self.client.filter(ORDERS, params).await
    }

    pub async fn get(self, id: &str) -> Result<Option<Value>, EwhsError> {
        self.client.get(ORDERS, id).await
    }

    pub async fn create<B: Serialize + ?Sized>(self, body: &B) -> Result<Option<Value>, EwhsError> {
        self.client.create(ORDERS, body).await
    }

    pub async fn update<B: Serialize + ?Sized>(
        self,
        id: &str,
        body: &B,
    ) -> Result<Option<Value>, EwhsError> {
        self.client.update(ORDERS, id, body).await
    }

    pub async fn delete(self, id: &str) -> Result<Option<Value>, EwhsError> {
        self.client.delete(ORDERS, id).await
    }
}

/// Shipments: read and create
#[derive(Debug, Clone, Copy)]
pub struct Shipments<'a> {
    client: &'a EwhsClient,
}

impl<'a> Shipments<'a> {
    pub(crate) fn new(client: &'a EwhsClient) -> Self {
        Self { client }
    }

    pub async fn list(self, params: &[(&str, &str)]) -> Result<Option<Value>, EwhsError> {
        self.client.filter(SHIPMENTS, params).await
    }

    pub async fn get(self, id: &str) -> Result<Option<Value>, EwhsError> {
        self.client.get(SHIPMENTS, id).await
    }

    pub async fn create<B: Serialize + ?Sized>(self, body: &B) -> Result<Option<Value>, EwhsError> {
        self.client.create(SHIPMENTS, body).await
    }
}

/// Stock levels: read only
#[derive(Debug, Clone, Copy)]
pub struct Stock<'a> {
    client: &'a EwhsClient,
}

impl<'a> Stock<'a> {
    pub(crate) fn new(client: &'a EwhsClient) -> Self {
        Self { client }
    }

    pub async fn list(self, params: &[(&str, &str)]) -> Result<Option<Value>, EwhsError> {
        self.client.filter(STOCK, params).await
    }

    pub async fn get(self, id: &str) -> Result<Option<Value>, EwhsError> {
        self.client.get(STOCK, id).await
    }
}
