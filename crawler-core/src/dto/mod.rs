//! Data Transfer Objects for the tracking service API
//!
//! This module contains the node shapes returned by the GraphQL API. DTOs
//! mirror the wire format (camelCase, JSON-encoded strings) and convert into
//! domain types.

pub mod log;
pub mod run;

use serde::{Deserialize, Serialize};

/// Relay-style connection wrapping a paginated list of nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

impl<T> Connection<T> {
    /// Consumes the connection, yielding its nodes in delivered order
    pub fn into_nodes(self) -> impl Iterator<Item = T> {
        self.edges.into_iter().map(|edge| edge.node)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge<T> {
    pub node: T,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Cursor pagination state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}
