pub mod corpus;
pub mod decision;
pub mod signals;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller identity resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: String,
}
