//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Short, filesystem-safe form of a UUID (simple hex, no hyphens)
pub fn to_simple(id: &Uuid) -> String {
    id.simple().to_string()
}
