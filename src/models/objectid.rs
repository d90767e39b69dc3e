use uuid::Uuid;

/// Local identifier for objects we create, e.g. `msg_1f0c...`.
pub fn create_object_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
