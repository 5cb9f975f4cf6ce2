use uuid::Uuid;

/// Generate a database row id. UUID v7 keeps ids time-ordered, which keeps
/// insertion order stable for index locality and ordered scans.
pub fn db_id() -> Uuid {
    Uuid::now_v7()
}
