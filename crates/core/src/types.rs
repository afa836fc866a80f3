/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Registry-assigned field identifier, unique within its field type.
pub type FieldId = i64;

pub type FormId = DbId;
pub type SystemId = DbId;
pub type UserId = DbId;

/// Shared by every response that belongs to one multi-person submission.
pub type GroupId = i64;

/// Response records are keyed by client-generated UUIDs.
pub type RespId = uuid::Uuid;
