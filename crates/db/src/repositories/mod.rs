pub mod field_repo;
pub mod form_repo;
pub mod response_repo;

pub use field_repo::FieldRepo;
pub use form_repo::FormRepo;
pub use response_repo::ResponseRepo;
