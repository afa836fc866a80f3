pub mod fields;
pub mod forms;
pub mod groups;
pub mod responses;
pub mod views;
