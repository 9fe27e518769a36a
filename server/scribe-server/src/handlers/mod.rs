pub mod analytics;
pub mod auth;
pub mod health;
pub mod notes;
pub mod patients;
pub mod portal;
pub mod transcripts;
