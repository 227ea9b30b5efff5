pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod fingerprint;
pub mod normalization;
pub mod photo;
pub mod registration;
pub mod routes;
pub mod store;
pub mod submission;
pub mod voter;
