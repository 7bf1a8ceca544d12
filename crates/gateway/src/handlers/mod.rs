//! HTTP request handlers

pub mod badges;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod papers;
pub mod reviews;
