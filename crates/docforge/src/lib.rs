//! Template population service: derives applicant identifiers, drives a remote
//! layered-document editing job to completion, and exports the result as PDF.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
