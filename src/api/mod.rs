//! Thin JSON API client for the FuelNet backend.
//!
//! The backend owns every business state transition; this client only posts
//! requests and hands back the response. Authentication rides along as a
//! bearer token pulled from the auth store at call time.

pub mod client;
pub mod notifications;

pub use client::ApiClient;
