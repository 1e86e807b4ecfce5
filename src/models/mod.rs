//! Request and Response models for the settings API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{ClearCacheRequest, InstallDefaultsRequest, SetSettingRequest, TenantQuery};
pub use responses::{
    AllSettingsResponse, ClearCacheResponse, DeleteResponse, ErrorResponse, HealthResponse,
    InstallResponse, SettingResponse, StatsResponse,
};
