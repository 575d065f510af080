//! # Tally Shared
//!
//! Response and DTO types shared by the HTTP edge and its clients.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
