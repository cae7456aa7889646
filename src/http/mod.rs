//! HTTP protocol layer module
//!
//! Response builders and the cross-origin policy, decoupled from the route handlers.

pub mod cors;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_404_response, build_405_response, build_413_response, build_500_response,
    build_detail_response, build_redirect_response_with_code, json_response,
};
