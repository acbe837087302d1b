//! Instance validation and the structured result model
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

pub mod context;
pub mod equality;
pub mod result;
pub mod validator;

pub use context::JsonContext;
pub use result::{ErrorDetails, ErrorKind, ResultError, ValidationResult};
pub use validator::Validator;
