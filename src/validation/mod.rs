//! Input validation module.
//!
//! Validators for bucket names and object keys.

mod object_key;

pub use object_key::{validate_bucket_name, validate_object_key};
