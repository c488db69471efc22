//! API middleware

mod origin;

pub use origin::check_origin;
