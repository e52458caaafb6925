pub mod clock;
pub mod codec;
pub mod error;
pub mod keys;
pub mod repo;
pub mod service;
pub mod validation;
