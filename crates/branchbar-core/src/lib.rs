pub mod domain;
pub mod error;
pub mod refname;
pub mod services;
