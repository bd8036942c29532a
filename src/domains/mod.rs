// Domain-Driven Organization - one module per service

pub mod comment;
pub mod user;
