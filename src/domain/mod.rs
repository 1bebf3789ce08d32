// Portfolio chart domain
pub mod portfolio;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
