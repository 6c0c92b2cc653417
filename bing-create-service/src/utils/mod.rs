pub mod validation;

pub use validation::ValidatedPayload;
