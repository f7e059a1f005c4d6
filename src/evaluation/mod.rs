mod service;

pub use service::{EvaluationOutcome, EvaluationService, EvaluationSettings};
