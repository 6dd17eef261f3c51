// Domain-layer modules and shared errors/models
pub mod validation {
    pub use crate::validation::*;
}

pub mod normalizer {
    pub use crate::normalizer::*;
}

pub mod idempotency {
    pub use crate::idempotency::*;
}

pub mod errors {
    pub use crate::errors::*;
}

pub mod models {
    pub use crate::webhook_models::*;
}
