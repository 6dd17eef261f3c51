//! External service integrations.

pub mod klaviyo_client {
    pub use crate::klaviyo_client::*;
}
