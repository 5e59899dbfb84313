//! Clients for talking to a running prediction service.

pub mod client {
    pub use crate::client::*;
}
