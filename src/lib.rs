mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    #[cfg(test)]
    pub mod memory;
    pub mod pagination;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
}
mod constants;

pub mod config;
pub mod routes;
pub mod services;
pub mod views;

pub use authentication::*;
pub use constants::*;
pub use database::*;
