pub mod auth;
pub mod cart;
pub mod error;
pub mod health;
pub mod metrics;
pub mod middleware;

pub use auth::*;
pub use cart::{create_cart_router, CartHandlerState};
pub use error::*;
pub use health::*;
pub use metrics::*;
pub use middleware::*;
