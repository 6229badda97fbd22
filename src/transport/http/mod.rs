pub mod auth;
pub mod router;
pub mod types;
pub mod handlers {
    pub mod accounts;
    pub mod certificates;
    pub mod health;
    pub mod verify;
}

pub use router::{create_router, ApiDoc};
pub use types::AppState;
