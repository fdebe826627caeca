pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_admin_router, create_user_router};
pub use state::{AdminState, UserState};
