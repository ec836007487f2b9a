pub mod auth;

pub use auth::{
    auth_middleware, customer_auth_middleware, manager_auth_middleware, Claims, CurrentUser, Role,
};
