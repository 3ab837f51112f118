pub mod audit;
pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use audit::audit_middleware;
pub use auth::{jwt_auth, AuthenticatedUser};
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
pub use security_headers::security_headers_middleware;
