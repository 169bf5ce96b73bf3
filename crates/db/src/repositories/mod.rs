//! Repositories: zero-sized structs whose associated functions take a
//! `&PgPool` and run one statement each.

pub mod permission_repo;
pub mod role_repo;
pub mod session_repo;
pub mod user_repo;

pub use permission_repo::PermissionRepo;
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
