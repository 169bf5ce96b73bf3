//! Permission codes and the route-level marker types that declare them.
//!
//! Codes are dotted and lowercase. They must match the seed data in
//! `20260301000004_seed_permissions.sql`.

/// A permission a route requires. Implemented by zero-sized marker types so
/// the requirement is part of the handler signature.
pub trait Permission: Send + Sync + 'static {
    /// The permission code checked against the caller's role.
    const CODE: &'static str;
}

macro_rules! define_permissions {
    (
        $(
            $(#[$meta:meta])*
            $marker:ident => $const_name:ident = $code:literal
        ),+ $(,)?
    ) => {
        $(
            $(#[$meta])*
            pub const $const_name: &str = $code;

            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $marker;

            impl Permission for $marker {
                const CODE: &'static str = $const_name;
            }
        )+

        /// Every permission code known to the application, in seed order.
        pub const ALL: &[&str] = &[$($const_name),+];
    };
}

define_permissions! {
    /// List and read users.
    UserRead => USER_READ = "user.read",
    /// Create users on behalf of others.
    UserCreate => USER_CREATE = "user.create",
    /// Update user profiles and toggle activation.
    UserUpdate => USER_UPDATE = "user.update",
    /// Delete users.
    UserDelete => USER_DELETE = "user.delete",

    /// List and read roles.
    RoleRead => ROLE_READ = "role.read",
    /// Create roles.
    RoleCreate => ROLE_CREATE = "role.create",
    /// Update roles, their permission sets and activation.
    RoleUpdate => ROLE_UPDATE = "role.update",
    /// Delete roles.
    RoleDelete => ROLE_DELETE = "role.delete",

    /// List and read permissions.
    PermissionRead => PERMISSION_READ = "permission.read",
    /// Create permissions.
    PermissionCreate => PERMISSION_CREATE = "permission.create",
    /// Update permissions and toggle activation.
    PermissionUpdate => PERMISSION_UPDATE = "permission.update",
    /// Delete permissions.
    PermissionDelete => PERMISSION_DELETE = "permission.delete",
}
