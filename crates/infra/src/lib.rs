//! `aegis-infra` — storage and service layer backing the HTTP API.
//!
//! In-memory stores guard their state behind a single lock each and implement
//! the `aegis-auth` collaborator traits, so the auth core never sees this
//! crate directly.

pub mod paging;
pub mod rbac;
pub mod users;

pub use paging::PageRequest;
pub use rbac::{NewPermission, NewRole, PermissionPatch, RbacStore, RolePatch};
pub use users::{NewUser, UserPatch, UserStore, UserView};
