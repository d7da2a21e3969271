//! `aegis-auth` — authentication/authorization core.
//!
//! This crate is intentionally decoupled from HTTP and persistence: callers
//! hand it tokens, credentials, and collaborator traits, and get back resolved
//! principals and authorization decisions.

pub mod claims;
pub mod error;
pub mod password;
pub mod predicate;
pub mod principal;
pub mod rbac;
pub mod resolver;
pub mod token;
pub mod tree;

pub use claims::{Claims, TokenKind};
pub use error::{AuthError, AuthResult};
pub use password::{hash_password, verify_password};
pub use predicate::Predicate;
pub use principal::Principal;
pub use rbac::{DataScope, Permission, PermissionKind, Role, UserRole};
pub use resolver::{Credential, GrantSource, PrincipalResolver, UserDirectory};
pub use token::{TokenCodec, TokenConfig};
pub use tree::{PermissionTreeNode, build_tree};
