//! Authorization predicates and their combinators.
//!
//! A predicate is a first-class value describing a requirement on the caller;
//! route tables declare them up front and evaluate them against the resolved
//! principal. Composition is explicit via [`Predicate::AnyOf`] /
//! [`Predicate::AllOf`] rather than nested closures.

use std::collections::HashSet;

use crate::error::{AuthError, AuthResult};
use crate::principal::Principal;
use crate::resolver::GrantSource;

/// A declarative authorization requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Requires membership in the effective permission-code set.
    HasPermissions {
        codes: Vec<String>,
        require_all: bool,
    },

    /// Requires membership in the effective role-code set.
    HasRoles {
        codes: Vec<String>,
        require_all: bool,
    },

    /// Requires an active account.
    IsActiveUser,

    /// Requires the superadmin flag.
    IsSuperuser,

    /// Succeeds when at least one child succeeds. On total failure, every
    /// child's reason is aggregated into one message.
    AnyOf(Vec<Predicate>),

    /// Succeeds when every child succeeds; fails fast with the first child's
    /// own reason.
    AllOf(Vec<Predicate>),
}

impl Predicate {
    pub fn permissions<I, S>(codes: I, require_all: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::HasPermissions {
            codes: codes.into_iter().map(Into::into).collect(),
            require_all,
        }
    }

    pub fn permission(code: impl Into<String>) -> Self {
        let code: String = code.into();
        Self::permissions([code], true)
    }

    pub fn roles<I, S>(codes: I, require_all: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::HasRoles {
            codes: codes.into_iter().map(Into::into).collect(),
            require_all,
        }
    }

    pub fn role(code: impl Into<String>) -> Self {
        let code: String = code.into();
        Self::roles([code], true)
    }

    pub fn active_user() -> Self {
        Self::IsActiveUser
    }

    pub fn superuser() -> Self {
        Self::IsSuperuser
    }

    pub fn any_of(children: Vec<Predicate>) -> Self {
        Self::AnyOf(children)
    }

    pub fn all_of(children: Vec<Predicate>) -> Self {
        Self::AllOf(children)
    }

    /// Evaluate against a resolved principal.
    ///
    /// The superadmin bypass is the first step of every variant: a superadmin
    /// satisfies any predicate (and any combinator) before grants are even
    /// looked up, with empty role/permission sets included.
    pub fn evaluate(&self, principal: &Principal, grants: &dyn GrantSource) -> AuthResult<()> {
        if principal.is_superadmin {
            return Ok(());
        }

        match self {
            Predicate::HasPermissions { codes, require_all } => {
                let granted = grants.permission_codes(principal.id);
                if satisfied(codes, *require_all, &granted) {
                    Ok(())
                } else {
                    Err(AuthError::PermissionDenied(requirement_message(
                        "permissions",
                        codes,
                        *require_all,
                    )))
                }
            }

            Predicate::HasRoles { codes, require_all } => {
                let granted = grants.role_codes(principal.id);
                if satisfied(codes, *require_all, &granted) {
                    Ok(())
                } else {
                    Err(AuthError::RoleDenied(requirement_message(
                        "roles",
                        codes,
                        *require_all,
                    )))
                }
            }

            Predicate::IsActiveUser => {
                if principal.is_active {
                    Ok(())
                } else {
                    Err(AuthError::AccountDisabled)
                }
            }

            Predicate::IsSuperuser => Err(AuthError::PermissionDenied(
                "superadmin privileges required".to_string(),
            )),

            Predicate::AnyOf(children) => {
                let mut reasons = Vec::with_capacity(children.len());
                for child in children {
                    match child.evaluate(principal, grants) {
                        Ok(()) => return Ok(()),
                        Err(e) => reasons.push(e.reason()),
                    }
                }
                Err(AuthError::PermissionDenied(format!(
                    "must satisfy one of the following: {}",
                    reasons.join(" OR ")
                )))
            }

            Predicate::AllOf(children) => {
                for child in children {
                    child.evaluate(principal, grants)?;
                }
                Ok(())
            }
        }
    }
}

fn satisfied(required: &[String], require_all: bool, granted: &HashSet<String>) -> bool {
    if require_all {
        required.iter().all(|code| granted.contains(code))
    } else {
        required.iter().any(|code| granted.contains(code))
    }
}

fn requirement_message(what: &str, codes: &[String], require_all: bool) -> String {
    if require_all {
        format!(
            "requires all of the following {what}: {}",
            codes.join(" AND ")
        )
    } else {
        format!(
            "requires any of the following {what}: {}",
            codes.join(" OR ")
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::UserId;

    struct FixedGrants {
        roles: HashSet<String>,
        permissions: HashSet<String>,
    }

    impl FixedGrants {
        fn new(roles: &[&str], permissions: &[&str]) -> Self {
            Self {
                roles: roles.iter().map(|s| s.to_string()).collect(),
                permissions: permissions.iter().map(|s| s.to_string()).collect(),
            }
        }

        fn empty() -> Self {
            Self::new(&[], &[])
        }
    }

    impl GrantSource for FixedGrants {
        fn role_codes(&self, _user: UserId) -> HashSet<String> {
            self.roles.clone()
        }

        fn permission_codes(&self, _user: UserId) -> HashSet<String> {
            self.permissions.clone()
        }
    }

    fn user() -> Principal {
        Principal::new(UserId::new(), "alice")
    }

    #[test]
    fn require_all_permissions_needs_superset() {
        let pred = Predicate::permissions(["a", "b"], true);

        let enough = FixedGrants::new(&[], &["a", "b", "c"]);
        assert!(pred.evaluate(&user(), &enough).is_ok());

        let partial = FixedGrants::new(&[], &["a"]);
        let err = pred.evaluate(&user(), &partial).unwrap_err();
        let reason = err.reason();
        assert!(reason.contains("a") && reason.contains("b"));
        assert!(reason.contains(" AND "));
        assert!(matches!(err, AuthError::PermissionDenied(_)));
    }

    #[test]
    fn require_any_permission_needs_one() {
        let pred = Predicate::permissions(["a", "b"], false);

        let one = FixedGrants::new(&[], &["b"]);
        assert!(pred.evaluate(&user(), &one).is_ok());

        let none = FixedGrants::empty();
        let reason = pred.evaluate(&user(), &none).unwrap_err().reason();
        assert!(reason.contains(" OR "));
    }

    #[test]
    fn role_denial_is_a_role_error() {
        let pred = Predicate::roles(["admin", "supervisor"], false);
        let err = pred.evaluate(&user(), &FixedGrants::empty()).unwrap_err();

        assert!(matches!(err, AuthError::RoleDenied(_)));
        let reason = err.reason();
        assert!(reason.contains("admin") && reason.contains("supervisor"));
    }

    #[test]
    fn any_of_succeeds_on_second_child() {
        let pred = Predicate::any_of(vec![
            Predicate::role("admin"),
            Predicate::permission("user.manage"),
        ]);

        let grants = FixedGrants::new(&[], &["user.manage"]);
        assert!(pred.evaluate(&user(), &grants).is_ok());
    }

    #[test]
    fn any_of_aggregates_every_reason() {
        let pred = Predicate::any_of(vec![
            Predicate::role("admin"),
            Predicate::permission("user.manage"),
        ]);

        let reason = pred
            .evaluate(&user(), &FixedGrants::empty())
            .unwrap_err()
            .reason();

        assert!(reason.contains("admin"));
        assert!(reason.contains("user.manage"));
        assert!(reason.contains(" OR "));
    }

    #[test]
    fn all_of_fails_fast_with_the_failing_childs_reason() {
        let pred = Predicate::all_of(vec![
            Predicate::permission("user.manage"), // granted
            Predicate::role("admin"),             // missing
        ]);

        let grants = FixedGrants::new(&[], &["user.manage"]);
        let err = pred.evaluate(&user(), &grants).unwrap_err();

        assert_eq!(err, Predicate::role("admin").evaluate(&user(), &grants).unwrap_err());
        assert!(!err.reason().contains("user.manage"));
    }

    #[test]
    fn all_of_succeeds_when_every_child_does() {
        let pred = Predicate::all_of(vec![
            Predicate::permission("user.manage"),
            Predicate::roles(["admin", "supervisor"], false),
        ]);

        let grants = FixedGrants::new(&["supervisor"], &["user.manage"]);
        assert!(pred.evaluate(&user(), &grants).is_ok());
    }

    #[test]
    fn inactive_user_fails_active_check() {
        let mut principal = user();
        principal.is_active = false;

        assert_eq!(
            Predicate::active_user().evaluate(&principal, &FixedGrants::empty()),
            Err(AuthError::AccountDisabled)
        );
    }

    #[test]
    fn non_superuser_fails_superuser_check() {
        let err = Predicate::superuser()
            .evaluate(&user(), &FixedGrants::empty())
            .unwrap_err();
        assert!(matches!(err, AuthError::PermissionDenied(_)));
    }

    #[test]
    fn superadmin_passes_everything_with_empty_grants() {
        let mut principal = Principal::superadmin(UserId::new(), "root");
        principal.is_active = false; // bypass even beats the active check

        let grants = FixedGrants::empty();
        let predicates = vec![
            Predicate::permissions(["a", "b"], true),
            Predicate::roles(["admin"], true),
            Predicate::active_user(),
            Predicate::superuser(),
            Predicate::any_of(vec![Predicate::role("x"), Predicate::permission("y")]),
            Predicate::all_of(vec![Predicate::role("x"), Predicate::permission("y")]),
        ];

        for pred in predicates {
            assert!(pred.evaluate(&principal, &grants).is_ok());
        }
    }

    #[test]
    fn evaluation_order_is_declaration_order() {
        let pred = Predicate::any_of(vec![
            Predicate::role("first"),
            Predicate::role("second"),
            Predicate::role("third"),
        ]);

        let reason = pred
            .evaluate(&user(), &FixedGrants::empty())
            .unwrap_err()
            .reason();

        let first = reason.find("first").unwrap();
        let second = reason.find("second").unwrap();
        let third = reason.find("third").unwrap();
        assert!(first < second && second < third);
    }
}
