//! Central role-authorization table.
//!
//! Every role-gated operation is declared here once; services and the HTTP
//! access guard both consult this table, so the policy cannot drift
//! between call sites.

use super::error::Error;
use super::user::Role;

/// Role-gated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Register a new member.
    RegisterMember,
    /// Create a trip.
    CreateTrip,
    /// Mark a trip completed.
    CompleteTrip,
    /// Change an enrollment's status.
    SetEnrollmentStatus,
    /// Edit another member's role and disciplinary fields.
    EditMember,
}

impl Operation {
    /// Roles permitted to perform this operation.
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::RegisterMember => &[Role::Admin, Role::Secretary],
            Self::CreateTrip => &[Role::Admin],
            Self::CompleteTrip | Self::SetEnrollmentStatus => &[Role::Admin, Role::Guide],
            Self::EditMember => &[Role::Admin],
        }
    }

    /// Message returned when the caller's role is not permitted.
    pub const fn denial_message(self) -> &'static str {
        match self {
            Self::RegisterMember => "only admins and secretaries may register members",
            Self::CreateTrip => "only admins may create trips",
            Self::CompleteTrip => "only admins and guides may complete trips",
            Self::SetEnrollmentStatus => "only admins and guides may change enrollment status",
            Self::EditMember => "only admins may edit members",
        }
    }
}

/// Check the caller's role against the table.
///
/// # Examples
/// ```
/// use backend::domain::access::{require, Operation};
/// use backend::domain::Role;
///
/// assert!(require(Role::Admin, Operation::CreateTrip).is_ok());
/// assert!(require(Role::Member, Operation::CreateTrip).is_err());
/// ```
pub fn require(role: Role, operation: Operation) -> Result<(), Error> {
    if operation.allowed_roles().contains(&role) {
        Ok(())
    } else {
        Err(Error::forbidden(operation.denial_message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(Operation::RegisterMember, &[Role::Admin, Role::Secretary])]
    #[case(Operation::CreateTrip, &[Role::Admin])]
    #[case(Operation::CompleteTrip, &[Role::Admin, Role::Guide])]
    #[case(Operation::SetEnrollmentStatus, &[Role::Admin, Role::Guide])]
    #[case(Operation::EditMember, &[Role::Admin])]
    fn table_matches_the_declared_policy(
        #[case] operation: Operation,
        #[case] allowed: &[Role],
    ) {
        for role in Role::ALL {
            let expected = allowed.contains(&role);
            assert_eq!(
                require(role, operation).is_ok(),
                expected,
                "role {role} against {operation:?}"
            );
        }
    }

    #[rstest]
    fn denials_are_forbidden_errors() {
        let err = require(Role::Member, Operation::EditMember).expect_err("denied");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}
