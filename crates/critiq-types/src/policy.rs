//! Access control decisions as a single pure function over a closed rule
//! table, instead of per-endpoint role checks.

use crate::claim::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Title,
    Category,
    Genre,
    Review,
    Comment,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn is_read(&self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }
}

/// Authenticated identity, as derived from a validated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
    pub superuser: bool,
}

impl Principal {
    pub fn new(id: i64, role: Role, superuser: bool) -> Self {
        Self {
            id,
            role,
            superuser,
        }
    }

    /// Superusers count as admins no matter what the role field says.
    pub fn is_admin(&self) -> bool {
        self.superuser || self.role == Role::Admin
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// No principal on an action which requires one.
    Unauthorized,
    /// Principal present, but role or ownership is insufficient.
    Forbidden,
}

impl Access {
    pub fn is_granted(&self) -> bool {
        matches!(self, Access::Granted)
    }
}

/// Decide whether `principal` may perform `action` on a resource of the
/// given kind. `owner` is the id of the authoring user, for resources
/// which have one (reviews and comments).
pub fn allowed(
    principal: Option<&Principal>,
    resource: ResourceKind,
    action: Action,
    owner: Option<i64>,
) -> Access {
    use ResourceKind::*;

    match resource {
        Title | Category | Genre => {
            if action.is_read() {
                return Access::Granted;
            }
            admin_only(principal)
        }
        Review | Comment => {
            if action.is_read() {
                return Access::Granted;
            }
            let Some(principal) = principal else {
                return Access::Unauthorized;
            };
            match action {
                Action::Create => Access::Granted,
                Action::Update | Action::Delete => {
                    let is_owner = owner.is_some_and(|id| id == principal.id);
                    if is_owner || principal.is_moderator() || principal.is_admin() {
                        Access::Granted
                    } else {
                        Access::Forbidden
                    }
                }
                Action::List | Action::Retrieve => unreachable!(),
            }
        }
        // The "me" endpoint is out of this table - any authenticated
        // principal may read and patch own record.
        User => admin_only(principal),
    }
}

fn admin_only(principal: Option<&Principal>) -> Access {
    match principal {
        None => Access::Unauthorized,
        Some(p) if p.is_admin() => Access::Granted,
        Some(_) => Access::Forbidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ACTIONS: [Action; 5] = [
        Action::List,
        Action::Retrieve,
        Action::Create,
        Action::Update,
        Action::Delete,
    ];

    const VALUE_RESOURCES: [ResourceKind; 3] = [
        ResourceKind::Title,
        ResourceKind::Category,
        ResourceKind::Genre,
    ];

    const OWNED_RESOURCES: [ResourceKind; 2] = [ResourceKind::Review, ResourceKind::Comment];

    fn user() -> Principal {
        Principal::new(1, Role::User, false)
    }

    fn moderator() -> Principal {
        Principal::new(2, Role::Moderator, false)
    }

    fn admin() -> Principal {
        Principal::new(3, Role::Admin, false)
    }

    fn superuser() -> Principal {
        // role deliberately plain - the flag alone must win
        Principal::new(4, Role::User, true)
    }

    #[test]
    fn test_everyone_reads_everything_but_users() {
        for resource in VALUE_RESOURCES.into_iter().chain(OWNED_RESOURCES) {
            for action in [Action::List, Action::Retrieve] {
                assert_eq!(allowed(None, resource, action, None), Access::Granted);
                assert_eq!(
                    allowed(Some(&user()), resource, action, None),
                    Access::Granted
                );
            }
        }
    }

    #[test]
    fn test_value_resources_writable_by_admin_only() {
        for resource in VALUE_RESOURCES {
            for action in [Action::Create, Action::Update, Action::Delete] {
                assert_eq!(allowed(None, resource, action, None), Access::Unauthorized);
                assert_eq!(
                    allowed(Some(&user()), resource, action, None),
                    Access::Forbidden
                );
                assert_eq!(
                    allowed(Some(&moderator()), resource, action, None),
                    Access::Forbidden
                );
                assert_eq!(
                    allowed(Some(&admin()), resource, action, None),
                    Access::Granted
                );
                assert_eq!(
                    allowed(Some(&superuser()), resource, action, None),
                    Access::Granted
                );
            }
        }
    }

    #[test]
    fn test_any_authenticated_user_creates_reviews_and_comments() {
        for resource in OWNED_RESOURCES {
            assert_eq!(
                allowed(None, resource, Action::Create, None),
                Access::Unauthorized
            );
            assert_eq!(
                allowed(Some(&user()), resource, Action::Create, None),
                Access::Granted
            );
        }
    }

    #[test]
    fn test_owned_resources_editable_by_owner_moderator_admin() {
        let owner = user();
        let other = Principal::new(99, Role::User, false);
        for resource in OWNED_RESOURCES {
            for action in [Action::Update, Action::Delete] {
                assert_eq!(
                    allowed(None, resource, action, Some(owner.id)),
                    Access::Unauthorized
                );
                assert_eq!(
                    allowed(Some(&owner), resource, action, Some(owner.id)),
                    Access::Granted
                );
                assert_eq!(
                    allowed(Some(&other), resource, action, Some(owner.id)),
                    Access::Forbidden
                );
                assert_eq!(
                    allowed(Some(&moderator()), resource, action, Some(owner.id)),
                    Access::Granted
                );
                assert_eq!(
                    allowed(Some(&admin()), resource, action, Some(owner.id)),
                    Access::Granted
                );
                assert_eq!(
                    allowed(Some(&superuser()), resource, action, Some(owner.id)),
                    Access::Granted
                );
            }
        }
    }

    #[test]
    fn test_user_records_are_admin_territory() {
        for action in ALL_ACTIONS {
            assert_eq!(
                allowed(None, ResourceKind::User, action, None),
                Access::Unauthorized
            );
            assert_eq!(
                allowed(Some(&user()), ResourceKind::User, action, None),
                Access::Forbidden
            );
            assert_eq!(
                allowed(Some(&moderator()), ResourceKind::User, action, None),
                Access::Forbidden
            );
            assert_eq!(
                allowed(Some(&admin()), ResourceKind::User, action, None),
                Access::Granted
            );
            assert_eq!(
                allowed(Some(&superuser()), ResourceKind::User, action, None),
                Access::Granted
            );
        }
    }
}
