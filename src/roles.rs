/// Account roles stored in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Staff,
    Lecturer,
    Blocked,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Staff, Role::Lecturer, Role::Blocked];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Lecturer => "lecturer",
            Role::Blocked => "blocked",
        }
    }

    pub fn label_ru(&self) -> &'static str {
        match self {
            Role::Admin => "Администратор",
            Role::Staff => "Сотрудник",
            Role::Lecturer => "Преподаватель",
            Role::Blocked => "Заблокирован",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            "lecturer" => Some(Role::Lecturer),
            "blocked" => Some(Role::Blocked),
            _ => None,
        }
    }

    /// Decodes a stored role. Unknown values are treated as blocked.
    pub fn from_stored(value: &str) -> Self {
        Self::parse(value).unwrap_or(Role::Blocked)
    }

    pub fn allows(&self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            Role::Admin => matches!(
                capability,
                ViewDashboard
                    | ManageLecturers
                    | ManagePublications
                    | EditMetrics
                    | ManageUsers
                    | ManageContent
                    | ModerateFeedback
                    | ViewAuditLog
                    | ExportReports
            ),
            Role::Staff => matches!(
                capability,
                ViewDashboard | ReviewPublications | ExportReports
            ),
            Role::Lecturer => matches!(capability, ViewDashboard | SubmitPublications),
            Role::Blocked => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ViewDashboard,
    ManageLecturers,
    ManagePublications,
    SubmitPublications,
    ReviewPublications,
    EditMetrics,
    ManageUsers,
    ManageContent,
    ModerateFeedback,
    ViewAuditLog,
    ExportReports,
}

/// The authenticated principal behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    NotAuthenticated,
    Forbidden { role: Role, capability: Capability },
}

impl AccessDenied {
    pub fn message(&self) -> &'static str {
        match self {
            AccessDenied::NotAuthenticated => "Требуется вход в систему.",
            AccessDenied::Forbidden { .. } => "Нет доступа.",
        }
    }
}

pub fn authorize(actor: Option<&Actor>, capability: Capability) -> Result<(), AccessDenied> {
    let Some(actor) = actor else {
        return Err(AccessDenied::NotAuthenticated);
    };

    if actor.role.allows(capability) {
        Ok(())
    } else {
        Err(AccessDenied::Forbidden {
            role: actor.role,
            capability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor { user_id: 1, role }
    }

    #[test]
    fn parse_round_trips_known_roles() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn unknown_stored_role_is_blocked() {
        assert_eq!(Role::from_stored("root"), Role::Blocked);
        assert_eq!(Role::from_stored("staff"), Role::Staff);
    }

    #[test]
    fn only_staff_may_review() {
        assert!(Role::Staff.allows(Capability::ReviewPublications));
        assert!(!Role::Admin.allows(Capability::ReviewPublications));
        assert!(!Role::Lecturer.allows(Capability::ReviewPublications));
        assert!(!Role::Blocked.allows(Capability::ReviewPublications));
    }

    #[test]
    fn blocked_role_has_no_capabilities() {
        let caps = [
            Capability::ViewDashboard,
            Capability::ManageLecturers,
            Capability::SubmitPublications,
            Capability::ExportReports,
        ];
        for cap in caps {
            assert!(!Role::Blocked.allows(cap));
        }
    }

    #[test]
    fn authorize_without_actor_requires_login() {
        assert_eq!(
            authorize(None, Capability::ViewDashboard),
            Err(AccessDenied::NotAuthenticated)
        );
    }

    #[test]
    fn authorize_reports_forbidden_capability() {
        let lecturer = actor(Role::Lecturer);
        assert_eq!(
            authorize(Some(&lecturer), Capability::ManageUsers),
            Err(AccessDenied::Forbidden {
                role: Role::Lecturer,
                capability: Capability::ManageUsers,
            })
        );
        assert!(authorize(Some(&lecturer), Capability::SubmitPublications).is_ok());
    }

    #[test]
    fn admin_manages_catalogue_and_staff_exports() {
        let admin = actor(Role::Admin);
        assert!(authorize(Some(&admin), Capability::ManagePublications).is_ok());
        assert!(authorize(Some(&admin), Capability::EditMetrics).is_ok());
        assert!(authorize(Some(&actor(Role::Staff)), Capability::ExportReports).is_ok());
    }
}
