/// Emails allowed to hold the admin role.
pub const INITIAL_ADMIN_EMAILS: &[&str] = &["admin1@example.com", "admin2@example.com"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAllowList {
    emails: Vec<String>,
}

impl AdminAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    /// Parses a comma-separated list, as found in `ADMIN_EMAILS`.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn is_authorized_admin_email(&self, email: &str) -> bool {
        let email = normalize(email);
        !email.is_empty() && self.emails.iter().any(|e| *e == email)
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

impl Default for AdminAllowList {
    fn default() -> Self {
        Self::new(INITIAL_ADMIN_EMAILS.iter().copied())
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_list_matches_listed_emails_only() {
        let admins = AdminAllowList::default();
        assert!(admins.is_authorized_admin_email("admin1@example.com"));
        assert!(admins.is_authorized_admin_email("admin2@example.com"));
        assert!(!admins.is_authorized_admin_email("admin3@example.com"));
        assert!(!admins.is_authorized_admin_email("farmer@example.com"));
    }

    #[test]
    fn comparison_ignores_case_on_both_sides() {
        let admins = AdminAllowList::from_csv("Ops@Farm2Table.io");
        assert!(admins.is_authorized_admin_email("ops@farm2table.io"));
        assert!(admins.is_authorized_admin_email("OPS@FARM2TABLE.IO"));
        assert!(admins.is_authorized_admin_email("  ops@farm2table.io "));
    }

    #[test]
    fn empty_email_is_never_authorized() {
        let admins = AdminAllowList::from_csv("a@example.com,,");
        assert_eq!(admins.len(), 1);
        assert!(!admins.is_authorized_admin_email(""));
    }
}
