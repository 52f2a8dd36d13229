use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    /// Anything that isn't "admin" (any case) is treated as an employee.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Employee
        }
    }

    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Employee => "/employee",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of a successful `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    /// Kept untyped so the stored snapshot matches what the server sent.
    pub user: serde_json::Value,
}

impl LoginResponse {
    pub fn user(&self) -> Option<User> {
        serde_json::from_value(self.user.clone()).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "fullName", default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl User {
    pub fn role(&self) -> Role {
        self.role.as_deref().map(Role::parse).unwrap_or(Role::Employee)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(rename = "phoneNumber", default)]
    pub phone_number: Option<String>,
    #[serde(rename = "photoUrl", default)]
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("ADMIN"), Role::Admin);
        assert_eq!(Role::parse("employee"), Role::Employee);
        assert_eq!(Role::parse("intern"), Role::Employee);
        assert_eq!(Role::Admin.home_path(), "/admin");
    }

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"accessToken":"eyJ.abc.def","user":{"id":"emp-001","fullName":"Sari Wulandari","email":"sari@dexagroup.com","role":"admin","position":"HR"}}"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.access_token, "eyJ.abc.def");

        let user = resp.user().unwrap();
        assert_eq!(user.name, "Sari Wulandari");
        assert_eq!(user.role(), Role::Admin);
        // unknown fields survive in the raw snapshot
        assert_eq!(resp.user["position"], "HR");
    }

    #[test]
    fn test_parse_profile() {
        let json = r#"{"fullName":"Budi","email":"budi@dexagroup.com","position":"Engineer","phoneNumber":"08123456789","photoUrl":null}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.full_name, "Budi");
        assert_eq!(profile.phone_number.as_deref(), Some("08123456789"));
        assert!(profile.photo_url.is_none());
    }
}
