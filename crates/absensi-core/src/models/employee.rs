use serde::{Deserialize, Serialize};

use super::PageMeta;

/// Employee accounts must use the company mail domain.
pub const COMPANY_EMAIL_DOMAIN: &str = "dexagroup.com";

const MIN_NAME_LEN: usize = 3;
const MIN_POSITION_LEN: usize = 2;
const MIN_PHONE_LEN: usize = 10;

/// An employee record as the admin endpoints return it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(rename = "phoneNumber", default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
}

impl Employee {
    pub fn status_label(&self) -> &'static str {
        if self.is_active {
            "AKTIF"
        } else {
            "NONAKTIF"
        }
    }
}

/// `data` of `GET /employees`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeePage {
    #[serde(default)]
    pub data: Vec<Employee>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

/// Body of `POST /employees`.
#[derive(Debug, Clone, Serialize)]
pub struct NewEmployee {
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    pub position: String,
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    pub role: String,
    /// Server assigns one when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl NewEmployee {
    pub fn validate(&self) -> Result<(), String> {
        check_name(&self.full_name)?;
        check_company_email(&self.email)?;
        check_position(&self.position)?;
        check_phone(&self.phone_number)?;
        if self.role.trim().is_empty() {
            return Err("Role is required".to_string());
        }
        Ok(())
    }
}

/// Body of `PATCH /employees/{id}`. Email and role are not editable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeUpdate {
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub position: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
}

impl EmployeeUpdate {
    pub fn validate(&self) -> Result<(), String> {
        check_name(&self.full_name)?;
        check_position(&self.position)?;
        check_phone(&self.phone_number)
    }
}

/// Start an edit from the current record.
impl From<&Employee> for EmployeeUpdate {
    fn from(employee: &Employee) -> Self {
        Self {
            full_name: employee.full_name.clone(),
            position: employee.position.clone().unwrap_or_default(),
            is_active: employee.is_active,
            phone_number: employee.phone_number.clone().unwrap_or_default(),
        }
    }
}

fn check_name(name: &str) -> Result<(), String> {
    if name.trim().chars().count() < MIN_NAME_LEN {
        return Err(format!("Name must be at least {} characters", MIN_NAME_LEN));
    }
    Ok(())
}

fn check_position(position: &str) -> Result<(), String> {
    if position.trim().chars().count() < MIN_POSITION_LEN {
        return Err("Position is required".to_string());
    }
    Ok(())
}

fn check_phone(phone: &str) -> Result<(), String> {
    if phone.trim().chars().count() < MIN_PHONE_LEN {
        return Err(format!("Phone number must be at least {} digits", MIN_PHONE_LEN));
    }
    Ok(())
}

fn check_company_email(email: &str) -> Result<(), String> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain == COMPANY_EMAIL_DOMAIN => Ok(()),
        _ => Err(format!("Email must be a company address (@{})", COMPANY_EMAIL_DOMAIN)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_employee() -> NewEmployee {
        NewEmployee {
            full_name: "Budi Santoso".to_string(),
            email: "budi@dexagroup.com".to_string(),
            position: "Engineer".to_string(),
            phone_number: "081234567890".to_string(),
            role: "employee".to_string(),
            password: None,
        }
    }

    #[test]
    fn test_new_employee_validation() {
        assert!(new_employee().validate().is_ok());

        let mut e = new_employee();
        e.email = "budi@gmail.com".to_string();
        assert!(e.validate().unwrap_err().contains("dexagroup.com"));

        let mut e = new_employee();
        e.full_name = "Bo".to_string();
        assert!(e.validate().is_err());

        let mut e = new_employee();
        e.phone_number = "0812".to_string();
        assert!(e.validate().is_err());
    }

    #[test]
    fn test_new_employee_omits_empty_password() {
        let body = serde_json::to_value(new_employee()).unwrap();
        assert_eq!(body["fullName"], "Budi Santoso");
        assert!(body.get("password").is_none());
        assert!(body.get("isActive").is_none());
    }

    #[test]
    fn test_update_starts_from_record() {
        let json = r#"{"id":"emp-7","fullName":"Sari Wulandari","email":"sari@dexagroup.com","position":"HR","phoneNumber":"081298765432","role":"admin","isActive":true}"#;
        let employee: Employee = serde_json::from_str(json).unwrap();
        assert_eq!(employee.status_label(), "AKTIF");

        let mut update = EmployeeUpdate::from(&employee);
        update.is_active = false;
        assert!(update.validate().is_ok());

        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body["isActive"], false);
        assert_eq!(body["phoneNumber"], "081298765432");
        assert!(body.get("email").is_none());
    }

    #[test]
    fn test_parse_employee_page() {
        let json = r#"{"data":[{"id":"emp-1","fullName":"Budi","isActive":false}],"meta":{"page":2,"limit":10,"total":11,"totalPages":2}}"#;
        let page: EmployeePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.data[0].status_label(), "NONAKTIF");
        assert!(!page.meta.unwrap().has_next());
    }
}
