//! Input validation for auth request payloads.
//!
//! Each payload shape has its own validator returning every violated rule,
//! in field order.

use email_address::EmailAddress;

use crate::auth::models::{LoginRequest, RegisterRequest, Role};
use crate::errors::{AuthError, AuthResult};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Validated registration input
pub struct ValidRegistration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Role,
}

impl std::fmt::Debug for ValidRegistration<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidRegistration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

pub fn validate_register(req: &RegisterRequest) -> AuthResult<ValidRegistration<'_>> {
    let mut violations = Vec::new();

    if req.name.trim().is_empty() {
        violations.push("name is required".to_string());
    }
    check_email(&req.email, &mut violations);
    if req.password.is_empty() {
        violations.push("password is required".to_string());
    } else if req.password.chars().count() < MIN_PASSWORD_LEN {
        violations.push(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    let role = if req.role.is_empty() {
        violations.push("role is required".to_string());
        None
    } else {
        match req.role.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                violations.push("role must be one of [owner, cashier, admin, user]".to_string());
                None
            }
        }
    };

    match role {
        Some(role) if violations.is_empty() => Ok(ValidRegistration {
            name: &req.name,
            email: &req.email,
            password: &req.password,
            role,
        }),
        _ => Err(AuthError::Validation(violations)),
    }
}

pub fn validate_login(req: &LoginRequest) -> AuthResult<()> {
    let mut violations = Vec::new();
    check_email(&req.email, &mut violations);
    if req.password.is_empty() {
        violations.push("password is required".to_string());
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(violations))
    }
}

fn check_email(email: &str, violations: &mut Vec<String>) {
    if email.is_empty() {
        violations.push("email is required".to_string());
    } else if !EmailAddress::is_valid(email) {
        violations.push("email must be a valid email address".to_string());
    }
}
