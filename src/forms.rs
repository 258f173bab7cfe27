//! Text-entry forms and the login/signup validation rules.
//!
//! A `Form` is a list of single-line fields with one focused at a time. It
//! knows nothing about what its values mean; the `validate_*` functions turn
//! raw values into request bodies or inline `FieldErrors`.

use crate::error::FieldErrors;
use chrono::{Datelike, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_BIRTH_YEAR: i32 = 1910;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles");
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone)]
pub struct InputField {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    pub secret: bool,
}

impl InputField {
    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            value: String::new(),
            secret: false,
        }
    }

    pub fn secret(name: &'static str, label: &'static str) -> Self {
        Self {
            secret: true,
            ..Self::text(name, label)
        }
    }

    /// Value as drawn on screen; secrets are masked.
    pub fn display(&self) -> String {
        if self.secret {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    Editing,
    Submit,
    Cancel,
}

#[derive(Debug, Clone)]
pub struct Form {
    pub fields: Vec<InputField>,
    pub focus: usize,
    pub errors: FieldErrors,
}

impl Form {
    pub fn new(fields: Vec<InputField>) -> Self {
        Self {
            fields,
            focus: 0,
            errors: FieldErrors::new(),
        }
    }

    pub fn login() -> Self {
        Self::new(vec![
            InputField::text("email", "Email"),
            InputField::secret("password", "Password"),
        ])
    }

    pub fn signup() -> Self {
        Self::new(vec![
            InputField::text("first_name", "First name"),
            InputField::text("last_name", "Last name"),
            InputField::text("email", "Email"),
            InputField::secret("password", "Password"),
            InputField::text("birth_date", "Birth date (YYYY-MM-DD)"),
        ])
    }

    pub fn task() -> Self {
        Self::new(vec![
            InputField::text("title", "Title"),
            InputField::text("description", "Description"),
            InputField::text("due_date", "Due date (YYYY-MM-DD)"),
            InputField::text("priority", "Priority (low/medium/high)"),
        ])
    }

    pub fn single(name: &'static str, label: &'static str) -> Self {
        Self::new(vec![InputField::text(name, label)])
    }

    pub fn value(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map_or("", |f| f.value.as_str())
    }

    pub fn set_value(&mut self, name: &str, value: impl Into<String>) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.value = value.into();
        }
    }

    pub fn clear(&mut self) {
        for field in &mut self.fields {
            field.value.clear();
        }
        self.focus = 0;
        self.errors = FieldErrors::new();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        match key.code {
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Tab | KeyCode::Down => self.focus = (self.focus + 1) % self.fields.len().max(1),
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = self.focus.checked_sub(1).unwrap_or(self.fields.len().saturating_sub(1));
            }
            KeyCode::Backspace => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.value.pop();
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.value.push(c);
                }
            }
            _ => {}
        }
        FormAction::Editing
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub dob: String,
}

fn check_password(password: &str, errors: &mut FieldErrors) {
    if password.is_empty() {
        errors.insert("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(
            "password",
            format!("At least {MIN_PASSWORD_LEN} characters"),
        );
    }
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.is_empty() {
        errors.insert("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.insert("email", "Email is not valid");
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<Credentials, FieldErrors> {
    let mut errors = FieldErrors::new();
    let email = email.trim();
    check_email(email, &mut errors);
    check_password(password, &mut errors);
    errors.into_result(Credentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// Signup rules. `today` bounds the birth year from above.
pub fn validate_signup(form: &Form, today: NaiveDate) -> Result<SignupRequest, FieldErrors> {
    let mut errors = FieldErrors::new();
    let first = form.value("first_name").trim();
    let last = form.value("last_name").trim();
    let email = form.value("email").trim();
    let password = form.value("password");
    let birth = form.value("birth_date").trim();

    if first.is_empty() {
        errors.insert("first_name", "First name is required");
    }
    if last.is_empty() {
        errors.insert("last_name", "Last name is required");
    }
    check_email(email, &mut errors);
    check_password(password, &mut errors);

    match NaiveDate::parse_from_str(birth, "%Y-%m-%d") {
        Ok(date) if (MIN_BIRTH_YEAR..=today.year()).contains(&date.year()) => {}
        _ => errors.insert("birth_date", "Invalid date"),
    }

    errors.into_result(SignupRequest {
        email: email.to_string(),
        password: password.to_string(),
        name: format!("{first} {last}"),
        dob: birth.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_into(form: &mut Form, text: &str) {
        for c in text.chars() {
            form.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn filled_signup() -> Form {
        let mut form = Form::signup();
        form.set_value("first_name", "Ana");
        form.set_value("last_name", "Torres");
        form.set_value("email", "ana@correo.com");
        form.set_value("password", "secreto");
        form.set_value("birth_date", "1990-04-12");
        form
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    #[test]
    fn login_rejects_malformed_email() {
        for email in ["", "ana", "ana@correo", "ana @correo.com", "@."] {
            let errors = validate_login(email, "secreto").unwrap_err();
            assert!(errors.get("email").is_some(), "accepted {email:?}");
        }
    }

    #[test]
    fn login_rejects_short_password() {
        let errors = validate_login("ana@correo.com", "12345").unwrap_err();
        assert!(errors.get("password").is_some());
        assert!(errors.get("email").is_none());
    }

    #[test]
    fn login_accepts_valid_credentials() {
        let creds = validate_login("  ana@correo.com ", "123456").unwrap();
        assert_eq!(creds.email, "ana@correo.com");
    }

    #[test]
    fn signup_builds_full_name() {
        let request = validate_signup(&filled_signup(), today()).unwrap();
        assert_eq!(request.name, "Ana Torres");
        assert_eq!(request.dob, "1990-04-12");
    }

    #[test]
    fn signup_rejects_bad_fields() {
        let mut form = filled_signup();
        form.set_value("first_name", "  ");
        form.set_value("email", "ana.correo.com");
        form.set_value("password", "abc");
        let errors = validate_signup(&form, today()).unwrap_err();
        assert!(errors.get("first_name").is_some());
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
        assert!(errors.get("last_name").is_none());
    }

    #[test]
    fn signup_birth_year_bounds() {
        for (dob, ok) in [
            ("1909-12-31", false),
            ("1910-01-01", true),
            ("2025-01-01", true),
            ("2026-01-01", false),
            ("", false),
            ("12/04/1990", false),
        ] {
            let mut form = filled_signup();
            form.set_value("birth_date", dob);
            assert_eq!(validate_signup(&form, today()).is_ok(), ok, "dob {dob:?}");
        }
    }

    #[test]
    fn form_typing_and_focus() {
        let mut form = Form::login();
        type_into(&mut form, "a@b.co");
        form.handle_key(key(KeyCode::Tab));
        type_into(&mut form, "pw");
        form.handle_key(key(KeyCode::Backspace));
        assert_eq!(form.value("email"), "a@b.co");
        assert_eq!(form.value("password"), "p");
        assert_eq!(form.fields[1].display(), "*");

        form.handle_key(key(KeyCode::BackTab));
        assert_eq!(form.focus, 0);
        form.handle_key(key(KeyCode::Up));
        assert_eq!(form.focus, 1);
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::Submit);
        assert_eq!(form.handle_key(key(KeyCode::Esc)), FormAction::Cancel);
    }
}
