use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};

use super::{join, Checker, Len, ValidationErrors};
use crate::db::models::{Address, Profile, RecordId, Role};

#[derive(Debug, Clone, PartialEq)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub user_agent: Option<String>,
}

/// Structural stage of registration; see [`normalize_register`].
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterInput {
    pub login: LoginInput,
    pub confirm_password: String,
    pub name: Option<String>,
    pub profile: Option<Profile>,
    pub id_number: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub user_agent: Option<String>,
    pub name: String,
    pub profile: Profile,
    pub id_number: String,
    pub role: Role,
    pub history_transaction: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordChange {
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleUpdate {
    pub role: Role,
}

fn login_fields(checker: &mut Checker, obj: &Map<String, Value>) -> Option<LoginInput> {
    let email = checker.email(obj, "email", "email");
    let password = checker.string(obj, "password", "password", Len(6, 255));
    let user_agent = checker.optional_string(obj, "userAgent", "userAgent", Len(0, 1024));
    Some(LoginInput {
        email: email?,
        password: password?,
        user_agent,
    })
}

/// `password` / `confirmPassword` pair; a mismatch is reported on the
/// confirmation field.
fn password_pair(checker: &mut Checker, obj: &Map<String, Value>, password: Option<&str>) -> Option<String> {
    let confirm = checker.string(obj, "confirmPassword", "confirmPassword", Len(6, 255))?;
    match password {
        Some(password) if password != confirm => {
            checker.issue("confirmPassword", "Password mismatch");
            None
        }
        _ => Some(confirm),
    }
}

fn date_of_birth(checker: &mut Checker, obj: &Map<String, Value>, path: &str) -> Option<NaiveDate> {
    let raw = checker.optional_string(obj, "dateOfBirth", path, Len(1, 64))?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(&raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            checker.issue(path, "Invalid date");
            None
        })
}

fn address(checker: &mut Checker, obj: &Map<String, Value>, prefix: &str) -> Option<Address> {
    let path = join(prefix, "address");
    let address = checker.optional_object(obj, "address", &path)?;
    let field = |checker: &mut Checker, key: &str| {
        checker.optional_string(address, key, &join(&path, key), Len(0, 255))
    };
    Some(Address {
        street: field(checker, "street"),
        city: field(checker, "city"),
        province: field(checker, "province"),
        postal_code: field(checker, "postalCode"),
        country: field(checker, "country"),
    })
}

/// Profile sub-document. `fullname` is read but always replaced later.
fn profile(checker: &mut Checker, obj: &Map<String, Value>) -> Option<Profile> {
    let profile = checker.optional_object(obj, "profile", "profile")?;
    let fullname = checker.optional_string(profile, "fullname", "profile.fullname", Len(0, 255));
    let picture = checker.optional_string(profile, "picture", "profile.picture", Len(0, 2048));
    let phone_number = checker.phone_number(profile, "phoneNumber", "profile.phoneNumber");
    let gender = checker.optional_string(profile, "gender", "profile.gender", Len(1, 32));
    let date_of_birth = date_of_birth(checker, profile, "profile.dateOfBirth");
    let id_number = profile
        .get("idNumber")
        .filter(|v| !v.is_null())
        .and_then(|_| checker.id_number(profile, "idNumber", "profile.idNumber"));
    let address = address(checker, profile, "profile");
    Some(Profile {
        fullname: fullname.unwrap_or_default(),
        picture,
        phone_number,
        gender,
        date_of_birth,
        id_number,
        address,
    })
}

pub fn check_login(value: &Value) -> Result<LoginInput, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker.root(value).and_then(|obj| login_fields(&mut checker, obj));
    checker.finish(input)
}

pub fn login(value: &Value) -> Result<LoginInput, ValidationErrors> {
    check_login(value)
}

pub fn check_register(value: &Value) -> Result<RegisterInput, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker.root(value).and_then(|obj| {
        let login = login_fields(&mut checker, obj);
        let password = obj.get("password").and_then(Value::as_str);
        let confirm_password = password_pair(&mut checker, obj, password);
        let name = checker.optional_string(obj, "name", "name", Len(4, 255));
        let profile = profile(&mut checker, obj);
        let id_number = checker.id_number(obj, "idNumber", "idNumber");
        let role = checker.one_of(obj, "role", "role", Role::ALL, Some(Role::User));
        Some(RegisterInput {
            login: login?,
            confirm_password: confirm_password?,
            name,
            profile,
            id_number: id_number?,
            role: role?,
        })
    });
    checker.finish(input)
}

/// Pure transform over a checked registration.
pub fn normalize_register(input: RegisterInput) -> Registration {
    let name = input.name.unwrap_or_default();
    let profile = Profile {
        fullname: name.clone(),
        ..input.profile.unwrap_or_default()
    };
    Registration {
        email: input.login.email,
        password: input.login.password,
        user_agent: input.login.user_agent,
        name,
        profile,
        id_number: input.id_number,
        role: input.role,
        history_transaction: Vec::new(),
    }
}

pub fn register(value: &Value) -> Result<Registration, ValidationErrors> {
    check_register(value).map(normalize_register)
}

pub fn profile_update(value: &Value) -> Result<ProfileUpdate, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker.root(value).map(|obj| ProfileUpdate {
        name: checker.optional_string(obj, "name", "name", Len(4, 255)),
        profile: profile(&mut checker, obj),
    });
    checker.finish(input)
}

pub fn password_change(value: &Value) -> Result<PasswordChange, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker.root(value).and_then(|obj| {
        let password = checker.string(obj, "password", "password", Len(6, 255));
        password_pair(&mut checker, obj, password.as_deref())?;
        Some(PasswordChange { password: password? })
    });
    checker.finish(input)
}

pub fn role_update(value: &Value) -> Result<RoleUpdate, ValidationErrors> {
    let mut checker = Checker::new();
    let input = checker
        .root(value)
        .and_then(|obj| checker.one_of(obj, "role", "role", Role::ALL, None))
        .map(|role| RoleUpdate { role });
    checker.finish(input)
}
