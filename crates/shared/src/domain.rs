use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Branch filter accepted by the college finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Course {
    Cse,
    Ece,
    Me,
    Eee,
    Overall,
}

impl Course {
    pub const ALL: [Course; 5] = [
        Course::Cse,
        Course::Ece,
        Course::Me,
        Course::Eee,
        Course::Overall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Course::Cse => "CSE",
            Course::Ece => "ECE",
            Course::Me => "ME",
            Course::Eee => "EEE",
            Course::Overall => "OVERALL",
        }
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown course '{0}' (expected one of CSE, ECE, ME, EEE, OVERALL)")]
pub struct UnknownCourse(pub String);

impl FromStr for Course {
    type Err = UnknownCourse;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Course::ALL
            .into_iter()
            .find(|course| course.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCourse(value.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Account record returned by the auth endpoints: the auth user plus the
/// student profile row attached to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub user: Option<UserRecord>,
    #[serde(default)]
    pub profile: Option<ProfileDetails>,
}

impl Profile {
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            user: None,
            profile: Some(ProfileDetails {
                name: Some(name.into()),
                ..ProfileDetails::default()
            }),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.name.as_deref())
    }

    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.email.as_deref())
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().and_then(|u| u.id.as_ref())
    }

    pub fn phone(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.phone.as_deref())
    }

    pub fn display_name(&self) -> &str {
        self.name().or_else(|| self.email()).unwrap_or("User")
    }

    pub fn role(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.role.as_deref())
            .unwrap_or("Student")
    }
}
