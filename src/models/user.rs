use serde::{Deserialize, Serialize};

/// The logged-in user as mirrored in client storage
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Account record as returned by `/profile`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl Profile {
    /// First and last name joined, or the email when both are blank
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }

    pub fn into_session_user(self) -> SessionUser {
        SessionUser {
            id: self.id,
            name: self.display_name(),
            email: self.email,
            photo: self.photo,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
        }
    }
}

impl SessionUser {
    /// Merge a freshly saved profile into the stored user, keeping the
    /// typed name when the backend returns no name parts
    pub fn merged_with(&self, profile: &Profile, typed_name: &str) -> SessionUser {
        let name = if profile.first_name.is_some() || profile.last_name.is_some() {
            profile.display_name()
        } else {
            typed_name.to_string()
        };

        SessionUser {
            id: self.id,
            name,
            email: profile.email.clone(),
            photo: profile.photo.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            phone_number: profile.phone_number.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<Profile>,
}
