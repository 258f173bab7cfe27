use crate::task::OwnerId;
use serde::{Deserialize, Serialize};

/// Owner profile as the backend returns it (PascalCase on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Profile {
    #[serde(rename = "OwnerID", alias = "ownerId")]
    pub owner_id: OwnerId,
    #[serde(alias = "name")]
    pub name: String,
    #[serde(alias = "email")]
    pub email: String,
    #[serde(rename = "DOB", default, alias = "dob")]
    pub dob: Option<String>,
    #[serde(default, alias = "profilePhoto")]
    pub profile_photo: Option<String>,
    #[serde(rename = "Descrip", default, alias = "description")]
    pub description: Option<String>,
    #[serde(default, alias = "tags")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(rename = "Descrip")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagRequest {
    pub tag: String,
}

impl Profile {
    pub fn description_or_placeholder(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("Add a description to your profile.")
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == wanted)
    }
}

/// What the profile screen is showing.
#[derive(Debug, Default)]
pub enum ProfileView {
    #[default]
    Idle,
    Loading,
    Loaded(Profile),
    Failed(String),
}

impl ProfileView {
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Loaded(p) => Some(p),
            _ => None,
        }
    }

    pub fn profile_mut(&mut self) -> Option<&mut Profile> {
        match self {
            Self::Loaded(p) => Some(p),
            _ => None,
        }
    }
}

/// Trims and checks a tag before it is sent. `None` when it is blank or already present.
pub fn normalize_tag(profile: &Profile, raw: &str) -> Option<String> {
    let tag = raw.trim();
    if tag.is_empty() || profile.has_tag(tag) {
        return None;
    }
    Some(tag.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        serde_json::from_str(
            r#"{"OwnerID": 5, "Name": "Ana", "Email": "ana@correo.com",
                "DOB": null, "ProfilePhoto": null, "Descrip": "  ",
                "Tags": ["Mecanica", "Motores"]}"#,
        )
        .unwrap()
    }

    #[test]
    fn reads_pascal_case_payload() {
        let p = profile();
        assert_eq!(p.owner_id, OwnerId(5));
        assert_eq!(p.tags.len(), 2);
        assert_eq!(p.description_or_placeholder(), "Add a description to your profile.");
    }

    #[test]
    fn tags_are_trimmed_and_unique() {
        let p = profile();
        assert_eq!(normalize_tag(&p, "  Diagnostico "), Some("Diagnostico".into()));
        assert_eq!(normalize_tag(&p, "motores"), None);
        assert_eq!(normalize_tag(&p, "   "), None);
    }

    #[test]
    fn duplicate_check_folds_non_ascii_case() {
        let mut p = profile();
        p.tags.push("Diseño".into());
        assert!(p.has_tag("DISEÑO"));
        assert_eq!(normalize_tag(&p, " diseño "), None);
        assert_eq!(normalize_tag(&p, "Diseñar"), Some("Diseñar".into()));
    }

    #[test]
    fn update_uses_backend_field_name() {
        let json = serde_json::to_string(&ProfileUpdate {
            description: "Taller".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"Descrip":"Taller"}"#);
    }
}
