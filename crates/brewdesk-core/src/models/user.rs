use serde::{Deserialize, Deserializer, Serialize};

/// The signed-in account. `name` is the display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl UserProfile {
    /// Name to greet the user with, falling back to the email address.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Some backends send numeric ids; both forms are kept as a string.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_profile_string_id() {
        let user: UserProfile =
            serde_json::from_str(r#"{"id":"1","email":"a@b.com","name":"A"}"#).unwrap();
        assert_eq!(user.id, "1");
        assert_eq!(user.display_name(), "A");
    }

    #[test]
    fn test_user_profile_numeric_id() {
        let user: UserProfile =
            serde_json::from_str(r#"{"id":42,"email":"a@b.com","name":"A"}"#).unwrap();
        assert_eq!(user.id, "42");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user: UserProfile = serde_json::from_str(r#"{"id":"7","email":"a@b.com"}"#).unwrap();
        assert_eq!(user.display_name(), "a@b.com");
    }

    #[test]
    fn test_serialized_user_keeps_wire_shape() {
        let user = UserProfile {
            id: "1".into(),
            email: "a@b.com".into(),
            name: "A".into(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value, serde_json::json!({"id":"1","email":"a@b.com","name":"A"}));
    }
}
