use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub subscription_plan: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Personal,
    Organization,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Personal => write!(f, "personal"),
            Self::Organization => write!(f, "organization"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl From<String> for UserRole {
    fn from(s: String) -> Self {
        match s.as_str() {
            "organization" => Self::Organization,
            "admin" => Self::Admin,
            _ => Self::Personal,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Free,
    Basic,
    Pro,
    ProMax,
    UltraPro,
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Basic => write!(f, "basic"),
            Self::Pro => write!(f, "pro"),
            Self::ProMax => write!(f, "pro_max"),
            Self::UltraPro => write!(f, "ultra_pro"),
        }
    }
}

impl From<String> for SubscriptionPlan {
    fn from(s: String) -> Self {
        match s.as_str() {
            "basic" => Self::Basic,
            "pro" => Self::Pro,
            "pro_max" => Self::ProMax,
            "ultra_pro" => Self::UltraPro,
            _ => Self::Free,
        }
    }
}

/// The user as exposed to clients and held in the portal session.
/// Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_plan: Option<SubscriptionPlan>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: format!("{} {}", user.first_name, user.last_name),
            email: user.email,
            role: UserRole::from(user.role),
            subscription_plan: user.subscription_plan.map(SubscriptionPlan::from),
        }
    }
}

// DTOs for the auth API

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::Personal, UserRole::Organization, UserRole::Admin] {
            assert_eq!(UserRole::from(role.to_string()), role);
        }
        // Unknown strings fall back to the least-privileged role
        assert_eq!(UserRole::from("superuser".to_string()), UserRole::Personal);
    }

    #[test]
    fn test_plan_round_trip() {
        for plan in [
            SubscriptionPlan::Free,
            SubscriptionPlan::Basic,
            SubscriptionPlan::Pro,
            SubscriptionPlan::ProMax,
            SubscriptionPlan::UltraPro,
        ] {
            assert_eq!(SubscriptionPlan::from(plan.to_string()), plan);
        }
    }

    #[test]
    fn test_profile_hides_password_hash() {
        let user = User {
            id: "u1".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            role: "admin".to_string(),
            subscription_plan: Some("pro_max".to_string()),
            created_at: String::new(),
            updated_at: String::new(),
        };
        let profile = UserProfile::from(user);
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.role, UserRole::Admin);
        assert_eq!(profile.subscription_plan, Some(SubscriptionPlan::ProMax));

        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"pro_max\""));
    }
}
