use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of the authenticated caller, as carried in the token's `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Patient,
    Doctor,
    Staff,
    Admin,
}

impl ActorRole {
    /// Anyone except the patient acts on behalf of the clinic.
    pub fn acts_for_clinic(&self) -> bool {
        !matches!(self, ActorRole::Patient)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRole::Patient => write!(f, "patient"),
            ActorRole::Doctor => write!(f, "doctor"),
            ActorRole::Staff => write!(f, "staff"),
            ActorRole::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for ActorRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(ActorRole::Patient),
            "doctor" => Ok(ActorRole::Doctor),
            "staff" => Ok(ActorRole::Staff),
            "admin" => Ok(ActorRole::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Staff".parse::<ActorRole>().unwrap(), ActorRole::Staff);
        assert_eq!(" admin ".parse::<ActorRole>().unwrap(), ActorRole::Admin);
        assert!("nurse".parse::<ActorRole>().is_err());
    }

    #[test]
    fn test_only_patient_acts_for_self() {
        assert!(!ActorRole::Patient.acts_for_clinic());
        assert!(ActorRole::Doctor.acts_for_clinic());
        assert!(ActorRole::Staff.acts_for_clinic());
        assert!(ActorRole::Admin.acts_for_clinic());
    }

    #[test]
    fn test_role_serde_is_snake_case() {
        let json = serde_json::to_string(&ActorRole::Staff).unwrap();
        assert_eq!(json, "\"staff\"");
    }
}
