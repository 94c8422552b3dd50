use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Capability carried by every user; the numeric id is what the token stores.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Capability {
    Admin = 1,
    Coach = 2,
    Member = 3,
    Operator = 4,
}

impl Capability {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Capability::Admin),
            2 => Some(Capability::Coach),
            3 => Some(Capability::Member),
            4 => Some(Capability::Operator),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Staff check in against employee sessions; members do not.
    pub fn is_staff(self) -> bool {
        !matches!(self, Capability::Member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn ids_round_trip() {
        for cap in Capability::iter() {
            assert_eq!(Capability::from_id(cap.id()), Some(cap));
        }
        assert_eq!(Capability::from_id(0), None);
        assert_eq!(Capability::from_id(5), None);
    }

    #[test]
    fn names_are_lowercase() {
        assert_eq!(Capability::Operator.to_string(), "operator");
        assert_eq!(Capability::from_str("coach").unwrap(), Capability::Coach);
    }
}
