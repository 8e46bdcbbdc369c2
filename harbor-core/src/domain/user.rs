use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, AsRefStr, EnumString,
)]
pub enum Role {
    ShippingAgent,
    PortManager,
    PortStaff,
    FinanceAdmin,
}

impl Role {
    pub fn can_submit_manual_reports(self) -> bool {
        matches!(self, Role::PortManager | Role::PortStaff)
    }

    pub fn can_decommission_vessels(self) -> bool {
        matches!(self, Role::PortManager)
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

#[cfg(feature = "test")]
mod test {
    use super::*;

    impl User {
        pub fn test_default(role: Role) -> User {
            User {
                id: UserId(Uuid::new_v4()),
                username: "test_user".to_string(),
                role,
            }
        }
    }
}
