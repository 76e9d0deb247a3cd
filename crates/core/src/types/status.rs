//! Status enums for orders, users and products.
//!
//! These are stored as `TEXT` columns guarded by `CHECK` constraints and go
//! through `Display`/`FromStr` at the database boundary.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Any status may follow any other; the only coupled side effect is the
/// `shipped_at` timestamp, see [`crate::models::OrderUpdate::from_edit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Just created, nothing done yet.
    #[default]
    New,
    /// Packed and waiting for pickup.
    Prepared,
    /// Handed to the shipping company.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Will not be fulfilled.
    Cancelled,
    /// Something went wrong and needs attention.
    Issue,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::Prepared,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Issue,
    ];

    /// The status name as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Prepared => "Prepared",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Issue => "Issue",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Platform admin: sees and creates every brand.
    Admin,
    /// Brand owner: sees only their own brand.
    #[default]
    Owner,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Owner => write!(f, "owner"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Whether a product can be picked for new orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    Active,
    Inactive,
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Inactive => write!(f, "Inactive"),
        }
    }
}

impl std::str::FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Inactive" => Ok(Self::Inactive),
            _ => Err(format!("invalid availability: {s}")),
        }
    }
}
