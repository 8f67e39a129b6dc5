use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a lowercase string-backed status vocabulary stored as `Text`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownStatus { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Moderation state of a produce listing.
    ListingStatus, "listing status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Inactive => "inactive",
    }
);

string_enum!(
    OrderStatus, "order status" {
        Pending => "pending",
        Confirmed => "confirmed",
        Accepted => "accepted",
        InProgress => "in_progress",
        InTransit => "in_transit",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

string_enum!(
    JobStatus, "job status" {
        Open => "open",
        Assigned => "assigned",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

string_enum!(
    BidStatus, "bid status" {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
    }
);

string_enum!(
    ProfileStatus, "profile status" {
        Active => "active",
        Suspended => "suspended",
    }
);

impl OrderStatus {
    /// Statuses a transporter sees in the delivery queue.
    pub const DELIVERY_QUEUE: &'static [OrderStatus] = &[
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Accepted,
        OrderStatus::InTransit,
    ];

    /// Next step of the delivery flow:
    /// pending | confirmed -> accepted -> in_transit -> completed.
    pub fn next_delivery_step(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending | OrderStatus::Confirmed => Some(OrderStatus::Accepted),
            OrderStatus::Accepted => Some(OrderStatus::InTransit),
            OrderStatus::InTransit => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

impl JobStatus {
    /// Next step for the assigned transporter: assigned -> in_progress -> completed.
    pub fn next_haul_step(self) -> Option<JobStatus> {
        match self {
            JobStatus::Assigned => Some(JobStatus::InProgress),
            JobStatus::InProgress => Some(JobStatus::Completed),
            _ => None,
        }
    }
}
