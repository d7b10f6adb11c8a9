#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a status enum stored as a kebab-case string column.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::domain::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::domain::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use string_enum;

string_enum! {
    BookingStatus ("booking status") {
        Pending => "pending",
        Confirmed => "confirmed",
        CheckedIn => "checked-in",
        CheckedOut => "checked-out",
        CancellationPending => "cancellation-pending",
        Cancelled => "cancelled",
    }
}

impl BookingStatus {
    /// Statuses that hold the room for the booked nights.
    pub const OCCUPYING: &'static [BookingStatus] = &[
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::CheckedIn,
        BookingStatus::CancellationPending,
    ];

    pub fn occupies_room(&self) -> bool {
        Self::OCCUPYING.contains(self)
    }
}

string_enum! {
    RoomStatus ("room status") {
        Available => "available",
        Occupied => "occupied",
        Cleaning => "cleaning",
        Maintenance => "maintenance",
    }
}

string_enum! {
    PaymentStatus ("payment status") {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
        Refunded => "refunded",
    }
}

string_enum! {
    PaymentMethod ("payment method") {
        Cash => "cash",
        Card => "card",
        BankTransfer => "bank-transfer",
        Online => "online",
    }
}

string_enum! {
    ComplaintStatus ("complaint status") {
        Open => "open",
        InProgress => "in-progress",
        Resolved => "resolved",
        Closed => "closed",
    }
}

impl ComplaintStatus {
    pub fn can_transition_to(&self, next: ComplaintStatus) -> bool {
        use ComplaintStatus::*;
        matches!(
            (self, next),
            (Open, InProgress)
                | (Open, Resolved)
                | (InProgress, Resolved)
                | (Resolved, Closed)
                | (Resolved, InProgress)
        )
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ComplaintStatus::Open | ComplaintStatus::InProgress)
    }
}

string_enum! {
    TravelBookingStatus ("travel booking status") {
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

impl TravelBookingStatus {
    pub fn can_transition_to(&self, next: TravelBookingStatus) -> bool {
        use TravelBookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
        )
    }
}

string_enum! {
    MessageSender ("message sender") {
        Customer => "customer",
        Staff => "staff",
    }
}
