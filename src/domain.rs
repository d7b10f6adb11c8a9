pub use self::access::{GrantSource, Permission, ResolvedPermission, Role};
pub use self::status::{
    BookingStatus, ComplaintStatus, MessageSender, PaymentMethod, PaymentStatus, RoomStatus,
    TravelBookingStatus, UnknownVariant,
};

pub mod access;
pub mod billing;
pub mod status;
