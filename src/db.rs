pub use self::error::DatabaseError;
pub use self::manager::{DatabaseManager, Pool};
pub use self::models::{
    Amenity, Booking, BookingFilter, ChatMessage, Complaint, ConversationSummary, Customer,
    Payment, PaymentFilter, PermissionOverride, Room, RoomType, Stay, TravelBooking,
    TravelPackage, User,
};
pub use self::stores::{
    BookingStore, ChatStore, ComplaintStore, CustomerStore, PaymentStore, RoomStore, TravelStore,
    UserStore,
};

pub mod error;
pub mod manager;
pub mod models;
pub mod schema;
pub mod sqlite;
pub mod stores;
