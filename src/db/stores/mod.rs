use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::DatabaseError;
use super::models::{
    Amenity, Booking, BookingFilter, ChatMessage, Complaint, ConversationSummary, Customer,
    Payment, PaymentFilter, PermissionOverride, Room, RoomType, Stay, TravelBooking,
    TravelPackage, User,
};
use crate::domain::billing::CheckOutBill;
use crate::domain::{
    BookingStatus, ComplaintStatus, Permission, Role, RoomStatus, TravelBookingStatus,
};

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn create_room_type(&self, room_type: &RoomType) -> Result<i64, DatabaseError>;
    async fn update_room_type(&self, room_type: &RoomType) -> Result<(), DatabaseError>;
    async fn get_room_type(&self, id: i64) -> Result<Option<RoomType>, DatabaseError>;
    async fn list_room_types(&self) -> Result<Vec<RoomType>, DatabaseError>;

    async fn create_room(&self, room: &Room) -> Result<i64, DatabaseError>;
    async fn update_room(&self, room: &Room) -> Result<(), DatabaseError>;
    async fn set_room_status(&self, id: i64, status: RoomStatus) -> Result<bool, DatabaseError>;
    async fn get_room(&self, id: i64) -> Result<Option<Room>, DatabaseError>;
    async fn list_rooms(
        &self,
        status: Option<RoomStatus>,
        room_type_id: Option<i64>,
    ) -> Result<Vec<Room>, DatabaseError>;
    async fn count_rooms_by_status(&self) -> Result<BTreeMap<RoomStatus, i64>, DatabaseError>;
    /// Rooms that fit `guests`, are not under maintenance and have no
    /// occupying booking overlapping `[check_in, check_out)`.
    async fn available_rooms(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i64,
    ) -> Result<Vec<Room>, DatabaseError>;

    async fn create_amenity(&self, amenity: &Amenity) -> Result<i64, DatabaseError>;
    async fn update_amenity(&self, amenity: &Amenity) -> Result<(), DatabaseError>;
    async fn delete_amenity(&self, id: i64) -> Result<bool, DatabaseError>;
    async fn get_amenity(&self, id: i64) -> Result<Option<Amenity>, DatabaseError>;
    async fn list_amenities(&self, room_type_id: Option<i64>)
    -> Result<Vec<Amenity>, DatabaseError>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn create_customer(&self, customer: &Customer) -> Result<i64, DatabaseError>;
    async fn update_customer(&self, customer: &Customer) -> Result<(), DatabaseError>;
    async fn get_customer(&self, id: i64) -> Result<Option<Customer>, DatabaseError>;
    async fn get_customer_by_user(&self, user_id: i64) -> Result<Option<Customer>, DatabaseError>;
    async fn list_customers(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Customer>, DatabaseError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts the booking unless an occupying booking overlaps it on the
    /// same room, in which case `DatabaseError::Conflict` is returned.
    async fn create_booking(&self, booking: &Booking) -> Result<i64, DatabaseError>;
    async fn get_booking(&self, id: i64) -> Result<Option<Booking>, DatabaseError>;
    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, DatabaseError>;
    /// Moves the booking to `to` only if its current status is one of
    /// `from`. Returns whether a row changed.
    async fn transition_booking(
        &self,
        id: i64,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<bool, DatabaseError>;
    async fn count_bookings_by_status(
        &self,
    ) -> Result<BTreeMap<BookingStatus, i64>, DatabaseError>;

    async fn get_stay(&self, booking_id: i64) -> Result<Option<Stay>, DatabaseError>;
    /// Confirmed booking becomes checked in, the stay row is written and the
    /// room is marked occupied, all or nothing.
    async fn check_in(&self, booking: &Booking, stay: &Stay) -> Result<bool, DatabaseError>;
    async fn add_charge(
        &self,
        booking_id: i64,
        amount_cents: i64,
        description: &str,
    ) -> Result<bool, DatabaseError>;
    /// Closes the open stay and prices it from the charges recorded in the
    /// same transaction. `None` when the booking is no longer checked in.
    async fn check_out(
        &self,
        booking: &Booking,
        checked_out_by: i64,
        at: DateTime<Utc>,
        today: NaiveDate,
        late_fee_per_day_cents: i64,
    ) -> Result<Option<CheckOutBill>, DatabaseError>;
    async fn list_checked_in(&self) -> Result<Vec<(Booking, Stay)>, DatabaseError>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn insert_message(&self, message: &ChatMessage) -> Result<i64, DatabaseError>;
    /// Marks the conversation's customer messages read and inserts the staff
    /// reply. Returns the reply id and the new message count.
    async fn insert_reply(&self, message: &ChatMessage) -> Result<(i64, i64), DatabaseError>;
    async fn list_messages(
        &self,
        customer_id: i64,
        after_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, DatabaseError>;
    async fn mark_read(&self, customer_id: i64) -> Result<usize, DatabaseError>;
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, DatabaseError>;
    async fn count_unread(&self) -> Result<i64, DatabaseError>;
}

#[async_trait]
pub trait ComplaintStore: Send + Sync {
    async fn create_complaint(&self, complaint: &Complaint) -> Result<i64, DatabaseError>;
    async fn get_complaint(&self, id: i64) -> Result<Option<Complaint>, DatabaseError>;
    async fn list_complaints(
        &self,
        status: Option<ComplaintStatus>,
        customer_id: Option<i64>,
    ) -> Result<Vec<Complaint>, DatabaseError>;
    async fn transition_complaint(
        &self,
        id: i64,
        from: ComplaintStatus,
        to: ComplaintStatus,
        resolution: Option<&str>,
    ) -> Result<bool, DatabaseError>;
    async fn count_open_complaints(&self) -> Result<i64, DatabaseError>;
}

#[async_trait]
pub trait TravelStore: Send + Sync {
    async fn create_package(&self, package: &TravelPackage) -> Result<i64, DatabaseError>;
    async fn update_package(&self, package: &TravelPackage) -> Result<(), DatabaseError>;
    async fn get_package(&self, id: i64) -> Result<Option<TravelPackage>, DatabaseError>;
    async fn list_packages(&self, active_only: bool) -> Result<Vec<TravelPackage>, DatabaseError>;
    /// Inserts the booking unless it would push the package past `capacity`
    /// people on that date.
    async fn create_travel_booking(
        &self,
        booking: &TravelBooking,
        capacity: i64,
    ) -> Result<i64, DatabaseError>;
    async fn get_travel_booking(&self, id: i64) -> Result<Option<TravelBooking>, DatabaseError>;
    async fn list_travel_bookings(
        &self,
        customer_id: Option<i64>,
        package_id: Option<i64>,
    ) -> Result<Vec<TravelBooking>, DatabaseError>;
    async fn transition_travel_booking(
        &self,
        id: i64,
        from: TravelBookingStatus,
        to: TravelBookingStatus,
    ) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create_payment(&self, payment: &Payment) -> Result<i64, DatabaseError>;
    async fn get_payment(&self, id: i64) -> Result<Option<Payment>, DatabaseError>;
    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, DatabaseError>;
    async fn refund_payment(
        &self,
        id: i64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;
    async fn completed_total_for_booking(&self, booking_id: i64) -> Result<i64, DatabaseError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<i64, DatabaseError>;
    async fn update_user(&self, user: &User) -> Result<(), DatabaseError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;
    async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, DatabaseError>;
    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, DatabaseError>;
    async fn set_user_active(&self, id: i64, active: bool) -> Result<bool, DatabaseError>;
    async fn set_user_token(&self, id: i64, token: &str) -> Result<bool, DatabaseError>;

    async fn role_permissions(&self, role: Role) -> Result<BTreeSet<Permission>, DatabaseError>;
    async fn replace_role_permissions(
        &self,
        role: Role,
        permissions: &BTreeSet<Permission>,
    ) -> Result<(), DatabaseError>;
    async fn permission_overrides(
        &self,
        user_id: i64,
    ) -> Result<BTreeMap<Permission, bool>, DatabaseError>;
    async fn upsert_override(&self, entry: &PermissionOverride) -> Result<(), DatabaseError>;
    async fn delete_override(
        &self,
        user_id: i64,
        permission: Permission,
    ) -> Result<bool, DatabaseError>;
}
