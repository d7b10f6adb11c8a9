// SQLite schema. Dates are `Date` (YYYY-MM-DD text), timestamps are
// `TimestamptzSqlite` (UTC text); the DDL lives in manager.rs.

diesel::table! {
    room_types (id) {
        id -> BigInt,
        name -> Text,
        description -> Text,
        base_price_cents -> BigInt,
        capacity -> BigInt,
        created_at -> TimestamptzSqlite,
        updated_at -> TimestamptzSqlite,
    }
}

diesel::table! {
    rooms (id) {
        id -> BigInt,
        number -> Text,
        room_type_id -> BigInt,
        floor -> BigInt,
        status -> Text,
        created_at -> TimestamptzSqlite,
        updated_at -> TimestamptzSqlite,
    }
}

diesel::table! {
    amenities (id) {
        id -> BigInt,
        name -> Text,
        description -> Text,
        room_type_id -> Nullable<BigInt>,
        created_at -> TimestamptzSqlite,
    }
}

diesel::table! {
    customers (id) {
        id -> BigInt,
        user_id -> Nullable<BigInt>,
        full_name -> Text,
        email -> Text,
        phone -> Nullable<Text>,
        created_at -> TimestamptzSqlite,
        updated_at -> TimestamptzSqlite,
    }
}

diesel::table! {
    bookings (id) {
        id -> BigInt,
        customer_id -> BigInt,
        room_id -> BigInt,
        check_in_date -> Date,
        check_out_date -> Date,
        guests -> BigInt,
        total_price_cents -> BigInt,
        status -> Text,
        special_requests -> Nullable<Text>,
        created_at -> TimestamptzSqlite,
        updated_at -> TimestamptzSqlite,
    }
}

diesel::table! {
    stays (id) {
        id -> BigInt,
        booking_id -> BigInt,
        check_in_time -> Nullable<TimestamptzSqlite>,
        check_out_time -> Nullable<TimestamptzSqlite>,
        checked_in_by -> Nullable<BigInt>,
        checked_out_by -> Nullable<BigInt>,
        additional_charges_cents -> BigInt,
        charge_notes -> Text,
        late_fee_cents -> BigInt,
        final_total_cents -> Nullable<BigInt>,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    chat_messages (id) {
        id -> BigInt,
        customer_id -> BigInt,
        sender -> Text,
        staff_user_id -> Nullable<BigInt>,
        body -> Text,
        is_read -> Bool,
        created_at -> TimestamptzSqlite,
    }
}

diesel::table! {
    complaints (id) {
        id -> BigInt,
        customer_id -> BigInt,
        booking_id -> Nullable<BigInt>,
        subject -> Text,
        description -> Text,
        status -> Text,
        resolution -> Nullable<Text>,
        created_at -> TimestamptzSqlite,
        updated_at -> TimestamptzSqlite,
    }
}

diesel::table! {
    travel_packages (id) {
        id -> BigInt,
        name -> Text,
        destination -> Text,
        description -> Text,
        price_per_person_cents -> BigInt,
        duration_days -> BigInt,
        capacity -> BigInt,
        active -> Bool,
        created_at -> TimestamptzSqlite,
        updated_at -> TimestamptzSqlite,
    }
}

diesel::table! {
    travel_bookings (id) {
        id -> BigInt,
        package_id -> BigInt,
        customer_id -> BigInt,
        travel_date -> Date,
        people -> BigInt,
        total_cents -> BigInt,
        status -> Text,
        created_at -> TimestamptzSqlite,
        updated_at -> TimestamptzSqlite,
    }
}

diesel::table! {
    payments (id) {
        id -> BigInt,
        customer_id -> BigInt,
        booking_id -> Nullable<BigInt>,
        travel_booking_id -> Nullable<BigInt>,
        amount_cents -> BigInt,
        method -> Text,
        status -> Text,
        reference -> Text,
        refund_reason -> Nullable<Text>,
        created_at -> TimestamptzSqlite,
        updated_at -> TimestamptzSqlite,
    }
}

diesel::table! {
    users (id) {
        id -> BigInt,
        username -> Text,
        display_name -> Text,
        email -> Text,
        role -> Text,
        active -> Bool,
        api_token -> Text,
        created_at -> TimestamptzSqlite,
        updated_at -> TimestamptzSqlite,
    }
}

diesel::table! {
    role_permissions (role, permission) {
        role -> Text,
        permission -> Text,
    }
}

diesel::table! {
    permission_overrides (user_id, permission) {
        user_id -> BigInt,
        permission -> Text,
        granted -> Bool,
        updated_at -> TimestamptzSqlite,
    }
}

diesel::joinable!(rooms -> room_types (room_type_id));
diesel::joinable!(bookings -> rooms (room_id));
diesel::joinable!(stays -> bookings (booking_id));
diesel::joinable!(chat_messages -> customers (customer_id));

diesel::allow_tables_to_appear_in_same_query!(
    room_types,
    rooms,
    amenities,
    customers,
    bookings,
    stays,
    chat_messages,
    complaints,
    travel_packages,
    travel_bookings,
    payments,
    users,
    role_permissions,
    permission_overrides,
);
