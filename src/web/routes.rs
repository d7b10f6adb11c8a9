use salvo::affix_state;
use salvo::prelude::*;

use crate::web::handlers::{
    bookings, chat, complaints, customers, dashboard, front_desk, health, payments, rooms, travel,
    users,
};
use crate::web::middleware::auth::require_token;
use crate::web::middleware::request_log::request_log;
use crate::web::WebState;

pub fn create_router(state: WebState) -> Router {
    Router::new()
        .hoop(affix_state::inject(state))
        .hoop(request_log)
        .push(Router::with_path("health").get(health::health_check))
        .push(Router::with_path("metrics").get(health::metrics))
        .push(
            Router::new()
                .hoop(require_token)
                .push(Router::with_path("me").get(health::me))
                .push(room_routes())
                .push(
                    Router::with_path("customers")
                        .get(customers::list_customers)
                        .post(customers::create_customer)
                        .push(
                            Router::with_path("{id}")
                                .get(customers::get_customer)
                                .put(customers::update_customer),
                        ),
                )
                .push(booking_routes())
                .push(front_desk_routes())
                .push(
                    Router::with_path("chat/conversations")
                        .get(chat::conversations)
                        .push(
                            Router::with_path("{customer_id}/messages")
                                .get(chat::messages)
                                .post(chat::post_message),
                        )
                        .push(Router::with_path("{customer_id}/read").post(chat::mark_read)),
                )
                .push(
                    Router::with_path("complaints")
                        .get(complaints::list_complaints)
                        .post(complaints::file_complaint)
                        .push(Router::with_path("{id}").get(complaints::get_complaint))
                        .push(Router::with_path("{id}/status").put(complaints::change_status)),
                )
                .push(travel_routes())
                .push(
                    Router::with_path("payments")
                        .get(payments::list_payments)
                        .post(payments::record_payment)
                        .push(Router::with_path("summary").get(payments::payment_summary))
                        .push(Router::with_path("{id}/refund").post(payments::refund_payment)),
                )
                .push(user_routes())
                .push(
                    Router::with_path("dashboard")
                        .push(Router::with_path("summary").get(dashboard::summary))
                        .push(Router::with_path("revenue").get(dashboard::revenue)),
                ),
        )
}

fn room_routes() -> Router {
    Router::new()
        .push(
            Router::with_path("room-types")
                .get(rooms::list_room_types)
                .post(rooms::create_room_type)
                .push(
                    Router::with_path("{id}")
                        .get(rooms::get_room_type)
                        .put(rooms::update_room_type),
                ),
        )
        .push(
            Router::with_path("rooms")
                .get(rooms::list_rooms)
                .post(rooms::create_room)
                .push(Router::with_path("available").get(rooms::available_rooms))
                .push(
                    Router::with_path("{id}")
                        .get(rooms::get_room)
                        .put(rooms::update_room),
                )
                .push(Router::with_path("{id}/status").put(rooms::set_room_status)),
        )
        .push(
            Router::with_path("amenities")
                .get(rooms::list_amenities)
                .post(rooms::create_amenity)
                .push(
                    Router::with_path("{id}")
                        .put(rooms::update_amenity)
                        .delete(rooms::delete_amenity),
                ),
        )
}

fn booking_routes() -> Router {
    Router::with_path("bookings")
        .get(bookings::list_bookings)
        .post(bookings::create_booking)
        .push(Router::with_path("{id}").get(bookings::get_booking))
        .push(
            Router::with_path("{id}/cancellation")
                .post(bookings::request_cancellation)
                .push(Router::with_path("resolve").post(bookings::resolve_cancellation)),
        )
        .push(Router::with_path("{id}/cancel").post(bookings::cancel_booking))
        .push(Router::with_path("{id}/balance").get(bookings::booking_balance))
}

fn front_desk_routes() -> Router {
    Router::with_path("front-desk")
        .push(
            Router::with_path("check-ins")
                .get(front_desk::check_in_list)
                .push(Router::with_path("{booking_id}").post(front_desk::check_in)),
        )
        .push(Router::with_path("stays/{booking_id}/charges").post(front_desk::add_charge))
        .push(
            Router::with_path("check-outs")
                .get(front_desk::check_out_list)
                .push(
                    Router::with_path("{booking_id}")
                        .get(front_desk::check_out_quote)
                        .post(front_desk::check_out),
                ),
        )
}

fn travel_routes() -> Router {
    Router::with_path("travel")
        .push(
            Router::with_path("packages")
                .get(travel::list_packages)
                .post(travel::create_package)
                .push(
                    Router::with_path("{id}")
                        .get(travel::get_package)
                        .put(travel::update_package)
                        .delete(travel::deactivate_package),
                ),
        )
        .push(
            Router::with_path("bookings")
                .get(travel::list_travel_bookings)
                .post(travel::book_package)
                .push(Router::with_path("{id}/status").put(travel::change_travel_status)),
        )
}

fn user_routes() -> Router {
    Router::new()
        .push(
            Router::with_path("users")
                .get(users::list_users)
                .post(users::create_user)
                .push(
                    Router::with_path("{id}")
                        .get(users::get_user)
                        .put(users::update_user),
                )
                .push(Router::with_path("{id}/deactivate").post(users::deactivate_user))
                .push(Router::with_path("{id}/token").post(users::rotate_token))
                .push(
                    Router::with_path("{id}/permissions")
                        .get(users::effective_permissions)
                        .push(
                            Router::with_path("{permission}")
                                .put(users::set_override)
                                .delete(users::clear_override),
                        ),
                ),
        )
        .push(Router::with_path("roles").get(users::list_roles))
        .push(Router::with_path("roles/{role}/permissions").put(users::set_role_permissions))
}
