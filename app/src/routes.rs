//! Application routes
//!
//! Everything except the login screen sits behind `AuthMiddleware`.

use campus::{delete, get, group, post, put, routes};

use crate::controllers::{
    academic_sessions, auth, class_sections, dashboard, hostels, notices, notifications, payrolls, promotions,
    reports, staff, students, terms, timetables, transport_routes, vehicles,
};
use crate::middleware::AuthMiddleware;

routes! {
    get!("/login", auth::create).name("login"),
    post!("/login", auth::login).name("login.store"),

    group!("/", {
        get!("/", dashboard::index).name("dashboard"),
        post!("/logout", auth::logout).name("logout"),
        get!("/me", auth::me).name("me"),
        get!("/notifications", notifications::index).name("notifications.index"),
        post!("/notifications/{id}/read", notifications::mark_read).name("notifications.read"),

        get!("/academic-sessions", academic_sessions::index).name("academic-sessions.index"),
        post!("/academic-sessions", academic_sessions::store).name("academic-sessions.store"),
        get!("/academic-sessions/{id}", academic_sessions::show).name("academic-sessions.show"),
        put!("/academic-sessions/{id}", academic_sessions::update).name("academic-sessions.update"),
        delete!("/academic-sessions/{id}", academic_sessions::destroy).name("academic-sessions.destroy"),
        post!("/academic-sessions/{id}/restore", academic_sessions::restore).name("academic-sessions.restore"),
        delete!("/academic-sessions/{id}/force", academic_sessions::force_delete).name("academic-sessions.force-delete"),
        post!("/academic-sessions/{id}/current", academic_sessions::set_current).name("academic-sessions.current"),

        get!("/terms", terms::index).name("terms.index"),
        post!("/terms", terms::store).name("terms.store"),
        get!("/terms/{id}", terms::show).name("terms.show"),
        put!("/terms/{id}", terms::update).name("terms.update"),
        delete!("/terms/{id}", terms::destroy).name("terms.destroy"),
        post!("/terms/{id}/restore", terms::restore).name("terms.restore"),
        delete!("/terms/{id}/force", terms::force_delete).name("terms.force-delete"),
        post!("/terms/{id}/current", terms::set_current).name("terms.current"),

        get!("/timetables", timetables::index).name("timetables.index"),
        post!("/timetables", timetables::store).name("timetables.store"),
        get!("/timetables/{id}", timetables::show).name("timetables.show"),
        put!("/timetables/{id}", timetables::update).name("timetables.update"),
        delete!("/timetables/{id}", timetables::destroy).name("timetables.destroy"),
        post!("/timetables/{id}/restore", timetables::restore).name("timetables.restore"),
        delete!("/timetables/{id}/force", timetables::force_delete).name("timetables.force-delete"),
        post!("/timetables/{id}/activate", timetables::activate).name("timetables.activate"),

        get!("/class-sections", class_sections::index).name("class-sections.index"),
        post!("/class-sections", class_sections::store).name("class-sections.store"),
        get!("/class-sections/{id}", class_sections::show).name("class-sections.show"),
        put!("/class-sections/{id}", class_sections::update).name("class-sections.update"),
        delete!("/class-sections/{id}", class_sections::destroy).name("class-sections.destroy"),
        post!("/class-sections/{id}/restore", class_sections::restore).name("class-sections.restore"),
        delete!("/class-sections/{id}/force", class_sections::force_delete).name("class-sections.force-delete"),

        get!("/students", students::index).name("students.index"),
        post!("/students", students::store).name("students.store"),
        get!("/students/{id}", students::show).name("students.show"),
        put!("/students/{id}", students::update).name("students.update"),
        delete!("/students/{id}", students::destroy).name("students.destroy"),
        post!("/students/{id}/restore", students::restore).name("students.restore"),
        delete!("/students/{id}/force", students::force_delete).name("students.force-delete"),

        get!("/staff", staff::index).name("staff.index"),
        post!("/staff", staff::store).name("staff.store"),
        get!("/staff/{id}", staff::show).name("staff.show"),
        put!("/staff/{id}", staff::update).name("staff.update"),
        delete!("/staff/{id}", staff::destroy).name("staff.destroy"),
        post!("/staff/{id}/restore", staff::restore).name("staff.restore"),
        delete!("/staff/{id}/force", staff::force_delete).name("staff.force-delete"),

        get!("/payrolls", payrolls::index).name("payrolls.index"),
        post!("/payrolls", payrolls::store).name("payrolls.store"),
        get!("/payrolls/{id}", payrolls::show).name("payrolls.show"),
        put!("/payrolls/{id}", payrolls::update).name("payrolls.update"),
        delete!("/payrolls/{id}", payrolls::destroy).name("payrolls.destroy"),
        post!("/payrolls/{id}/restore", payrolls::restore).name("payrolls.restore"),
        delete!("/payrolls/{id}/force", payrolls::force_delete).name("payrolls.force-delete"),
        post!("/payrolls/{id}/paid", payrolls::mark_paid).name("payrolls.paid"),

        get!("/vehicles", vehicles::index).name("vehicles.index"),
        post!("/vehicles", vehicles::store).name("vehicles.store"),
        get!("/vehicles/{id}", vehicles::show).name("vehicles.show"),
        put!("/vehicles/{id}", vehicles::update).name("vehicles.update"),
        delete!("/vehicles/{id}", vehicles::destroy).name("vehicles.destroy"),
        post!("/vehicles/{id}/restore", vehicles::restore).name("vehicles.restore"),
        delete!("/vehicles/{id}/force", vehicles::force_delete).name("vehicles.force-delete"),
        post!("/vehicles/{id}/driver", vehicles::assign_driver).name("vehicles.driver.assign"),
        delete!("/vehicles/{id}/driver", vehicles::unassign_driver).name("vehicles.driver.unassign"),

        get!("/transport-routes", transport_routes::index).name("transport-routes.index"),
        post!("/transport-routes", transport_routes::store).name("transport-routes.store"),
        get!("/transport-routes/{id}", transport_routes::show).name("transport-routes.show"),
        put!("/transport-routes/{id}", transport_routes::update).name("transport-routes.update"),
        delete!("/transport-routes/{id}", transport_routes::destroy).name("transport-routes.destroy"),
        post!("/transport-routes/{id}/restore", transport_routes::restore).name("transport-routes.restore"),
        delete!("/transport-routes/{id}/force", transport_routes::force_delete).name("transport-routes.force-delete"),

        get!("/hostels", hostels::index).name("hostels.index"),
        post!("/hostels", hostels::store).name("hostels.store"),
        get!("/hostels/{id}", hostels::show).name("hostels.show"),
        put!("/hostels/{id}", hostels::update).name("hostels.update"),
        delete!("/hostels/{id}", hostels::destroy).name("hostels.destroy"),
        post!("/hostels/{id}/restore", hostels::restore).name("hostels.restore"),
        delete!("/hostels/{id}/force", hostels::force_delete).name("hostels.force-delete"),

        get!("/notices", notices::index).name("notices.index"),
        post!("/notices", notices::store).name("notices.store"),
        get!("/notices/{id}", notices::show).name("notices.show"),
        put!("/notices/{id}", notices::update).name("notices.update"),
        delete!("/notices/{id}", notices::destroy).name("notices.destroy"),
        post!("/notices/{id}/restore", notices::restore).name("notices.restore"),
        delete!("/notices/{id}/force", notices::force_delete).name("notices.force-delete"),
        post!("/notices/{id}/publish", notices::publish).name("notices.publish"),

        get!("/promotions", promotions::index).name("promotions.index"),
        post!("/promotions", promotions::store).name("promotions.store"),
        get!("/promotions/{id}", promotions::show).name("promotions.show"),
        post!("/promotions/{id}/approve", promotions::approve).name("promotions.approve"),
        post!("/promotions/{id}/reject", promotions::reject).name("promotions.reject"),
        post!("/promotions/{id}/execute", promotions::execute).name("promotions.execute"),
        get!("/promotions/{id}/status", promotions::status).name("promotions.status"),

        get!("/reports/payroll", reports::payroll).name("reports.payroll"),
        get!("/reports/payroll/export", reports::export_payroll).name("reports.payroll.export"),
    }).middleware(AuthMiddleware),
}
