use crate::{
    api::{
        attendance, class_sessions, coaches, content, courses, employee_attendance, employee_sessions,
        enrolments, expenses, gallery, health, members, payments, reports, schedules, users,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::anyhow;
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min} per minute"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

/// Per-route limiters. Built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct Limiters {
    login: Limiter,
    refresh: Limiter,
    scan: Limiter,
    protected: Limiter,
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            scan: build_limiter(config.rate_scan_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    cfg.app_data(web::PayloadConfig::new(config.max_upload_bytes))
        .route("/healthz", web::get().to(health::healthz));

    cfg.service(
        web::scope(&config.api_prefix)
            // Public routes
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/login")
                            .wrap(limiters.login.clone())
                            .route(web::post().to(handlers::login)),
                    )
                    .service(
                        web::resource("/refresh")
                            .wrap(limiters.refresh.clone())
                            .route(web::post().to(handlers::refresh_token)),
                    )
                    .service(
                        web::resource("/logout")
                            .wrap(limiters.login.clone())
                            .route(web::post().to(handlers::logout)),
                    ),
            )
            // reads are public, writes authenticate through the AuthUser extractor
            .service(
                web::resource("/content")
                    .route(web::get().to(content::show_content))
                    .route(web::put().to(content::update_content)),
            )
            .service(
                web::resource("/content/images/{slot}")
                    .route(web::put().to(content::update_content_image))
                    .route(web::delete().to(content::delete_content_image)),
            )
            .service(
                web::scope("/gallery")
                    .service(
                        web::resource("")
                            .route(web::get().to(gallery::list_gallery))
                            .route(web::post().to(gallery::upload_gallery_image)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(gallery::get_gallery_image))
                            .route(web::put().to(gallery::update_gallery_image))
                            .route(web::delete().to(gallery::delete_gallery_image)),
                    ),
            )
            // Protected routes
            .service(
                web::scope("")
                    .wrap(from_fn(auth_middleware))
                    .wrap(limiters.protected.clone())
                    .service(
                        web::scope("/users")
                            .service(
                                web::resource("")
                                    .route(web::get().to(users::list_users))
                                    .route(web::post().to(users::create_user)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(users::get_user))
                                    .route(web::put().to(users::update_user))
                                    .route(web::delete().to(users::delete_user)),
                            )
                            .service(
                                web::resource("/{id}/qr-code").route(web::post().to(users::regenerate_qr_code)),
                            ),
                    )
                    .service(
                        web::scope("/members")
                            .service(
                                web::resource("")
                                    .route(web::get().to(members::list_members))
                                    .route(web::post().to(members::create_member)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(members::get_member))
                                    .route(web::put().to(members::update_member))
                                    .route(web::delete().to(members::delete_member)),
                            ),
                    )
                    .service(
                        web::scope("/coaches")
                            .service(
                                web::resource("")
                                    .route(web::get().to(coaches::list_coaches))
                                    .route(web::post().to(coaches::create_coach)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(coaches::get_coach))
                                    .route(web::put().to(coaches::update_coach))
                                    .route(web::delete().to(coaches::delete_coach)),
                            )
                            .service(
                                web::resource("/{id}/photo").route(web::put().to(coaches::upload_coach_photo)),
                            ),
                    )
                    .service(
                        web::scope("/courses")
                            .service(
                                web::resource("")
                                    .route(web::get().to(courses::list_courses))
                                    .route(web::post().to(courses::create_course)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(courses::get_course))
                                    .route(web::put().to(courses::update_course))
                                    .route(web::delete().to(courses::delete_course)),
                            ),
                    )
                    .service(
                        web::scope("/class-sessions")
                            .service(
                                web::resource("")
                                    .route(web::get().to(class_sessions::list_class_sessions))
                                    .route(web::post().to(class_sessions::create_class_session)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(class_sessions::get_class_session))
                                    .route(web::put().to(class_sessions::update_class_session))
                                    .route(web::delete().to(class_sessions::delete_class_session)),
                            ),
                    )
                    .service(
                        web::scope("/schedules")
                            .service(
                                web::resource("")
                                    .route(web::get().to(schedules::list_schedules))
                                    .route(web::post().to(schedules::create_schedule)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(schedules::get_schedule))
                                    .route(web::put().to(schedules::update_schedule))
                                    .route(web::delete().to(schedules::delete_schedule)),
                            )
                            .service(
                                web::resource("/{id}/status")
                                    .route(web::put().to(schedules::update_schedule_status)),
                            ),
                    )
                    .service(
                        web::scope("/enrolments")
                            .service(
                                web::resource("")
                                    .route(web::get().to(enrolments::list_enrolments))
                                    .route(web::post().to(enrolments::create_enrolment)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(enrolments::get_enrolment))
                                    .route(web::put().to(enrolments::update_enrolment))
                                    .route(web::delete().to(enrolments::delete_enrolment)),
                            )
                            .service(
                                web::resource("/{id}/status")
                                    .route(web::put().to(enrolments::update_enrolment_status)),
                            ),
                    )
                    .service(
                        web::scope("/payments")
                            .service(
                                web::resource("")
                                    .route(web::get().to(payments::list_payments))
                                    .route(web::post().to(payments::create_payment)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(payments::get_payment))
                                    .route(web::put().to(payments::update_payment))
                                    .route(web::delete().to(payments::delete_payment)),
                            ),
                    )
                    .service(
                        web::scope("/expenses")
                            .service(
                                web::resource("")
                                    .route(web::get().to(expenses::list_expenses))
                                    .route(web::post().to(expenses::create_expense)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(expenses::get_expense))
                                    .route(web::put().to(expenses::update_expense))
                                    .route(web::delete().to(expenses::delete_expense)),
                            ),
                    )
                    .service(
                        web::scope("/attendance")
                            .service(
                                web::resource("/scan")
                                    .wrap(limiters.scan.clone())
                                    .route(web::post().to(attendance::scan)),
                            )
                            .service(web::resource("/calendar").route(web::get().to(attendance::calendar)))
                            .service(web::resource("/history").route(web::get().to(attendance::history)))
                            .service(web::resource("").route(web::get().to(attendance::list_attendance)))
                            .service(
                                web::resource("/{id}").route(web::delete().to(attendance::delete_attendance)),
                            ),
                    )
                    .service(
                        web::scope("/employee-sessions")
                            .service(
                                web::resource("")
                                    .route(web::get().to(employee_sessions::list_employee_sessions))
                                    .route(web::post().to(employee_sessions::create_employee_session)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(employee_sessions::get_employee_session))
                                    .route(web::put().to(employee_sessions::update_employee_session))
                                    .route(web::delete().to(employee_sessions::delete_employee_session)),
                            ),
                    )
                    .service(
                        web::scope("/employee-attendance")
                            .service(
                                web::resource("/scan")
                                    .wrap(limiters.scan.clone())
                                    .route(web::post().to(employee_attendance::scan_employee)),
                            )
                            .service(
                                web::resource("")
                                    .route(web::get().to(employee_attendance::list_employee_attendance)),
                            ),
                    )
                    .service(
                        web::scope("/reports")
                            .service(web::resource("/finance").route(web::get().to(reports::finance)))
                            .service(web::resource("/finance.csv").route(web::get().to(reports::finance_export)))
                            .service(web::resource("/members.csv").route(web::get().to(reports::members_export))),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ rotates both tokens

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_accepts_extreme_rates() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(1).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }
}
