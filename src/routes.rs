use crate::{
    api::attendance,
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            (60_000 / requests_per_min as u64).max(1)
        };
        let cfg = GovernorConfigBuilder::default()
            .milliseconds_per_request(per_ms)
            .burst_size(requests_per_min.max(1))
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("valid rate limiter settings");
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .wrap(login_limiter)
            .service(web::resource("/google/url").route(web::get().to(handlers::google_auth_url)))
            .service(
                web::resource("/google/callback").route(web::get().to(handlers::google_callback)),
            )
            .service(web::resource("/dev/users").route(web::get().to(handlers::dev_users)))
            .service(web::resource("/dev/login").route(web::post().to(handlers::dev_login)))
            .service(web::resource("/logout").route(web::post().to(handlers::logout))),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(protected_limiter) // rate limiting
            .service(handlers::me)
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(web::resource("").route(web::get().to(attendance::list_attendance)))
                    // /attendance/refresh
                    .service(
                        web::resource("/refresh")
                            .route(web::post().to(attendance::refresh_attendance)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ Google OAuth code  ─┐
//  └─ dev picker (dev)   ─┴─ roster eligibility → session_token
//
// API REQUEST
//  └─ Authorization: Bearer session_token → ViewerSession
//
// LOGOUT
//  └─ jti revoked until the token would have expired

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::roster_cache::{Roster, RosterStore, testing::StaticRoster};
    use crate::utils::session_revocation::RevokedSessions;
    use crate::utils::table::{parse_attendance, parse_staff};
    use actix_web::{App, http::StatusCode, test, web::Data};
    use serde_json::{Value, json};

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn roster() -> Roster {
        Roster {
            attendance: parse_attendance(&grid(&[
                &["社員番号", "名前", "ログインID", "総残業時間"],
                &["E1", "佐藤花子", "sato@example.com", "1:00:00"],
                &["E2", "伊藤健", "ito@example.com", "12:30:00"],
            ]))
            .unwrap(),
            staff: parse_staff(&grid(&[
                &["社員番号", "ログインID", "姓", "名", "権限", "第一承認者"],
                &["E1", "sato@example.com", "佐藤", "花子", "4. 承認者", ""],
                &["E2", "ito@example.com", "伊藤", "健", "5. 一般利用者", "sato@example.com"],
            ]))
            .unwrap(),
        }
    }

    fn peer() -> std::net::SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[actix_web::test]
    async fn dev_login_attendance_and_logout() {
        let config = Config::for_tests();
        let store = RosterStore::new(Arc::new(StaticRoster::new(roster())), 300);
        let app = test::init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .app_data(Data::new(store))
                .app_data(Data::new(RevokedSessions::new(3600)))
                .configure(|cfg| configure(cfg, config.clone())),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/dev/login")
            .peer_addr(peer())
            .set_json(json!({ "login_id": "sato@example.com" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["full_name"], "佐藤花子");
        let bearer = format!("Bearer {}", body["session_token"].as_str().unwrap());

        let req = test::TestRequest::get()
            .uri("/api/attendance")
            .peer_addr(peer())
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["label"], "承認対象スタッフ");
        assert_eq!(body["count"], 2);
        assert_eq!(body["rows"][0][0], "E1");
        assert_eq!(body["rows"][1][0], "E2");
        assert_eq!(body["columns"], json!(["社員番号", "名前", "総残業時間"]));

        let req = test::TestRequest::post()
            .uri("/auth/logout")
            .peer_addr(peer())
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri("/api/attendance")
            .peer_addr(peer())
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn protected_routes_need_a_session() {
        let config = Config::for_tests();
        let store = RosterStore::new(Arc::new(StaticRoster::new(roster())), 300);
        let app = test::init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .app_data(Data::new(store))
                .app_data(Data::new(RevokedSessions::new(3600)))
                .configure(|cfg| configure(cfg, config.clone())),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/attendance")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/auth/dev/login")
            .peer_addr(peer())
            .set_json(json!({ "login_id": "nobody@example.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
