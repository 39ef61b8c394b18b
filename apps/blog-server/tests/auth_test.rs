mod common;

use actix_web::http::StatusCode;
use actix_web::test;

use blog_server::middleware::auth::AUTH_COOKIE;
use common::{CSRF, PASSWORD, TestApp, body_text, csrf_cookie, location_of, response_cookie};

#[actix_rt::test]
async fn registration_logs_the_user_in() {
    let app = TestApp::new().await;
    let srv = init_app!(app.state);

    let req = test::TestRequest::post()
        .uri("/auth/registration/")
        .cookie(csrf_cookie())
        .set_form([
            ("csrf_token", CSRF),
            ("username", "newbie"),
            ("email", "newbie@example.com"),
            ("password1", PASSWORD),
            ("password2", PASSWORD),
        ])
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), "/profile/newbie/");

    let cookie = response_cookie(&res, AUTH_COOKIE).expect("auth cookie");
    assert_eq!(cookie.http_only(), Some(true));

    let user = app.state.users.find_by_username("newbie").await.unwrap().unwrap();
    assert_ne!(user.password_hash, PASSWORD);

    // The cookie is a working session.
    let req = test::TestRequest::get()
        .uri("/posts/create/")
        .cookie(csrf_cookie())
        .cookie(cookie)
        .to_request();
    assert_eq!(test::call_service(&srv, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn non_ascii_username_gets_an_encoded_profile_link() {
    let app = TestApp::new().await;
    let srv = init_app!(app.state);

    let req = test::TestRequest::post()
        .uri("/auth/registration/")
        .cookie(csrf_cookie())
        .set_form([
            ("csrf_token", CSRF),
            ("username", "Лев"),
            ("email", "lev@example.com"),
            ("password1", PASSWORD),
            ("password2", PASSWORD),
        ])
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let location = location_of(&res);
    assert_eq!(location, "/profile/%D0%9B%D0%B5%D0%B2/");

    let req = test::TestRequest::get().uri(&location).to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Лев"));
}

#[actix_rt::test]
async fn registration_rejects_taken_names_and_mismatched_passwords() {
    let app = TestApp::new().await;
    app.user("taken").await;
    let srv = init_app!(app.state);

    let req = test::TestRequest::post()
        .uri("/auth/registration/")
        .cookie(csrf_cookie())
        .set_form([
            ("csrf_token", CSRF),
            ("username", "taken"),
            ("email", ""),
            ("password1", PASSWORD),
            ("password2", "something-else"),
        ])
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_text(res).await;
    assert!(body.contains("A user with that username already exists."));
    assert!(body.contains("match."));
}

#[actix_rt::test]
async fn login_honours_local_next_only() {
    let app = TestApp::new().await;
    app.user_with_password("leo").await;
    let srv = init_app!(app.state);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .cookie(csrf_cookie())
        .set_form([
            ("csrf_token", CSRF),
            ("username", "leo"),
            ("password", PASSWORD),
            ("next", "/posts/create/"),
        ])
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), "/posts/create/");
    assert!(response_cookie(&res, AUTH_COOKIE).is_some());

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .cookie(csrf_cookie())
        .set_form([
            ("csrf_token", CSRF),
            ("username", "leo"),
            ("password", PASSWORD),
            ("next", "//evil.example/"),
        ])
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), "/");
}

#[actix_rt::test]
async fn wrong_password_shows_form_error() {
    let app = TestApp::new().await;
    app.user_with_password("leo").await;
    let srv = init_app!(app.state);

    for (username, password) in [("leo", "wrong-password"), ("ghost", PASSWORD)] {
        let req = test::TestRequest::post()
            .uri("/auth/login/")
            .cookie(csrf_cookie())
            .set_form([
                ("csrf_token", CSRF),
                ("username", username),
                ("password", password),
            ])
            .to_request();
        let res = test::call_service(&srv, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(response_cookie(&res, AUTH_COOKIE).is_none());
        assert!(
            body_text(res)
                .await
                .contains("Please enter a correct username and password.")
        );
    }
}

#[actix_rt::test]
async fn login_page_keeps_next() {
    let app = TestApp::new().await;
    let srv = init_app!(app.state);

    let res = test::call_service(
        &srv,
        test::TestRequest::get()
            .uri("/auth/login/?next=%2Fprofile%2Fedit_profile%2F")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    // Slashes are HTML-escaped inside the attribute.
    assert!(body_text(res).await.contains("name=\"next\""));
}

#[actix_rt::test]
async fn logout_is_post_only() {
    let app = TestApp::new().await;
    let user = app.user("leo").await;
    let srv = init_app!(app.state);

    let req = test::TestRequest::get()
        .uri("/auth/logout/")
        .cookie(app.auth_cookie(&user))
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(response_cookie(&res, AUTH_COOKIE).is_none());

    let req = test::TestRequest::post()
        .uri("/auth/logout/")
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&user))
        .set_form([("csrf_token", CSRF)])
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let removal = response_cookie(&res, AUTH_COOKIE).expect("removal cookie");
    assert_eq!(removal.value(), "");
    let body = body_text(res).await;
    assert!(body.contains("You have logged out"));
    // Rendered as a guest.
    assert!(body.contains("Log in"));
}

#[actix_rt::test]
async fn logout_needs_the_csrf_token() {
    let app = TestApp::new().await;
    let user = app.user("leo").await;
    let srv = init_app!(app.state);

    let req = test::TestRequest::post()
        .uri("/auth/logout/")
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&user))
        .set_form([("csrf_token", "forged")])
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(response_cookie(&res, AUTH_COOKIE).is_none());
}

#[actix_rt::test]
async fn bearer_header_authenticates_too() {
    let app = TestApp::new().await;
    let user = app.user("leo").await;
    let token = app.auth_cookie(&user).value().to_string();
    let srv = init_app!(app.state);

    let req = test::TestRequest::get()
        .uri("/posts/create/")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    assert_eq!(test::call_service(&srv, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/posts/create/")
        .insert_header(("Authorization", "Bearer garbage"))
        .to_request();
    assert_eq!(test::call_service(&srv, req).await.status(), StatusCode::FOUND);
}

#[actix_rt::test]
async fn edit_profile_renames_and_reissues_cookie() {
    let app = TestApp::new().await;
    let user = app.user("leo").await;
    app.user("anna").await;
    let srv = init_app!(app.state);

    let req = test::TestRequest::get()
        .uri("/profile/edit_profile/")
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&user))
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("leo@example.com"));

    let req = test::TestRequest::post()
        .uri("/profile/edit_profile/")
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&user))
        .set_form([
            ("csrf_token", CSRF),
            ("username", "anna"),
            ("first_name", ""),
            ("last_name", ""),
            ("email", ""),
        ])
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("A user with that username already exists."));

    let req = test::TestRequest::post()
        .uri("/profile/edit_profile/")
        .cookie(csrf_cookie())
        .cookie(app.auth_cookie(&user))
        .set_form([
            ("csrf_token", CSRF),
            ("username", "tolstoy"),
            ("first_name", "Leo"),
            ("last_name", "Tolstoy"),
            ("email", "leo@example.com"),
        ])
        .to_request();
    let res = test::call_service(&srv, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location_of(&res), "/profile/tolstoy/");
    assert!(response_cookie(&res, AUTH_COOKIE).is_some());

    let stored = app.state.users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "tolstoy");
    assert_eq!(stored.display_name(), "Leo Tolstoy");

    let res = test::call_service(
        &srv,
        test::TestRequest::get().uri("/profile/tolstoy/").to_request(),
    )
    .await;
    assert!(body_text(res).await.contains("Leo Tolstoy"));
}

#[actix_rt::test]
async fn edit_profile_requires_login() {
    let app = TestApp::new().await;
    let srv = init_app!(app.state);
    let res = test::call_service(
        &srv,
        test::TestRequest::get().uri("/profile/edit_profile/").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        location_of(&res),
        "/auth/login/?next=%2Fprofile%2Fedit_profile%2F"
    );
}
