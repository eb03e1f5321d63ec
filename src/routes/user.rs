//! Account routes
//!
//! - POST /api/user/signup - Register and start a session
//! - POST /api/user/signin - Sign in with email and password
//! - GET /api/user/me - Current user
//! - PUT /api/user/password - Change password
//! - DELETE /api/user/me - Delete account
//! - POST /api/user/profile-photo - Set profile photo URL
//! - POST /api/user/logout - Clear the session cookie

use actix_web::{web, HttpResponse};
use tracing::{info, warn};

use crate::auth::{
    create_auth_cookie, create_logout_cookie, generate_token, Auth, AuthConfig, AuthError,
    PlainPassword,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    ApiError, MessageResponse, NewUser, ProfilePhotoRequest, SigninRequest, SignupRequest,
    UpdatePasswordRequest, UserResponse,
};
use crate::routes::AppState;

const USERNAME_MIN_CHARS: usize = 3;
const PASSWORD_MIN_CHARS: usize = 8;
const USER_NOT_FOUND: &str = "User not found";

/// Basic email shape check: one `@`, non-empty local part, dotted domain
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return false;
    }

    domain.contains('.') && domain.split('.').all(|part| !part.is_empty())
}

fn check_password(password: &PlainPassword) -> AppResult<()> {
    if password.len() < PASSWORD_MIN_CHARS {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_CHARS
        )));
    }
    Ok(())
}

/// Validate a signup body into the store's input type
fn validate_signup(body: &SignupRequest) -> AppResult<NewUser> {
    let username = body.username.trim();
    if username.chars().count() < USERNAME_MIN_CHARS {
        return Err(AppError::validation(format!(
            "Username must be at least {} characters",
            USERNAME_MIN_CHARS
        )));
    }

    let email = body.email.trim();
    if !is_valid_email(email) {
        return Err(AppError::validation("Invalid email format"));
    }

    let password = PlainPassword::new(body.password.as_str());
    check_password(&password)?;

    Ok(NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password,
    })
}

/// POST /api/user/signup - Register a new user
///
/// # Request Body
/// - username: at least 3 characters after trimming
/// - email: valid address, unique
/// - password: at least 8 characters
///
/// On success the session cookie is set and the new user is returned.
#[utoipa::path(
    post,
    path = "/api/user/signup",
    tag = "user",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "User created and signed in", body = UserResponse),
        (status = 400, description = "Invalid signup data", body = ApiError),
        (status = 409, description = "Username or email already exists", body = ApiError)
    )
)]
pub async fn signup(
    data: web::Data<AppState>,
    config: web::Data<AuthConfig>,
    body: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    let new_user = validate_signup(&body)?;
    let user = data.users.create_user(new_user).await?;
    info!("User registered: {}", user.email);

    let token = generate_token(&user, &config.jwt_secret)?;

    Ok(HttpResponse::Ok()
        .cookie(create_auth_cookie(&token, config.cookie_secure))
        .json(UserResponse {
            message: "User has been successfully created".to_string(),
            user,
        }))
}

/// POST /api/user/signin - Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/user/signin",
    tag = "user",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in", body = UserResponse),
        (status = 400, description = "Missing email or password", body = ApiError),
        (status = 401, description = "Wrong password", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    )
)]
pub async fn signin(
    data: web::Data<AppState>,
    config: web::Data<AuthConfig>,
    body: web::Json<SigninRequest>,
) -> AppResult<HttpResponse> {
    let email = body.email.trim();
    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }

    let user = data
        .users
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

    if !PlainPassword::new(body.password.as_str()).matches(&user.password)? {
        warn!("Failed sign in for {}", user.email);
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = generate_token(&user, &config.jwt_secret)?;
    info!("User signed in: {}", user.email);

    Ok(HttpResponse::Ok()
        .cookie(create_auth_cookie(&token, config.cookie_secure))
        .json(UserResponse {
            message: "User is Authenticated".to_string(),
            user,
        }))
}

/// GET /api/user/me - Get the signed-in user
#[utoipa::path(
    get,
    path = "/api/user/me",
    tag = "user",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 404, description = "User no longer exists", body = ApiError)
    )
)]
pub async fn get_me(data: web::Data<AppState>, auth: Auth) -> AppResult<HttpResponse> {
    let user = data
        .users
        .find_user_by_id(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

    Ok(HttpResponse::Ok().json(UserResponse {
        message: "User data fetched successfully".to_string(),
        user,
    }))
}

/// PUT /api/user/password - Change password
///
/// The old password must match the stored one.
#[utoipa::path(
    put,
    path = "/api/user/password",
    tag = "user",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Incorrect old password or weak new password", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 404, description = "User no longer exists", body = ApiError)
    )
)]
pub async fn update_password(
    data: web::Data<AppState>,
    auth: Auth,
    body: web::Json<UpdatePasswordRequest>,
) -> AppResult<HttpResponse> {
    let new_password = PlainPassword::new(body.new_password.as_str());
    check_password(&new_password)?;

    let user = data
        .users
        .find_user_by_id(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

    if !PlainPassword::new(body.old_password.as_str()).matches(&user.password)? {
        return Err(AppError::validation("Incorrect old password"));
    }

    if !data.users.set_password(&user.id, new_password).await? {
        return Err(AppError::not_found(USER_NOT_FOUND));
    }
    info!("Password updated for {}", user.email);

    Ok(HttpResponse::Ok().json(MessageResponse::new("Password updated successfully")))
}

/// DELETE /api/user/me - Delete the signed-in account and end the session
#[utoipa::path(
    delete,
    path = "/api/user/me",
    tag = "user",
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 404, description = "User no longer exists", body = ApiError)
    )
)]
pub async fn delete_me(
    data: web::Data<AppState>,
    config: web::Data<AuthConfig>,
    auth: Auth,
) -> AppResult<HttpResponse> {
    if !data.users.delete_user(&auth.user_id).await? {
        return Err(AppError::not_found(USER_NOT_FOUND));
    }
    info!("User account deleted: {}", auth.email);

    Ok(HttpResponse::Ok()
        .cookie(create_logout_cookie(config.cookie_secure))
        .json(MessageResponse::new("User account deleted successfully")))
}

/// POST /api/user/profile-photo - Set the profile photo URL
///
/// The image itself is uploaded elsewhere; only its http(s) URL is stored.
#[utoipa::path(
    post,
    path = "/api/user/profile-photo",
    tag = "user",
    request_body = ProfilePhotoRequest,
    responses(
        (status = 200, description = "Profile photo updated", body = UserResponse),
        (status = 400, description = "Not an http(s) URL", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError)
    )
)]
pub async fn update_profile_photo(
    data: web::Data<AppState>,
    auth: Auth,
    body: web::Json<ProfilePhotoRequest>,
) -> AppResult<HttpResponse> {
    let url = body.profile_photo.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::validation("Profile photo must be an http(s) URL"));
    }

    let user = data
        .users
        .set_profile_photo(&auth.user_id, url)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

    Ok(HttpResponse::Ok().json(UserResponse {
        message: "Profile photo updated successfully".to_string(),
        user,
    }))
}

/// POST /api/user/logout - Clear the session cookie
///
/// Tokens are stateless, so a copied token stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/user/logout",
    tag = "user",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    )
)]
pub async fn logout(config: web::Data<AuthConfig>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(create_logout_cookie(config.cookie_secure))
        .json(MessageResponse::new("Logged out successfully"))
}

/// Configure account routes
pub fn configure_user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user")
            .route("/signup", web::post().to(signup))
            .route("/signin", web::post().to(signin))
            .route("/me", web::get().to(get_me))
            .route("/me", web::delete().to(delete_me))
            .route("/password", web::put().to(update_password))
            .route("/profile-photo", web::post().to(update_profile_photo))
            .route("/logout", web::post().to(logout)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AUTH_COOKIE_NAME;
    use crate::db::UserStore;
    use crate::routes::configure_routes;
    use crate::routes::test_support::{auth_config, bearer, Fakes};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::json;

    macro_rules! app {
        ($fakes:expr) => {
            test::init_service(
                App::new()
                    .app_data($fakes.state())
                    .app_data(auth_config())
                    .configure(configure_routes),
            )
            .await
        };
    }

    fn signup_body() -> serde_json::Value {
        json!({
            "username": "  cinephile ",
            "email": "cinephile@example.com",
            "password": "password123"
        })
    }

    #[::core::prelude::v1::test]
    fn test_is_valid_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@example..com"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email("us er@example.com"));
    }

    #[::core::prelude::v1::test]
    fn test_validate_signup() {
        let ok = validate_signup(&SignupRequest {
            username: " bob ".to_string(),
            email: "bob@example.com".to_string(),
            password: "longenough".to_string(),
        })
        .unwrap();
        assert_eq!(ok.username, "bob");

        let short_name = SignupRequest {
            username: " ab ".to_string(),
            email: "ab@example.com".to_string(),
            password: "longenough".to_string(),
        };
        assert!(matches!(validate_signup(&short_name), Err(AppError::Validation(_))));

        let short_password = SignupRequest {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "short".to_string(),
        };
        assert_eq!(
            validate_signup(&short_password).unwrap_err().user_message(),
            "Password must be at least 8 characters"
        );
    }

    #[actix_rt::test]
    async fn test_signup_sets_cookie_and_hides_password() {
        let fakes = Fakes::new();
        let app = app!(fakes);

        let req = test::TestRequest::post()
            .uri("/api/user/signup")
            .set_json(signup_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == AUTH_COOKIE_NAME)
            .expect("session cookie");
        assert!(cookie.http_only().unwrap_or(false));

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["username"], "cinephile");
        assert!(body["user"].get("password").is_none());

        let stored = fakes
            .users
            .find_user_by_email("cinephile@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password, "password123");
        assert!(stored.password.starts_with("$2"));
    }

    #[actix_rt::test]
    async fn test_duplicate_signup_conflicts() {
        let fakes = Fakes::new();
        let app = app!(fakes);

        for expected in [StatusCode::OK, StatusCode::CONFLICT] {
            let req = test::TestRequest::post()
                .uri("/api/user/signup")
                .set_json(signup_body())
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), expected);
        }
    }

    #[actix_rt::test]
    async fn test_signin_outcomes() {
        let fakes = Fakes::new();
        let app = app!(fakes);

        let req = test::TestRequest::post()
            .uri("/api/user/signup")
            .set_json(signup_body())
            .to_request();
        test::call_service(&app, req).await;

        let attempts = [
            ("nobody@example.com", "password123", StatusCode::NOT_FOUND),
            ("cinephile@example.com", "wrong-password", StatusCode::UNAUTHORIZED),
            ("", "password123", StatusCode::BAD_REQUEST),
            ("cinephile@example.com", "password123", StatusCode::OK),
        ];
        for (email, password, expected) in attempts {
            let req = test::TestRequest::post()
                .uri("/api/user/signin")
                .set_json(json!({ "email": email, "password": password }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), expected, "{} / {}", email, password);
        }
    }

    #[actix_rt::test]
    async fn test_session_cookie_authenticates_me() {
        let fakes = Fakes::new();
        let app = app!(fakes);

        let req = test::TestRequest::post()
            .uri("/api/user/signup")
            .set_json(signup_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == AUTH_COOKIE_NAME)
            .unwrap()
            .into_owned();

        let req = test::TestRequest::get()
            .uri("/api/user/me")
            .cookie(cookie)
            .to_request();
        let me: UserResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(me.message, "User data fetched successfully");
        assert_eq!(me.user.email, "cinephile@example.com");
    }

    #[actix_rt::test]
    async fn test_update_password() {
        let fakes = Fakes::new();
        let user = fakes
            .users
            .create_user(NewUser {
                username: "cinephile".to_string(),
                email: "cinephile@example.com".to_string(),
                password: PlainPassword::new("password123"),
            })
            .await
            .unwrap();
        let app = app!(fakes);

        let req = test::TestRequest::put()
            .uri("/api/user/password")
            .insert_header(bearer(&user))
            .set_json(json!({ "oldPassword": "not-my-password", "newPassword": "brand-new-pass" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.message, "Incorrect old password");

        let req = test::TestRequest::put()
            .uri("/api/user/password")
            .insert_header(bearer(&user))
            .set_json(json!({ "oldPassword": "password123", "newPassword": "brand-new-pass" }))
            .to_request();
        let body: MessageResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.message, "Password updated successfully");

        let stored = fakes.users.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(PlainPassword::new("brand-new-pass").matches(&stored.password).unwrap());
    }

    #[actix_rt::test]
    async fn test_profile_photo_and_delete_account() {
        let fakes = Fakes::new();
        let user = fakes
            .users
            .create_user(NewUser {
                username: "cinephile".to_string(),
                email: "cinephile@example.com".to_string(),
                password: PlainPassword::new("password123"),
            })
            .await
            .unwrap();
        let app = app!(fakes);

        let req = test::TestRequest::post()
            .uri("/api/user/profile-photo")
            .insert_header(bearer(&user))
            .set_json(json!({ "profilePhoto": "ftp://example.com/me.png" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/user/profile-photo")
            .insert_header(bearer(&user))
            .set_json(json!({ "profilePhoto": "https://cdn.example.com/me.png" }))
            .to_request();
        let body: UserResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.user.profile_photo, "https://cdn.example.com/me.png");

        let req = test::TestRequest::delete()
            .uri("/api/user/me")
            .insert_header(bearer(&user))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(fakes.users.find_user_by_id(&user.id).await.unwrap().is_none());

        let req = test::TestRequest::get()
            .uri("/api/user/me")
            .insert_header(bearer(&user))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_logout_clears_cookie() {
        let fakes = Fakes::new();
        let app = app!(fakes);

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/user/logout").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == AUTH_COOKIE_NAME)
            .unwrap();
        assert_eq!(cookie.value(), "");
    }
}
