use crate::{
    api::{Created, created, message},
    auth::{
        access::{Action, Area},
        auth::AuthUser,
        password::hash_password,
    },
    error::ApiError,
    model::{role::Capability, user::User},
    utils::{
        db_utils::{Filters, Pagination, UserPage, fetch_page, update_by_id},
        qr_lookup,
    },
    validation::Validator,
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "u.id, u.name, u.username, u.email, u.role_id, u.qr_token, u.is_active, u.created_at";
const USER_FROM: &str = "FROM users u";

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "Dewi Lestari")]
    pub name: String,
    #[schema(example = "dewi")]
    pub username: String,
    #[schema(example = "dewi@example.com", format = "email")]
    pub email: String,
    #[schema(example = "rahasia123")]
    pub password: String,
    pub role: Capability,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Capability>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Serialize)]
struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_active: Option<bool>,
}

const USER_UPDATABLE: [&str; 6] = ["name", "username", "email", "password", "role_id", "is_active"];

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// admin | coach | member | operator
    pub role: Option<Capability>,
    pub is_active: Option<bool>,
    /// Matches name, username or email
    pub search: Option<String>,
}

/// Login row created together with a member or coach profile.
pub(crate) struct NewAccount {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Capability,
    pub is_active: bool,
}

pub(crate) fn validate_account(
    v: &mut Validator,
    name: &str,
    username: &str,
    email: &str,
    password: Option<&str>,
) {
    v.required("name", name)
        .max_len("name", name, 120)
        .required("username", username)
        .max_len("username", username, 80)
        .required("email", email)
        .email("email", email);
    if let Some(p) = password {
        v.check(
            "password",
            p.chars().count() >= MIN_PASSWORD_LEN,
            format!("The password must be at least {MIN_PASSWORD_LEN} characters."),
        );
    }
}

/// Argon2 is slow on purpose, so it runs on the blocking pool.
pub(crate) async fn hash_in_pool(password: String) -> Result<String, ApiError> {
    web::block(move || hash_password(&password))
        .await?
        .map_err(|e| {
            error!(error = %e, "Failed to hash password");
            ApiError::Internal("Internal Server Error".into())
        })
}

pub(crate) fn new_qr_code() -> String {
    Uuid::new_v4().to_simple().to_string()
}

/// Inserts the user row and returns its id and QR code. Accounts created
/// without a password get an unguessable one and cannot log in until an
/// admin sets a real one.
pub(crate) async fn insert_account(
    conn: &mut MySqlConnection,
    account: &NewAccount,
) -> Result<(u64, String), ApiError> {
    let password = account
        .password
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let hashed = hash_in_pool(password).await?;
    let qr_token = new_qr_code();

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, username, email, password, role_id, qr_token, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(account.name.trim())
    .bind(account.username.trim())
    .bind(account.email.trim())
    .bind(&hashed)
    .bind(account.role.id())
    .bind(&qr_token)
    .bind(account.is_active)
    .execute(&mut *conn)
    .await
    .map_err(|e| ApiError::database("insert user", e))?;

    Ok((result.last_insert_id(), qr_token))
}

pub(crate) async fn find_user(pool: &MySqlPool, id: u64) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} {USER_FROM} WHERE u.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::database("fetch user", e))?
        .ok_or_else(|| ApiError::not_found("User"))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserPage),
        (status = 403, description = "Not allowed")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Users, Action::Read)?;

    let mut filters = Filters::new();
    filters
        .opt_u64("u.role_id = ?", query.role.map(|r| u64::from(r.id())))
        .opt_bool("u.is_active = ?", query.is_active)
        .search(&["u.name", "u.username", "u.email"], query.search.as_deref());

    let page = fetch_page::<User>(
        pool.get_ref(),
        USER_COLUMNS,
        USER_FROM,
        &filters,
        "u.name ASC",
        Pagination::new(query.page, query.per_page),
        "User",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id", Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Users, Action::Read)?;
    let user = find_user(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = Created),
        (status = 409, description = "Username, email or code already taken"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Users, Action::Write)?;

    let mut v = Validator::new();
    validate_account(
        &mut v,
        &payload.name,
        &payload.username,
        &payload.email,
        Some(&payload.password),
    );
    v.finish()?;

    let payload = payload.into_inner();
    let account = NewAccount {
        name: payload.name,
        username: payload.username,
        email: payload.email,
        password: Some(payload.password),
        role: payload.role,
        is_active: payload.is_active.unwrap_or(true),
    };

    let mut conn = pool.acquire().await?;
    let (id, qr_token) = insert_account(&mut conn, &account).await?;
    qr_lookup::register(&qr_token);

    info!(user_id = id, created_by = auth.user_id, role = %account.role, "User created");
    Ok(created("User", id))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id", Path, description = "User id")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = Object, example = json!({"message": "User updated successfully"})),
        (status = 400, description = "No fields provided"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateUser>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Users, Action::Write)?;
    let id = path.into_inner();

    let mut v = Validator::new();
    v.required_if_present("name", payload.name.as_deref())
        .required_if_present("username", payload.username.as_deref());
    if let Some(email) = &payload.email {
        v.email("email", email);
    }
    if let Some(p) = &payload.password {
        v.check(
            "password",
            p.chars().count() >= MIN_PASSWORD_LEN,
            format!("The password must be at least {MIN_PASSWORD_LEN} characters."),
        );
    }
    if id == auth.user_id && payload.is_active == Some(false) {
        v.add("is_active", "You cannot deactivate your own account.");
    }
    v.finish()?;

    let existing = find_user(pool.get_ref(), id).await?;

    let payload = payload.into_inner();
    let password = match payload.password {
        Some(p) => Some(hash_in_pool(p).await?),
        None => None,
    };
    let patch = UserPatch {
        name: payload.name.map(|s| s.trim().to_string()),
        username: payload.username.map(|s| s.trim().to_string()),
        email: payload.email.map(|s| s.trim().to_string()),
        password,
        role_id: payload.role.map(Capability::id),
        is_active: payload.is_active,
    };

    update_by_id(pool.get_ref(), "users", "User", &patch, &USER_UPDATABLE, id).await?;
    // name, role and active flag are all shown by the scanner
    qr_lookup::invalidate(&existing.qr_token).await;

    Ok(message("User updated successfully"))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/qr-code",
    params(("id", Path, description = "User id")),
    responses(
        (status = 200, description = "New code issued, the old one stops working", body = Object,
            example = json!({"qr_token": "3f1c0b6e2a5d4c7f9e8b1a2d3c4e5f60"})),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn regenerate_qr_code(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Users, Action::Write)?;
    let id = path.into_inner();
    let existing = find_user(pool.get_ref(), id).await?;

    let qr_token = new_qr_code();
    sqlx::query("UPDATE users SET qr_token = ? WHERE id = ?")
        .bind(&qr_token)
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("rotate qr code", e))?;

    qr_lookup::forget(&existing.qr_token).await;
    qr_lookup::register(&qr_token);

    info!(user_id = id, "QR code rotated");
    Ok(HttpResponse::Ok().json(json!({ "qr_token": qr_token })))
}

/// Removes the user row; profiles and scans go with it.
pub(crate) async fn delete_account(pool: &MySqlPool, user_id: u64, qr_token: &str) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| ApiError::database("delete user", e))?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User"));
    }
    qr_lookup::forget(qr_token).await;
    Ok(())
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id", Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Cannot delete yourself")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Users, Action::Write)?;
    let id = path.into_inner();

    let mut v = Validator::new();
    v.check("id", id != auth.user_id, "You cannot delete your own account.");
    v.finish()?;

    let existing = find_user(pool.get_ref(), id).await?;
    delete_account(pool.get_ref(), id, &existing.qr_token).await?;

    info!(user_id = id, deleted_by = auth.user_id, "User deleted");
    Ok(message("User deleted successfully"))
}
