use crate::{
    api::{
        Created, created, message,
        users::{NewAccount, delete_account, insert_account, validate_account},
    },
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    config::Config,
    error::ApiError,
    model::{
        member::{Gender, Member, MemberStatus},
        role::Capability,
    },
    utils::{
        db_utils::{Filters, MemberPage, Pagination, fetch_page, update_by_id},
        qr_lookup, time,
    },
    validation::Validator,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const MEMBER_COLUMNS: &str = r#"
    m.id, m.user_id, u.name, u.email, m.phone, m.address, m.birth_date,
    m.gender, m.guardian_name, m.status, m.joined_at
"#;
const MEMBER_FROM: &str = "FROM members m JOIN users u ON u.id = m.user_id";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMember {
    #[schema(example = "Siti Aminah")]
    pub name: String,
    #[schema(example = "siti@example.com", format = "email")]
    pub email: String,
    /// Defaults to the email address.
    pub username: Option<String>,
    /// Without a password the member cannot log in yet.
    pub password: Option<String>,
    #[schema(example = "+6281234567890")]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[schema(value_type = Option<String>, format = "date", example = "2015-04-20")]
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub guardian_name: Option<String>,
    pub status: Option<MemberStatus>,
    #[schema(value_type = Option<String>, format = "date")]
    pub joined_at: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMember {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub guardian_name: Option<String>,
    pub status: Option<MemberStatus>,
    #[schema(value_type = Option<String>, format = "date")]
    pub joined_at: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize)]
struct MemberPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guardian_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    joined_at: Option<NaiveDate>,
}

const MEMBER_UPDATABLE: [&str; 7] = [
    "phone",
    "address",
    "birth_date",
    "gender",
    "guardian_name",
    "status",
    "joined_at",
];

/// Name and email live on the user row.
#[derive(Debug, Default, Serialize)]
struct ProfileUserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl ProfileUserPatch {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

const PROFILE_USER_UPDATABLE: [&str; 2] = ["name", "email"];

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MemberQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// active | inactive
    pub status: Option<MemberStatus>,
    /// Matches name, email or phone
    pub search: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string())
}

fn check_optional_lengths(v: &mut Validator, phone: Option<&str>, guardian: Option<&str>) {
    if let Some(phone) = phone {
        v.max_len("phone", phone, 32);
    }
    if let Some(guardian) = guardian {
        v.max_len("guardian_name", guardian, 120);
    }
}

async fn member_account(pool: &MySqlPool, id: u64) -> Result<(u64, String), ApiError> {
    sqlx::query_as::<_, (u64, String)>(
        "SELECT m.user_id, u.qr_token FROM members m JOIN users u ON u.id = m.user_id WHERE m.id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::database("fetch member account", e))?
    .ok_or_else(|| ApiError::not_found("Member"))
}

#[utoipa::path(
    get,
    path = "/api/v1/members",
    params(MemberQuery),
    responses((status = 200, description = "Paginated member list", body = MemberPage)),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn list_members(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MemberQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Members, Action::Read)?;

    let mut filters = Filters::new();
    filters
        .opt_str("m.status = ?", query.status.as_ref().map(|s| s.as_ref()))
        .search(&["u.name", "u.email", "m.phone"], query.search.as_deref());

    let page = fetch_page::<Member>(
        pool.get_ref(),
        MEMBER_COLUMNS,
        MEMBER_FROM,
        &filters,
        "u.name ASC",
        Pagination::new(query.page, query.per_page),
        "Member",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/members/{id}",
    params(("id", Path, description = "Member id")),
    responses(
        (status = 200, description = "Member", body = Member),
        (status = 404, description = "Member not found")
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn get_member(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Members, Action::Read)?;

    let member = sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} {MEMBER_FROM} WHERE m.id = ?"
    ))
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("fetch member", e))?
    .ok_or_else(|| ApiError::not_found("Member"))?;

    Ok(HttpResponse::Ok().json(member))
}

#[utoipa::path(
    post,
    path = "/api/v1/members",
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member and login created", body = Created),
        (status = 409, description = "Email or username already taken"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn create_member(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateMember>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Members, Action::Write)?;

    let payload = payload.into_inner();
    let username = payload
        .username
        .clone()
        .unwrap_or_else(|| payload.email.clone());
    let today = time::today(config.timezone);

    let mut v = Validator::new();
    validate_account(
        &mut v,
        &payload.name,
        &username,
        &payload.email,
        payload.password.as_deref(),
    );
    check_optional_lengths(&mut v, payload.phone.as_deref(), payload.guardian_name.as_deref());
    if let Some(birth) = payload.birth_date {
        v.check("birth_date", birth <= today, "The birth date must be a date before today.");
    }
    v.finish()?;

    let status = payload.status.unwrap_or(MemberStatus::Active);
    let account = NewAccount {
        name: payload.name,
        username,
        email: payload.email,
        password: payload.password,
        role: Capability::Member,
        is_active: status == MemberStatus::Active,
    };

    let mut tx = pool.begin().await?;
    let (user_id, qr_token) = insert_account(&mut tx, &account).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO members
        (user_id, phone, address, birth_date, gender, guardian_name, status, joined_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(trimmed(payload.phone))
    .bind(trimmed(payload.address))
    .bind(payload.birth_date)
    .bind(payload.gender.map(|g| g.to_string()))
    .bind(trimmed(payload.guardian_name))
    .bind(status.as_ref())
    .bind(payload.joined_at.unwrap_or(today))
    .execute(&mut *tx)
    .await
    .map_err(|e| ApiError::database("insert member", e))?;

    tx.commit().await?;
    qr_lookup::register(&qr_token);

    let id = result.last_insert_id();
    info!(member_id = id, user_id, created_by = auth.user_id, "Member created");
    Ok(created("Member", id))
}

#[utoipa::path(
    put,
    path = "/api/v1/members/{id}",
    params(("id", Path, description = "Member id")),
    request_body = UpdateMember,
    responses(
        (status = 200, description = "Member updated", body = Object, example = json!({"message": "Member updated successfully"})),
        (status = 404, description = "Member not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn update_member(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateMember>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Members, Action::Write)?;
    let id = path.into_inner();
    let payload = payload.into_inner();

    let mut v = Validator::new();
    v.required_if_present("name", payload.name.as_deref());
    if let Some(email) = &payload.email {
        v.email("email", email);
    }
    check_optional_lengths(&mut v, payload.phone.as_deref(), payload.guardian_name.as_deref());
    v.finish()?;

    let (user_id, qr_token) = member_account(pool.get_ref(), id).await?;

    let user_patch = ProfileUserPatch {
        name: trimmed(payload.name),
        email: trimmed(payload.email),
    };
    let member_patch = MemberPatch {
        phone: trimmed(payload.phone),
        address: trimmed(payload.address),
        birth_date: payload.birth_date,
        gender: payload.gender.map(|g| g.to_string()),
        guardian_name: trimmed(payload.guardian_name),
        status: payload.status.map(|s| s.to_string()),
        joined_at: payload.joined_at,
    };
    let member_changed = serde_json::to_value(&member_patch)
        .map(|v| v.as_object().is_some_and(|o| !o.is_empty()))
        .unwrap_or(false);

    if user_patch.is_empty() && !member_changed {
        return Err(ApiError::BadRequest("No fields provided for update".into()));
    }

    let mut tx = pool.begin().await?;
    if !user_patch.is_empty() {
        update_by_id(&mut *tx, "users", "Member", &user_patch, &PROFILE_USER_UPDATABLE, user_id).await?;
    }
    if member_changed {
        update_by_id(&mut *tx, "members", "Member", &member_patch, &MEMBER_UPDATABLE, id).await?;
    }
    if let Some(status) = payload.status {
        // an inactive member's card stops working at the scanner
        sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(status == MemberStatus::Active)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiError::database("sync member login", e))?;
    }
    tx.commit().await?;
    qr_lookup::invalidate(&qr_token).await;

    Ok(message("Member updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/members/{id}",
    params(("id", Path, description = "Member id")),
    responses(
        (status = 200, description = "Member, login and history deleted"),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Member still referenced")
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn delete_member(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Members, Action::Write)?;
    let id = path.into_inner();

    let (user_id, qr_token) = member_account(pool.get_ref(), id).await?;
    delete_account(pool.get_ref(), user_id, &qr_token).await?;

    info!(member_id = id, user_id, deleted_by = auth.user_id, "Member deleted");
    Ok(message("Member deleted successfully"))
}
