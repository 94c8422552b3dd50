use crate::{
    api::{Created, created, message},
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    config::Config,
    error::ApiError,
    model::payment::{Payment, PaymentMethod, PaymentStatus},
    utils::{
        db_utils::{Filters, Pagination, PaymentPage, delete_by_id, fetch_page, update_by_id},
        time,
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

const PAYMENT_COLUMNS: &str = r#"
    p.id, p.enrolment_id, e.member_id, u.name AS member_name, e.course_id, co.name AS course_name,
    p.amount, p.paid_on, p.method, p.status, p.note
"#;
const PAYMENT_FROM: &str = r#"
    FROM payments p
    JOIN enrolments e ON e.id = p.enrolment_id
    JOIN members m ON m.id = e.member_id
    JOIN users u ON u.id = m.user_id
    JOIN courses co ON co.id = e.course_id
"#;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePayment {
    pub enrolment_id: u64,
    #[schema(example = 600000.0)]
    pub amount: f64,
    /// Defaults to today.
    #[schema(value_type = Option<String>, format = "date")]
    pub paid_on: Option<NaiveDate>,
    pub method: PaymentMethod,
    /// Defaults to `paid`.
    pub status: Option<PaymentStatus>,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdatePayment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub paid_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

const PAYMENT_UPDATABLE: [&str; 5] = ["amount", "paid_on", "method", "status", "note"];

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Ignored for members, who only see their own
    pub member_id: Option<u64>,
    pub course_id: Option<u64>,
    pub enrolment_id: Option<u64>,
    pub method: Option<PaymentMethod>,
    pub status: Option<PaymentStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    params(PaymentQuery),
    responses((status = 200, description = "Paginated payment list", body = PaymentPage)),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
pub async fn list_payments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PaymentQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Payments, Action::Read)?;
    let member_id = auth.member_scope()?.or(query.member_id);

    let mut v = Validator::new();
    v.opt_date_in_range("from", query.from)
        .opt_date_in_range("to", query.to);
    v.finish()?;

    let mut filters = Filters::new();
    filters
        .opt_u64("e.member_id = ?", member_id)
        .opt_u64("e.course_id = ?", query.course_id)
        .opt_u64("p.enrolment_id = ?", query.enrolment_id)
        .opt_str("p.method = ?", query.method.as_ref().map(|m| m.as_ref()))
        .opt_str("p.status = ?", query.status.as_ref().map(|s| s.as_ref()))
        .opt_date("p.paid_on >= ?", query.from)
        .opt_date("p.paid_on <= ?", query.to);

    let page = fetch_page::<Payment>(
        pool.get_ref(),
        PAYMENT_COLUMNS,
        PAYMENT_FROM,
        &filters,
        "p.paid_on DESC, p.id DESC",
        Pagination::new(query.page, query.per_page),
        "Payment",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    params(("id", Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment", body = Payment),
        (status = 404, description = "Payment not found")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
pub async fn get_payment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Payments, Action::Read)?;

    let mut filters = Filters::new();
    filters
        .opt_u64("p.id = ?", Some(path.into_inner()))
        .opt_u64("e.member_id = ?", auth.member_scope()?);
    let sql = format!("SELECT {PAYMENT_COLUMNS} {PAYMENT_FROM}{}", filters.where_sql());

    let payment = filters
        .bind_as(sqlx::query_as::<_, Payment>(&sql))
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("fetch payment", e))?
        .ok_or_else(|| ApiError::not_found("Payment"))?;

    Ok(HttpResponse::Ok().json(payment))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = CreatePayment,
    responses(
        (status = 201, description = "Payment recorded", body = Created),
        (status = 409, description = "Unknown enrolment"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
pub async fn create_payment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreatePayment>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Payments, Action::Write)?;

    let mut v = Validator::new();
    v.positive("amount", payload.amount);
    if let Some(note) = &payload.note {
        v.max_len("note", note, 255);
    }
    v.finish()?;

    let paid_on = payload.paid_on.unwrap_or_else(|| time::today(config.timezone));
    let status = payload.status.unwrap_or(PaymentStatus::Paid);

    let result = sqlx::query(
        r#"
        INSERT INTO payments (enrolment_id, amount, paid_on, method, status, note)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.enrolment_id)
    .bind(payload.amount)
    .bind(paid_on)
    .bind(payload.method.as_ref())
    .bind(status.as_ref())
    .bind(payload.note.as_deref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("insert payment", e))?;

    let id = result.last_insert_id();
    info!(
        payment_id = id,
        enrolment_id = payload.enrolment_id,
        amount = payload.amount,
        recorded_by = auth.user_id,
        "Payment recorded"
    );
    Ok(created("Payment", id))
}

#[utoipa::path(
    put,
    path = "/api/v1/payments/{id}",
    params(("id", Path, description = "Payment id")),
    request_body = UpdatePayment,
    responses(
        (status = 200, description = "Payment updated", body = Object, example = json!({"message": "Payment updated successfully"})),
        (status = 404, description = "Payment not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
pub async fn update_payment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdatePayment>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Payments, Action::Write)?;

    let mut v = Validator::new();
    if let Some(amount) = payload.amount {
        v.positive("amount", amount);
    }
    if let Some(note) = &payload.note {
        v.max_len("note", note, 255);
    }
    v.finish()?;

    update_by_id(
        pool.get_ref(),
        "payments",
        "Payment",
        &payload.into_inner(),
        &PAYMENT_UPDATABLE,
        path.into_inner(),
    )
    .await?;

    Ok(message("Payment updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/payments/{id}",
    params(("id", Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment deleted"),
        (status = 404, description = "Payment not found")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
pub async fn delete_payment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Payments, Action::Write)?;
    let id = path.into_inner();
    delete_by_id(pool.get_ref(), "payments", "Payment", id).await?;
    info!(payment_id = id, deleted_by = auth.user_id, "Payment deleted");
    Ok(message("Payment deleted successfully"))
}
