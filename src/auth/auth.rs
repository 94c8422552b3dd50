use crate::auth::access::{Action, Area, permits};
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Capability;
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub capability: Capability,

    /// Present only if this user has a member profile
    pub member_id: Option<u64>,
    /// Present only if this user has a coach profile
    pub coach_id: Option<u64>,
}

/// Decodes a bearer access token into the caller's identity.
pub fn authenticate(header: Option<&str>, secret: &str) -> Result<AuthUser, ApiError> {
    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing token".into()))?;

    let claims = verify_token(token, secret)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized("Access token required".into()));
    }

    let capability = Capability::from_id(claims.role)
        .ok_or_else(|| ApiError::Unauthorized("Invalid role".into()))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        capability,
        member_id: claims.member_id,
        coach_id: claims.coach_id,
    })
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // The auth middleware has usually done the work already.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(ApiError::Internal("Config missing".into()))),
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(authenticate(header, &config.jwt_secret))
    }
}

impl AuthUser {
    pub fn can(&self, area: Area, action: Action) -> bool {
        permits(self.capability, area, action)
    }

    pub fn authorize(&self, area: Area, action: Action) -> Result<(), ApiError> {
        if self.can(area, action) {
            Ok(())
        } else {
            tracing::info!(
                user_id = self.user_id,
                capability = %self.capability,
                area = %area,
                action = %action,
                "Access denied"
            );
            Err(ApiError::Forbidden(format!(
                "You are not allowed to {action} {area}"
            )))
        }
    }

    pub fn is_member(&self) -> bool {
        self.capability == Capability::Member
    }

    /// For members, the member id every query must be limited to; `None`
    /// for staff, who see everyone.
    pub fn member_scope(&self) -> Result<Option<u64>, ApiError> {
        if !self.is_member() {
            return Ok(None);
        }
        self.member_id
            .map(Some)
            .ok_or_else(|| ApiError::Forbidden("No member profile".into()))
    }

    /// Members may only look at their own user; staff may look at anyone.
    pub fn subject_or_self(&self, requested: Option<u64>) -> Result<u64, ApiError> {
        match requested {
            Some(id) if self.is_member() && id != self.user_id => {
                Err(ApiError::Forbidden("Members can only view their own records".into()))
            }
            Some(id) => Ok(id),
            None => Ok(self.user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token};
    use crate::models::TokenSubject;

    fn subject(role: u8) -> TokenSubject {
        TokenSubject {
            user_id: 10,
            username: "siti".into(),
            role,
            member_id: Some(4),
            coach_id: None,
        }
    }

    #[test]
    fn decodes_access_tokens() {
        let token = generate_access_token(&subject(3), "s", 60).unwrap();
        let header = format!("Bearer {token}");
        let user = authenticate(Some(&header), "s").unwrap();
        assert_eq!(user.capability, Capability::Member);
        assert_eq!(user.member_scope().unwrap(), Some(4));
    }

    #[test]
    fn rejects_refresh_tokens_and_bad_headers() {
        let (token, _) = generate_refresh_token(&subject(1), "s", 60).unwrap();
        let header = format!("Bearer {token}");
        assert!(matches!(authenticate(Some(&header), "s"), Err(ApiError::Unauthorized(_))));
        assert!(matches!(authenticate(None, "s"), Err(ApiError::Unauthorized(_))));
        assert!(matches!(authenticate(Some("Basic abc"), "s"), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let token = generate_access_token(&subject(9), "s", 60).unwrap();
        let header = format!("Bearer {token}");
        assert!(authenticate(Some(&header), "s").is_err());
    }

    #[test]
    fn members_are_scoped_to_themselves() {
        let member = AuthUser {
            user_id: 10,
            username: "siti".into(),
            capability: Capability::Member,
            member_id: Some(4),
            coach_id: None,
        };
        assert_eq!(member.subject_or_self(None).unwrap(), 10);
        assert!(member.subject_or_self(Some(11)).is_err());

        let admin = AuthUser {
            capability: Capability::Admin,
            member_id: None,
            ..member
        };
        assert_eq!(admin.subject_or_self(Some(11)).unwrap(), 11);
        assert_eq!(admin.member_scope().unwrap(), None);
        assert!(admin.authorize(Area::Reports, Action::Read).is_ok());
    }
}
