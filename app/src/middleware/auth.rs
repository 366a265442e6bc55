use campus::notification::Notifiable;
use campus::{async_trait, FrameworkError, InertiaContext, Middleware, Next, Redirect, Request, Response, DB};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::models::{api_tokens, now, users};
use crate::policies::{self, Ability, Resource, Role};

/// Cookie holding the API token for browser sessions
pub const TOKEN_COOKIE: &str = "campus_token";

/// The signed-in user, attached to the request by `AuthMiddleware`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub school_id: i64,
    pub name: String,
    pub email: String,
    pub role: Option<Role>,
    /// Token that authenticated this request
    pub token_id: i64,
}

impl AuthUser {
    fn new(user: &users::Model, token_id: i64) -> Self {
        Self {
            id: user.id,
            school_id: user.school_id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role(),
            token_id,
        }
    }

    pub fn from_request(request: &Request) -> Result<Self, FrameworkError> {
        request
            .extension::<AuthUser>()
            .cloned()
            .ok_or(FrameworkError::Unauthenticated)
    }

    pub fn can(&self, resource: Resource, ability: Ability) -> bool {
        self.role
            .map(|role| policies::allows(role, resource, ability))
            .unwrap_or(false)
    }

    pub fn authorize(&self, resource: Resource, ability: Ability) -> Result<(), FrameworkError> {
        policies::authorize(self.role, resource, ability)
    }

    pub fn notifiable(&self) -> Notifiable {
        Notifiable::new(self.id, &self.email, &self.name)
    }
}

/// Resolves the bearer token (or token cookie) to a user
///
/// API clients get 401 when it is missing, unknown or expired; page clients
/// are sent to the login page.
pub struct AuthMiddleware;

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(&self, mut request: Request, next: Next) -> Response {
        let user = match authenticate(&request).await {
            Ok(user) => user,
            Err(FrameworkError::Unauthenticated) if InertiaContext::wants_page() => {
                return Redirect::route("login", &[]).into();
            }
            Err(err) => return Err(err.into()),
        };
        request.insert_extension(user);
        next(request).await
    }
}

async fn authenticate(request: &Request) -> Result<AuthUser, FrameworkError> {
    let hash = request
        .bearer_token()
        .or_else(|| request.cookie(TOKEN_COOKIE))
        .map(api_tokens::hash_token)
        .ok_or(FrameworkError::Unauthenticated)?;

    let db = DB::connection()?;
    let now = now();
    let (token, user) = api_tokens::Entity::find()
        .filter(api_tokens::Column::TokenHash.eq(hash))
        .filter(api_tokens::Column::ExpiresAt.gt(now))
        .find_also_related(users::Entity)
        .one(db.inner())
        .await?
        .ok_or(FrameworkError::Unauthenticated)?;
    let user = user.ok_or(FrameworkError::Unauthenticated)?;

    api_tokens::Entity::update_many()
        .col_expr(api_tokens::Column::LastUsedAt, Expr::value(now))
        .filter(api_tokens::Column::Id.eq(token.id))
        .exec(db.inner())
        .await?;

    Ok(AuthUser::new(&user, token.id))
}
