use std::sync::Arc;

use crate::auth::{jwt::JwtKeys, services::AuthService};
use crate::config::AppConfig;
use crate::coupons::{
    repo::{CouponRepository, PgCouponRepository},
    services::CouponLedger,
};
use crate::db;
use crate::users::{
    repo::{PgUserRepository, UserRepository},
    services::UserDirectory,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<UserDirectory>,
    pub auth: Arc<AuthService>,
    pub coupons: Arc<CouponLedger>,
}

impl AppState {
    /// Reads the environment, connects to Postgres and applies migrations.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let pool = db::connect(&config).await?;
        db::run_migrations(&pool).await?;

        Ok(Self::with_repositories(
            config,
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgCouponRepository::new(pool)),
        ))
    }

    pub fn with_repositories(
        config: Arc<AppConfig>,
        user_repo: Arc<dyn UserRepository>,
        coupon_repo: Arc<dyn CouponRepository>,
    ) -> Self {
        let users = Arc::new(UserDirectory::new(user_repo));
        let auth = Arc::new(AuthService::new(
            users.clone(),
            JwtKeys::from_config(&config.jwt),
        ));
        let coupons = Arc::new(CouponLedger::new(coupon_repo));
        Self {
            config,
            users,
            auth,
            coupons,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::coupons::memory::InMemoryCouponRepository;
        use crate::users::memory::InMemoryUserRepository;

        Self::with_repositories(
            Arc::new(AppConfig::for_tests()),
            Arc::new(InMemoryUserRepository::default()),
            Arc::new(InMemoryCouponRepository::default()),
        )
    }
}
