use sqlx::PgPool;

use advisor::auth::{AuthService, TokenSigner};
use advisor::config::Settings;
use advisor::experiment::ExperimentService;
use advisor::goals::GoalService;
use advisor::policies::PolicyService;
use advisor::products::ProductService;
use advisor::reference::ReferenceService;

/// Shared application state. Every service holds a clone of the same pool;
/// cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    pub products: ProductService,
    pub auth: AuthService,
    pub experiment: ExperimentService,
    pub goals: GoalService,
    pub policies: PolicyService,
    pub reference: ReferenceService,
    pub signer: TokenSigner,
}

impl AppState {
    pub fn new(pool: PgPool, settings: &Settings) -> Self {
        let signer = TokenSigner::from_secret(
            settings.jwt_secret.as_bytes(),
            settings.access_token_expire_minutes,
        );
        Self {
            products: ProductService::new(pool.clone()),
            auth: AuthService::new(pool.clone(), signer.clone()),
            experiment: ExperimentService::new(
                pool.clone(),
                settings.chatbot_with_guide.clone(),
                settings.chatbot_without_guide.clone(),
            ),
            goals: GoalService::new(pool.clone()),
            policies: PolicyService::new(pool.clone()),
            reference: ReferenceService::new(pool),
            signer,
        }
    }
}
