use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::promos::engine::{self, PromoEvaluation};
use crate::promos::error::PromoError;
use crate::promos::models::{
    CreatePromoRequest, Promo, PromoDraft, PromoUsage, PromoValidationResponse, UpdatePromoRequest,
    ValidatePromoRequest,
};
use crate::store::{PromoStore, StoreError};
use crate::validation::normalize_promo_code;

const GENERATED_CODE_LENGTH: usize = 8;
const GENERATED_CODE_ATTEMPTS: usize = 5;
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Random uppercase code for promos created without one
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..GENERATED_CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// A promo together with its evaluation for one order
#[derive(Debug, Clone)]
pub struct PromoCheck {
    pub promo: Promo,
    pub evaluation: PromoEvaluation,
}

/// Service for promo validation and administration
#[derive(Clone)]
pub struct PromoService {
    store: Arc<dyn PromoStore>,
}

impl PromoService {
    pub fn new(store: Arc<dyn PromoStore>) -> Self {
        Self { store }
    }

    /// Evaluates `code` for an order of `order_amount`.
    ///
    /// An unknown code is an error; a known code that fails its rules is an
    /// `Ok` carrying an invalid evaluation.
    pub async fn check(
        &self,
        code: &str,
        order_amount: Decimal,
        user_id: Option<i64>,
    ) -> Result<PromoCheck, PromoError> {
        let code = normalize_promo_code(code);
        let promo = self
            .store
            .find_promo_by_code(&code)
            .await?
            .ok_or_else(|| PromoError::CodeNotFound(code.clone()))?;

        let prior_usages = match user_id {
            Some(user_id) => Some(self.store.count_user_usages(promo.id, user_id).await?),
            None => None,
        };

        let evaluation = engine::evaluate(&promo, order_amount, prior_usages, Utc::now());
        if let PromoEvaluation::Invalid { violations } = &evaluation {
            warn!(
                "Promo {} rejected for amount {}: {:?}",
                promo.code, order_amount, violations
            );
        } else {
            debug!("Promo {} valid for amount {}", promo.code, order_amount);
        }

        Ok(PromoCheck { promo, evaluation })
    }

    pub async fn validate(
        &self,
        request: ValidatePromoRequest,
        user_id: Option<i64>,
    ) -> Result<PromoValidationResponse, PromoError> {
        request.validate()?;

        let check = self.check(&request.code, request.order_amount, user_id).await?;

        Ok(PromoValidationResponse {
            code: check.promo.code,
            valid: check.evaluation.is_valid(),
            discount: check.evaluation.discount(),
            errors: check.evaluation.reasons(),
        })
    }

    pub async fn create(&self, request: CreatePromoRequest) -> Result<Promo, PromoError> {
        request.validate()?;

        let explicit_code = request.code.as_deref().map(normalize_promo_code);
        let draft = engine::check_definition(PromoDraft {
            code: explicit_code.clone().unwrap_or_else(generate_code),
            description: request.description,
            promo_type: request.promo_type,
            discount_type: request.discount_type,
            discount_value: request.discount_value,
            min_order_amount: request.min_order_amount,
            max_discount: request.max_discount,
            valid_from: request.valid_from,
            valid_to: request.valid_to,
            max_uses: request.max_uses,
            max_uses_per_user: request.max_uses_per_user.unwrap_or(1),
            is_active: request.is_active.unwrap_or(true),
        })
        .map_err(PromoError::InvalidDefinition)?;

        if explicit_code.is_some() {
            return self.insert(&draft).await;
        }

        let mut draft = draft;
        for attempt in 1..=GENERATED_CODE_ATTEMPTS {
            match self.insert(&draft).await {
                Err(PromoError::DuplicateCode(code)) if attempt < GENERATED_CODE_ATTEMPTS => {
                    debug!("Generated promo code {} already taken, retrying", code);
                    draft.code = generate_code();
                }
                result => return result,
            }
        }
        Err(PromoError::DuplicateCode(draft.code))
    }

    async fn insert(&self, draft: &PromoDraft) -> Result<Promo, PromoError> {
        match self.store.insert_promo(draft).await {
            Ok(promo) => {
                info!("Created promo {} (id {})", promo.code, promo.id);
                Ok(promo)
            }
            Err(StoreError::Conflict(_)) => Err(PromoError::DuplicateCode(draft.code.clone())),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn list(&self, active: Option<bool>) -> Result<Vec<Promo>, PromoError> {
        Ok(self.store.list_promos(active).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Promo, PromoError> {
        self.store
            .find_promo(id)
            .await?
            .ok_or(PromoError::NotFound(id))
    }

    pub async fn update(&self, id: i64, request: UpdatePromoRequest) -> Result<Promo, PromoError> {
        request.validate()?;

        let current = self.get(id).await?;
        let mut draft = PromoDraft::from(&current);

        if let Some(description) = request.description {
            draft.description = Some(description);
        }
        if let Some(promo_type) = request.promo_type {
            draft.promo_type = promo_type;
        }
        if let Some(discount_type) = request.discount_type {
            draft.discount_type = discount_type;
        }
        if let Some(value) = request.discount_value {
            draft.discount_value = value;
        }
        if request.min_order_amount.is_some() {
            draft.min_order_amount = request.min_order_amount;
        }
        if request.max_discount.is_some() {
            draft.max_discount = request.max_discount;
        }
        if request.valid_from.is_some() {
            draft.valid_from = request.valid_from;
        }
        if request.valid_to.is_some() {
            draft.valid_to = request.valid_to;
        }
        if request.max_uses.is_some() {
            draft.max_uses = request.max_uses;
        }
        if let Some(per_user) = request.max_uses_per_user {
            draft.max_uses_per_user = per_user;
        }
        if let Some(is_active) = request.is_active {
            draft.is_active = is_active;
        }

        let draft = engine::check_definition(draft).map_err(PromoError::InvalidDefinition)?;
        if let Some(max_uses) = draft.max_uses {
            if max_uses < current.used_count {
                return Err(PromoError::InvalidDefinition(vec![format!(
                    "max_uses cannot be lower than the {} uses already made",
                    current.used_count
                )]));
            }
        }

        let promo = self
            .store
            .update_promo(id, &draft)
            .await?
            .ok_or(PromoError::NotFound(id))?;
        info!("Updated promo {} (id {})", promo.code, promo.id);
        Ok(promo)
    }

    pub async fn deactivate(&self, id: i64) -> Result<Promo, PromoError> {
        self.update(
            id,
            UpdatePromoRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn usages(&self, id: i64) -> Result<Vec<PromoUsage>, PromoError> {
        self.get(id).await?;
        Ok(self.store.list_usages(id).await?)
    }
}
