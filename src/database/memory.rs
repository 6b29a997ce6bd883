use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::database::UserStore;
use crate::errors::{AppError, Result};
use crate::models::{NewPayment, Payment, Plan, User};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    payments: Vec<Payment>,
}

/// In-process store selected with a `memory:` database URL. Every operation
/// runs under one lock, which gives the same atomicity as the Postgres
/// statements.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::Storage("memory store lock poisoned".to_string()))?;
        f(&mut state)
    }

    pub fn payment_count(&self) -> usize {
        self.with_state(|state| Ok(state.payments.len())).unwrap_or(0)
    }

    pub fn user_count(&self) -> usize {
        self.with_state(|state| Ok(state.users.len())).unwrap_or(0)
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User> {
        self.with_state(|state| {
            if state.users.values().any(|user| same_email(&user.email, email)) {
                return Err(AppError::UserExists);
            }

            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                plan: Plan::None,
                photo_credits: 0,
                created_at: now,
                updated_at: now,
            };
            state.users.insert(user.id, user.clone());
            Ok(user)
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_state(|state| {
            Ok(state.users.values().find(|user| same_email(&user.email, email)).cloned())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.with_state(|state| Ok(state.users.get(&id).cloned()))
    }

    async fn consume_credit(&self, id: Uuid) -> Result<Option<i32>> {
        self.with_state(|state| {
            Ok(state
                .users
                .get_mut(&id)
                .filter(|user| user.photo_credits > 0)
                .map(|user| {
                    user.photo_credits -= 1;
                    user.updated_at = Utc::now();
                    user.photo_credits
                }))
        })
    }

    async fn refund_credit(&self, id: Uuid) -> Result<i32> {
        self.with_state(|state| {
            let user = state.users.get_mut(&id).ok_or(AppError::NotFound)?;
            user.photo_credits += 1;
            user.updated_at = Utc::now();
            Ok(user.photo_credits)
        })
    }

    async fn apply_purchase(&self, payment: &NewPayment) -> Result<User> {
        self.with_state(|state| {
            if state.payments.iter().any(|p| p.order_id == payment.order_id) {
                return Err(AppError::DuplicateOrder);
            }

            let now = Utc::now();
            let user = state.users.get_mut(&payment.user_id).ok_or(AppError::NotFound)?;
            user.plan = payment.plan;
            user.photo_credits = payment.quantity;
            user.updated_at = now;
            let user = user.clone();

            state.payments.push(Payment {
                id: Uuid::new_v4(),
                user_id: payment.user_id,
                plan: payment.plan,
                order_id: payment.order_id.clone(),
                payer_id: payment.payer_id.clone(),
                quantity: payment.quantity,
                amount_minor: payment.amount_minor,
                verified: payment.verified,
                created_at: now,
            });

            Ok(user)
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
