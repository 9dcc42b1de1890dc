// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        clock::SharedClock,
        error::{AppError, AppResult},
    },
    db::{NewRow, Repository, SharedStore},
    models::auth::{
        AuthResponse, Claims, CreateUserPayload, Credential, LoginUserPayload, Squad, UpdateUserPayload, User,
    },
    services::{
        policy::{authorize, Action, Target},
        visibility::{ensure_visible, visible},
    },
};

/// Hash fora do runtime assíncrono: bcrypt é CPU-bound.
pub async fn hash_password(plain: &str, cost: u32) -> AppResult<String> {
    let plain = plain.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&plain, cost))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct AuthService {
    store: SharedStore,
    users: Repository<User>,
    credentials: Repository<Credential>,
    squads: Repository<Squad>,
    jwt_secret: String,
    default_password: String,
    hash_cost: u32,
    clock: SharedClock,
}

impl AuthService {
    pub fn new(store: SharedStore, jwt_secret: String, default_password: String, clock: SharedClock) -> Self {
        Self {
            users: Repository::new(store.clone()),
            credentials: Repository::new(store.clone()),
            squads: Repository::new(store.clone()),
            store,
            jwt_secret,
            default_password,
            hash_cost: bcrypt::DEFAULT_COST,
            clock,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    // =========================================================================
    //  1. SESSÃO
    // =========================================================================

    pub async fn login(&self, payload: LoginUserPayload) -> AppResult<AuthResponse> {
        payload.validate()?;
        let email = normalize_email(&payload.email);
        let user = self
            .users
            .list_where(|u| normalize_email(&u.email) == email)
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::InvalidCredentials)?;
        let credential = self
            .credentials
            .get(user.id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password = payload.password;
        let password_hash = credential.password_hash;
        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::UserDisabled);
        }

        tracing::info!(user = %user.id, "login efetuado");
        Ok(AuthResponse {
            token: self.create_token(user.id)?,
            user,
        })
    }

    /// Token válido de um usuário ativo.
    pub async fn validate_token(&self, token: &str) -> AppResult<User> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let user = self
            .users
            .get(token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;
        if !user.is_active {
            return Err(AppError::UserDisabled);
        }
        Ok(user)
    }

    // Expiração no relógio de parede: é o mesmo que o `decode` confere.
    pub fn create_token(&self, user_id: Uuid) -> AppResult<String> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    // =========================================================================
    //  2. GESTÃO DE USUÁRIOS
    // =========================================================================

    pub async fn list_users(&self, actor: &User) -> AppResult<Vec<User>> {
        Ok(visible(&self.users.list().await?, actor))
    }

    pub async fn list_squads(&self) -> AppResult<Vec<Squad>> {
        self.squads.list().await
    }

    pub async fn create_user(&self, actor: &User, payload: CreateUserPayload) -> AppResult<User> {
        payload.validate()?;
        authorize(actor, Action::ManageUsers, Target::user(payload.squad_id, payload.role))?;
        if let Some(squad_id) = payload.squad_id {
            self.squads.find(squad_id).await?;
        }

        let email = normalize_email(&payload.email);
        let taken = self.users.list_where(|u| normalize_email(&u.email) == email).await?;
        if !taken.is_empty() {
            return Err(AppError::Conflict(format!("O e-mail '{}' já está em uso.", email)));
        }

        let password = payload
            .password
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.default_password.clone());
        let password_hash = hash_password(&password, self.hash_cost).await?;

        let user = User {
            id: Uuid::new_v4(),
            name: payload.name,
            email,
            role: payload.role,
            squad_id: payload.squad_id,
            is_active: true,
            created_at: self.clock.now_utc(),
        };
        let credential = Credential {
            id: user.id,
            password_hash,
        };
        // Usuário e credencial entram juntos; sem credencial ninguém loga.
        self.store
            .create_many(vec![NewRow::of(&user)?, NewRow::of(&credential)?])
            .await?;

        tracing::info!(user = %user.id, role = ?user.role, by = %actor.id, "usuário criado");
        Ok(user)
    }

    /// O ator precisa poder gerir o usuário como ele está e como ele ficará.
    pub async fn update_user(&self, actor: &User, user_id: Uuid, payload: UpdateUserPayload) -> AppResult<User> {
        payload.validate()?;
        let mut user = self.managed_user(actor, user_id).await?;

        let role = payload.role.unwrap_or(user.role);
        let squad_id = payload.squad_id.or(user.squad_id);
        authorize(actor, Action::ManageUsers, Target::user(squad_id, role))?;
        if let Some(squad_id) = payload.squad_id {
            self.squads.find(squad_id).await?;
        }

        let new_hash = match payload.password.filter(|p| !p.trim().is_empty()) {
            Some(password) => Some(hash_password(&password, self.hash_cost).await?),
            None => None,
        };

        if let Some(name) = payload.name {
            user.name = name;
        }
        user.role = role;
        user.squad_id = squad_id;
        let user = self.users.update(user).await?;
        if let Some(password_hash) = new_hash {
            self.store_credential(user.id, password_hash).await?;
        }

        tracing::info!(user = %user.id, by = %actor.id, "usuário atualizado");
        Ok(user)
    }

    /// Usuários nunca são apagados; só desativados.
    pub async fn toggle_status(&self, actor: &User, user_id: Uuid) -> AppResult<User> {
        if actor.id == user_id {
            return Err(AppError::validation("Você não pode desativar a própria conta."));
        }
        let mut user = self.managed_user(actor, user_id).await?;
        user.is_active = !user.is_active;
        let user = self.users.update(user).await?;
        tracing::info!(user = %user.id, active = user.is_active, by = %actor.id, "status alterado");
        Ok(user)
    }

    /// Volta para a senha padrão.
    pub async fn reset_password(&self, actor: &User, user_id: Uuid) -> AppResult<()> {
        let user = self.managed_user(actor, user_id).await?;
        let password_hash = hash_password(&self.default_password, self.hash_cost).await?;
        self.store_credential(user.id, password_hash).await?;
        tracing::info!(user = %user.id, by = %actor.id, "senha redefinida");
        Ok(())
    }

    async fn managed_user(&self, actor: &User, user_id: Uuid) -> AppResult<User> {
        let user = self.users.find(user_id).await?;
        ensure_visible(actor, &user)?;
        authorize(actor, Action::ManageUsers, Target::user(user.squad_id, user.role))?;
        Ok(user)
    }

    async fn store_credential(&self, user_id: Uuid, password_hash: String) -> AppResult<()> {
        let credential = Credential {
            id: user_id,
            password_hash,
        };
        match self.credentials.get(user_id).await? {
            Some(_) => {
                self.credentials.update(credential).await?;
            }
            None => {
                self.credentials.create(credential).await?;
            }
        }
        Ok(())
    }
}
