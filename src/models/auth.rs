// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::{Collection, Record};

// Papéis do CRM. O papel define o escopo de visibilidade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Coordinator,
    Supervisor,
    Salesperson,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::Admin,
        UserRole::Coordinator,
        UserRole::Supervisor,
        UserRole::Salesperson,
    ];

    /// ADMIN e COORDINATOR enxergam tudo.
    pub fn is_full_admin(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Coordinator)
    }

    pub fn is_manager(self) -> bool {
        self != UserRole::Salesperson
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub squad_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;
    const LABEL: &'static str = "Usuário";

    fn id(&self) -> Uuid {
        self.id
    }
}

// O hash da senha fica numa coleção própria: `User` nunca carrega segredo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    // Mesmo id do usuário
    pub id: Uuid,
    pub password_hash: String,
}

impl Record for Credential {
    const COLLECTION: Collection = Collection::Credentials;
    const LABEL: &'static str = "Credencial";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Squad {
    pub id: Uuid,
    pub name: String,
    pub supervisor_id: Option<Uuid>,
}

impl Record for Squad {
    const COLLECTION: Collection = Collection::Squads;
    const LABEL: &'static str = "Squad";

    fn id(&self) -> Uuid {
        self.id
    }
}

// Dados para login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued At
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    pub role: UserRole,
    pub squad_id: Option<Uuid>,
    // Vazio = senha padrão
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 1, message = "O nome não pode ficar vazio."))]
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub squad_id: Option<Uuid>,
    pub password: Option<String>,
}
