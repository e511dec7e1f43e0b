// src/db/profiledb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::profilemodel::{Profile, ProfileCredentials, UserRole};

#[async_trait]
pub trait ProfileExt: Send + Sync {
    async fn get_profile(&self, profile_id: Uuid) -> Result<Option<Profile>, Error>;

    async fn get_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProfileCredentials>, Error>;

    async fn save_profile(
        &self,
        email: String,
        full_name: String,
        role: UserRole,
        password_hash: String,
    ) -> Result<Profile, Error>;

    async fn get_profiles_by_role(&self, role: UserRole) -> Result<Vec<Profile>, Error>;

    async fn update_profile_role(
        &self,
        profile_id: Uuid,
        role: UserRole,
    ) -> Result<Option<Profile>, Error>;
}

#[async_trait]
impl ProfileExt for DBClient {
    async fn get_profile(&self, profile_id: Uuid) -> Result<Option<Profile>, Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, full_name, role, created_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProfileCredentials>, Error> {
        sqlx::query_as::<_, ProfileCredentials>(
            r#"
            SELECT id, email, full_name, role, created_at, password_hash
            FROM profiles
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn save_profile(
        &self,
        email: String,
        full_name: String,
        role: UserRole,
        password_hash: String,
    ) -> Result<Profile, Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (email, full_name, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, full_name, role, created_at
            "#,
        )
        .bind(email)
        .bind(full_name)
        .bind(role)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_profiles_by_role(&self, role: UserRole) -> Result<Vec<Profile>, Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, full_name, role, created_at
            FROM profiles
            WHERE role = $1
            ORDER BY full_name ASC
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_profile_role(
        &self,
        profile_id: Uuid,
        role: UserRole,
    ) -> Result<Option<Profile>, Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET role = $1
            WHERE id = $2
            RETURNING id, email, full_name, role, created_at
            "#,
        )
        .bind(role)
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
    }
}
